use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::RiskConfig;
use crate::core::contracts::ContractSpec;
use crate::error::LotSizeError;
use crate::models::ValidatedSignal;

pub const DEFAULT_LOT_STEP: Decimal = dec!(0.01);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotResult {
    pub risk_amount: Decimal,
    pub price_difference: Decimal,
    pub risk_per_lot: Decimal,
    pub raw_lots: Decimal,
    pub final_lots: Decimal,
    pub actual_risk: Decimal,
    pub safety_margin: Decimal,
    pub is_safe: bool,
    /// Set when `final_lots` was reduced to the configured maximum.
    #[serde(default)]
    pub capped: bool,
}

impl LotResult {
    /// Risk budget too small for the stop distance at the broker step.
    pub fn is_below_minimum(&self) -> bool {
        self.final_lots.is_zero()
    }
}

/// Risk-percentage position sizing with truncation to the broker lot step.
#[derive(Debug, Clone, PartialEq)]
pub struct LotSizeCalculator {
    step: Decimal,
    max_lots: Option<Decimal>,
}

impl Default for LotSizeCalculator {
    fn default() -> Self {
        Self {
            step: DEFAULT_LOT_STEP,
            max_lots: None,
        }
    }
}

impl LotSizeCalculator {
    pub fn new(step: Decimal, max_lots: Option<Decimal>) -> Result<Self, LotSizeError> {
        if step <= Decimal::ZERO {
            return Err(LotSizeError::InvalidLotStep(step));
        }
        Ok(Self { step, max_lots })
    }

    pub fn step(&self) -> Decimal {
        self.step
    }

    pub fn compute(
        &self,
        signal: &ValidatedSignal,
        risk: &RiskConfig,
        contract: &ContractSpec,
    ) -> Result<LotResult, LotSizeError> {
        let risk_amount = risk.risk_amount();
        let price_difference = (signal.entry_price - signal.stop_loss).abs();

        if price_difference.is_zero() {
            error!(
                symbol = %signal.symbol,
                action = %signal.action,
                entry_price = %signal.entry_price,
                stop_loss = %signal.stop_loss,
                account_balance = %risk.account_balance,
                risk_percentage = %risk.risk_percentage,
                contract_size = %contract.contract_size,
                "Zero price difference reached the lot size calculator"
            );
            return Err(LotSizeError::DivisionByZeroRisk {
                entry_price: signal.entry_price,
                stop_loss: signal.stop_loss,
            });
        }

        let risk_per_lot = price_difference
            .checked_mul(contract.contract_size)
            .ok_or_else(|| overflow("risk per lot", signal, contract))?;
        let raw_lots = risk_amount
            .checked_div(risk_per_lot)
            .ok_or_else(|| overflow("raw lots", signal, contract))?;

        let (sized, capped) = match self.max_lots {
            Some(max) if raw_lots > max => {
                warn!("Lot size {:.4} capped at maximum {}", raw_lots, max);
                (max, true)
            }
            _ => (raw_lots, false),
        };
        let mut final_lots = self
            .truncate(sized)
            .map_err(|_| overflow("final lots", signal, contract))?;
        let mut actual_risk = final_lots
            .checked_mul(risk_per_lot)
            .ok_or_else(|| overflow("actual risk", signal, contract))?;

        // The quotient is rounded to 28 digits and can land one step high.
        while actual_risk > risk_amount && final_lots > Decimal::ZERO {
            final_lots = (final_lots - self.step).max(Decimal::ZERO).normalize();
            actual_risk = final_lots
                .checked_mul(risk_per_lot)
                .ok_or_else(|| overflow("actual risk", signal, contract))?;
        }

        let safety_margin = risk_amount - actual_risk;
        let is_safe = actual_risk <= risk_amount;

        let result = LotResult {
            risk_amount,
            price_difference,
            risk_per_lot,
            raw_lots,
            final_lots,
            actual_risk,
            safety_margin,
            is_safe,
            capped,
        };
        log_breakdown(signal, risk, contract, &result);

        if result.is_below_minimum() {
            warn!(
                "Risk budget {:.2} is too small for a {} stop distance at lot step {}",
                risk_amount, price_difference, self.step
            );
        }

        Ok(result)
    }

    /// Round down to a whole number of steps. Never rounds up.
    pub fn truncate(&self, lots: Decimal) -> Result<Decimal, LotSizeError> {
        if lots <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let steps = lots
            .checked_div(self.step)
            .ok_or_else(|| LotSizeError::Overflow("lot steps".to_string()))?
            .floor();
        let lots = steps
            .checked_mul(self.step)
            .ok_or_else(|| LotSizeError::Overflow("truncated lots".to_string()))?;
        Ok(lots.normalize())
    }
}

/// Last line before assembly: a sized order must never risk more than the budget.
pub fn ensure_within_budget(lot: &LotResult) -> Result<(), LotSizeError> {
    if lot.is_safe && lot.actual_risk <= lot.risk_amount {
        return Ok(());
    }
    error!(
        final_lots = %lot.final_lots,
        actual_risk = %lot.actual_risk,
        risk_amount = %lot.risk_amount,
        "Sized order exceeds the risk budget"
    );
    Err(LotSizeError::RiskExceeded {
        actual_risk: lot.actual_risk,
        risk_amount: lot.risk_amount,
    })
}

fn overflow(what: &str, signal: &ValidatedSignal, contract: &ContractSpec) -> LotSizeError {
    error!(
        symbol = %signal.symbol,
        entry_price = %signal.entry_price,
        stop_loss = %signal.stop_loss,
        contract_size = %contract.contract_size,
        "Arithmetic overflow computing {}", what
    );
    LotSizeError::Overflow(what.to_string())
}

fn log_breakdown(
    signal: &ValidatedSignal,
    risk: &RiskConfig,
    contract: &ContractSpec,
    r: &LotResult,
) {
    info!("LOT SIZE CALCULATION:");
    info!("  Symbol: {}", signal.symbol);
    info!("  Account Balance: ${:.2}", risk.account_balance);
    info!("  Risk Percentage: {}%", risk.risk_percentage);
    info!("  Max Risk Amount: ${:.2}", r.risk_amount);
    info!("  Entry Price: {}", signal.entry_price);
    info!("  Stop Loss: {}", signal.stop_loss);
    info!("  Price Difference: {}", r.price_difference);
    info!("  Contract Size: {} ({})", contract.contract_size, contract.risk_unit);
    info!("  Risk per Lot: ${:.2}", r.risk_per_lot);
    info!("  Raw Calculation: {:.4}", r.raw_lots);
    info!("  Final Lot Size: {}", r.final_lots);
    info!(
        "  Actual Risk: ${:.2} ({})",
        r.actual_risk,
        if r.is_safe { "SAFE" } else { "EXCEEDS LIMIT" }
    );
    info!("  Risk Safety Margin: ${:.2}", r.safety_margin);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contracts::RiskUnit;
    use crate::models::OrderAction;
    use crate::test_helpers::{risk_config, validated};

    fn gold() -> ContractSpec {
        ContractSpec {
            symbol: "XAUUSD".to_string(),
            contract_size: dec!(100),
            risk_unit: RiskUnit::PerOunce,
        }
    }

    fn eurusd() -> ContractSpec {
        ContractSpec {
            symbol: "EURUSD".to_string(),
            contract_size: dec!(100000),
            risk_unit: RiskUnit::PerPip,
        }
    }

    #[test]
    fn gold_market_scenario() {
        let sig = validated("XAUUSD", OrderAction::Buy, dec!(2665.50), dec!(2650.50));
        let r = LotSizeCalculator::default()
            .compute(&sig, &risk_config(dec!(10000.00), dec!(2.0)), &gold())
            .unwrap();
        assert_eq!(r.risk_amount, dec!(200.00));
        assert_eq!(r.price_difference, dec!(15.00));
        assert_eq!(r.risk_per_lot, dec!(1500.00));
        assert_eq!(r.raw_lots.round_dp(4), dec!(0.1333));
        assert_eq!(r.final_lots, dec!(0.13));
        assert_eq!(r.actual_risk, dec!(195.00));
        assert_eq!(r.safety_margin, dec!(5.00));
        assert!(r.is_safe);
        assert!(!r.capped);
    }

    #[test]
    fn eurusd_sell_limit_scenario_is_exact() {
        let sig = validated("EURUSD", OrderAction::SellLimit, dec!(1.07500), dec!(1.07800));
        let r = LotSizeCalculator::default()
            .compute(&sig, &risk_config(dec!(10000), dec!(1.5)), &eurusd())
            .unwrap();
        assert_eq!(r.risk_amount, dec!(150.00));
        assert_eq!(r.price_difference, dec!(0.00300));
        assert_eq!(r.risk_per_lot, dec!(300.00));
        assert_eq!(r.raw_lots, dec!(0.50));
        assert_eq!(r.final_lots, dec!(0.50));
        assert!(r.is_safe);
    }

    #[test]
    fn truncation_never_rounds_up() {
        let calc = LotSizeCalculator::default();
        assert_eq!(calc.truncate(dec!(0.133)).unwrap(), dec!(0.13));
        assert_eq!(calc.truncate(dec!(0.139999)).unwrap(), dec!(0.13));
        assert_eq!(calc.truncate(dec!(0.004)).unwrap(), dec!(0.00));
        assert_eq!(calc.truncate(dec!(2)).unwrap(), dec!(2));
    }

    #[test]
    fn tiny_budget_reports_zero_lots() {
        // 0.004 lots worth of risk: 10 / (25 * 100) = 0.004
        let sig = validated("XAUUSD", OrderAction::Sell, dec!(2650), dec!(2675));
        let r = LotSizeCalculator::default()
            .compute(&sig, &risk_config(dec!(1000), dec!(1)), &gold())
            .unwrap();
        assert_eq!(r.raw_lots, dec!(0.004));
        assert_eq!(r.final_lots, Decimal::ZERO);
        assert!(r.is_below_minimum());
        assert_eq!(r.actual_risk, Decimal::ZERO);
        assert!(r.is_safe);
    }

    #[test]
    fn actual_risk_never_exceeds_budget() {
        let calc = LotSizeCalculator::default();
        let contract = gold();
        for balance in [dec!(137.77), dec!(5000), dec!(12345.67), dec!(99999.99)] {
            for pct in [dec!(0.1), dec!(0.75), dec!(2), dec!(7.3), dec!(100)] {
                for stop in [dec!(2664.93), dec!(2650.5), dec!(2601.01), dec!(2400)] {
                    let sig = validated("XAUUSD", OrderAction::Buy, dec!(2665.50), stop);
                    let r = calc.compute(&sig, &risk_config(balance, pct), &contract).unwrap();
                    assert!(r.actual_risk <= r.risk_amount, "{:?}", r);
                    assert!(r.risk_amount <= balance);
                    assert!(r.price_difference > Decimal::ZERO);
                    assert!(r.is_safe);
                }
            }
        }
    }

    #[test]
    fn custom_step_and_cap() {
        let calc = LotSizeCalculator::new(dec!(0.1), Some(dec!(1))).unwrap();
        assert_eq!(calc.truncate(dec!(0.199)).unwrap(), dec!(0.1));

        // 50000 * 10% = 5000 risk / (1 * 100) = 50 lots, capped at 1
        let sig = validated("XAUUSD", OrderAction::Buy, dec!(2001), dec!(2000));
        let r = calc.compute(&sig, &risk_config(dec!(50000), dec!(10)), &gold()).unwrap();
        assert_eq!(r.final_lots, dec!(1));
        assert!(r.capped);
        assert_eq!(r.actual_risk, dec!(100));
        assert!(r.is_safe);
    }

    #[test]
    fn quotient_rounded_up_is_stepped_back_down() {
        // 200 / 1538.461538461538461538461539 rounds to exactly 0.13 at 28 digits,
        // but 0.13 lots would risk 200.00000000000000000000000007.
        let sig = validated(
            "XAUUSD",
            OrderAction::Buy,
            dec!(16.38461538461538461538461539),
            dec!(1),
        );
        let r = LotSizeCalculator::default()
            .compute(&sig, &risk_config(dec!(10000), dec!(2)), &gold())
            .unwrap();
        assert_eq!(r.risk_amount, dec!(200.00));
        assert_eq!(r.final_lots, dec!(0.12));
        assert!(r.actual_risk <= r.risk_amount);
        assert!(r.is_safe);
        assert!(ensure_within_budget(&r).is_ok());
    }

    #[test]
    fn huge_balance_overflows_without_panicking() {
        let sig = validated("EURUSD", OrderAction::Buy, dec!(1.07500), dec!(1.07499));
        let err = LotSizeCalculator::default()
            .compute(
                &sig,
                &risk_config(dec!(1000000000000000000000000000), dec!(100)),
                &eurusd(),
            )
            .unwrap_err();
        assert!(matches!(err, LotSizeError::Overflow(_)));
    }

    #[test]
    fn over_budget_result_is_refused() {
        let lot = LotResult {
            risk_amount: dec!(200),
            price_difference: dec!(15),
            risk_per_lot: dec!(1500),
            raw_lots: dec!(0.14),
            final_lots: dec!(0.14),
            actual_risk: dec!(210),
            safety_margin: dec!(-10),
            is_safe: false,
            capped: false,
        };
        assert_eq!(
            ensure_within_budget(&lot),
            Err(LotSizeError::RiskExceeded {
                actual_risk: dec!(210),
                risk_amount: dec!(200)
            })
        );
    }

    #[test]
    fn zero_step_is_rejected() {
        assert_eq!(
            LotSizeCalculator::new(Decimal::ZERO, None),
            Err(LotSizeError::InvalidLotStep(Decimal::ZERO))
        );
    }

    #[test]
    fn zero_distance_fails_fast() {
        let sig = validated("XAUUSD", OrderAction::Buy, dec!(2665.50), dec!(2665.50));
        let err = LotSizeCalculator::default()
            .compute(&sig, &risk_config(dec!(10000), dec!(2)), &gold())
            .unwrap_err();
        assert!(matches!(err, LotSizeError::DivisionByZeroRisk { .. }));
    }
}
