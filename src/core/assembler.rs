use crate::core::contracts::ContractSpec;
use crate::core::lot_size::LotResult;
use crate::models::{MarketOrder, OrderPayload, PendingOrder, ValidatedSignal};

/// Shape the final broker payload. Pure: no value is recomputed here.
///
/// Market actions omit `price`; LIMIT/STOP actions carry the validated entry as
/// their trigger `price`.
pub fn assemble(signal: &ValidatedSignal, lot: &LotResult, contract: &ContractSpec) -> OrderPayload {
    let symbol = contract.symbol.clone();

    if signal.action.is_pending() {
        OrderPayload::Pending(PendingOrder {
            symbol,
            action: signal.action,
            price: signal.entry_price,
            volume: lot.final_lots,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            confidence: signal.confidence,
            reasoning: signal.reasoning.clone(),
        })
    } else {
        OrderPayload::Market(MarketOrder {
            symbol,
            action: signal.action,
            volume: lot.final_lots,
            stop_loss: signal.stop_loss,
            take_profit: signal.take_profit,
            confidence: signal.confidence,
            reasoning: signal.reasoning.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contracts::RiskUnit;
    use crate::core::lot_size::LotSizeCalculator;
    use crate::models::OrderAction;
    use crate::test_helpers::{risk_config, validated};
    use rust_decimal_macros::dec;

    fn eurusd() -> ContractSpec {
        ContractSpec {
            symbol: "EURUSD".to_string(),
            contract_size: dec!(100000),
            risk_unit: RiskUnit::PerPip,
        }
    }

    #[test]
    fn pending_carries_trigger_price() {
        let contract = eurusd();
        let sig = validated("EURUSD", OrderAction::SellLimit, dec!(1.07500), dec!(1.07800));
        let lot = LotSizeCalculator::default()
            .compute(&sig, &risk_config(dec!(10000), dec!(1.5)), &contract)
            .unwrap();

        let payload = assemble(&sig, &lot, &contract);
        assert_eq!(payload.price(), Some(dec!(1.07500)));
        assert_eq!(payload.volume(), dec!(0.50));

        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["price"], 1.075);
        assert_eq!(v["action"], "SELL_LIMIT");
    }

    #[test]
    fn market_has_no_price_field() {
        let contract = eurusd();
        let sig = validated("EURUSD", OrderAction::Sell, dec!(1.07500), dec!(1.07800));
        let lot = LotSizeCalculator::default()
            .compute(&sig, &risk_config(dec!(10000), dec!(1.5)), &contract)
            .unwrap();

        let payload = assemble(&sig, &lot, &contract);
        assert!(payload.price().is_none());
        let v = serde_json::to_value(&payload).unwrap();
        assert!(v.get("price").is_none());
        assert_eq!(v["volume"], 0.5);
    }

    #[test]
    fn assembly_is_deterministic() {
        let contract = eurusd();
        let mut sig = validated("EURUSD", OrderAction::BuyStop, dec!(1.08000), dec!(1.07700));
        sig.confidence = Some(dec!(72));
        sig.reasoning = Some("break of range high".to_string());
        let lot = LotSizeCalculator::default()
            .compute(&sig, &risk_config(dec!(10000), dec!(1.5)), &contract)
            .unwrap();

        let a = serde_json::to_vec(&assemble(&sig, &lot, &contract)).unwrap();
        let b = serde_json::to_vec(&assemble(&sig, &lot, &contract)).unwrap();
        assert_eq!(a, b);
    }
}
