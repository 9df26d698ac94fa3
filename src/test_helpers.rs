use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::config::RiskConfig;
use crate::core::assemble;
use crate::core::contracts::{ContractSpec, RiskUnit};
use crate::core::lot_size::LotSizeCalculator;
use crate::delivery::Delivery;
use crate::models::{LivePrice, OrderAction, RawSignal, ValidatedSignal};

fn fixed_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-11-20T14:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn live_price(symbol: &str, bid: Decimal, ask: Decimal) -> LivePrice {
    LivePrice {
        symbol: symbol.to_string(),
        bid,
        ask,
        timestamp: fixed_time(),
    }
}

pub fn raw_signal(
    action: &str,
    entry: Option<Value>,
    stop: Option<Value>,
    take_profit: Option<Value>,
) -> RawSignal {
    RawSignal {
        symbol: None,
        action: Some(action.to_string()),
        entry_price: entry,
        stop_loss: stop,
        take_profit,
        confidence: None,
        reasoning: None,
    }
}

pub fn risk_config(balance: Decimal, pct: Decimal) -> RiskConfig {
    RiskConfig::new(balance, pct).unwrap()
}

/// A signal that skipped the normalizer; fine for sizing and assembly tests.
pub fn validated(symbol: &str, action: OrderAction, entry: Decimal, stop: Decimal) -> ValidatedSignal {
    ValidatedSignal {
        symbol: symbol.to_string(),
        action,
        entry_price: entry,
        stop_loss: stop,
        take_profit: None,
        confidence: None,
        reasoning: None,
        entry_defaulted: false,
        warnings: Vec::new(),
    }
}

/// EURUSD SELL_LIMIT at 1.07500, stop 1.07800, 1.5% of 10,000.
pub fn sample_delivery() -> Delivery {
    let contract = ContractSpec {
        symbol: "EURUSD".to_string(),
        contract_size: dec!(100000),
        risk_unit: RiskUnit::PerPip,
    };
    let signal = validated("EURUSD", OrderAction::SellLimit, dec!(1.07500), dec!(1.07800));
    let lot = LotSizeCalculator::default()
        .compute(&signal, &risk_config(dec!(10000), dec!(1.5)), &contract)
        .unwrap();
    let payload = assemble(&signal, &lot, &contract);
    Delivery {
        payload,
        lot,
        signal,
        contract_defaulted: false,
        created_at: fixed_time(),
    }
}
