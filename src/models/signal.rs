use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::models::OrderAction;

/// Unvalidated model output. Numeric fields keep their raw JSON form so the
/// normalizer can tell "absent" from "present but garbage".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    pub symbol: Option<String>,
    pub action: Option<String>,
    pub entry_price: Option<Value>,
    pub stop_loss: Option<Value>,
    pub take_profit: Option<Value>,
    pub confidence: Option<Value>,
    pub reasoning: Option<String>,
}

impl RawSignal {
    /// Build from a decoded JSON object, accepting the field aliases models
    /// tend to produce. The first present, non-null alias wins.
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let pick = |keys: &[&str]| -> Option<Value> {
            keys.iter()
                .filter_map(|k| obj.get(*k))
                .find(|v| !is_blank(v))
                .cloned()
        };
        let text = |keys: &[&str]| -> Option<String> {
            pick(keys).map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
        };

        Self {
            symbol: text(&["symbol", "ticker"]),
            action: text(&["action", "order_type", "direction", "signal"]),
            entry_price: pick(&["entry_price", "price", "entry"]),
            stop_loss: pick(&["stop_loss", "sl", "stoploss"]),
            take_profit: pick(&["take_profit", "tp", "takeprofit"]),
            confidence: pick(&["confidence"]),
            reasoning: text(&["reasoning", "reason", "analysis"]),
        }
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalWarning {
    EntryDefaulted { source: String },
    PendingEntryDefaulted,
    TakeProfitOnWrongSide { take_profit: Decimal },
    PendingTriggerVsMarket { reference: Decimal },
    ConfidenceClamped { original: Decimal },
    ConfidenceUnreadable { raw: String },
    SymbolMismatch { reported: String },
}

impl fmt::Display for SignalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalWarning::EntryDefaulted { source } => {
                write!(f, "entry defaulted from live feed ({})", source)
            }
            SignalWarning::PendingEntryDefaulted => {
                write!(f, "pending order has no explicit trigger, live price used")
            }
            SignalWarning::TakeProfitOnWrongSide { take_profit } => {
                write!(f, "take profit {} is on the wrong side of entry", take_profit)
            }
            SignalWarning::PendingTriggerVsMarket { reference } => {
                write!(f, "pending trigger inconsistent with market {}", reference)
            }
            SignalWarning::ConfidenceClamped { original } => {
                write!(f, "confidence {} clamped to 0..100", original)
            }
            SignalWarning::ConfidenceUnreadable { raw } => {
                write!(f, "confidence '{}' unreadable, dropped", raw)
            }
            SignalWarning::SymbolMismatch { reported } => {
                write!(f, "model reported symbol {}", reported)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedSignal {
    pub symbol: String,
    pub action: OrderAction,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Option<Decimal>,
    pub confidence: Option<Decimal>,
    pub reasoning: Option<String>,
    pub entry_defaulted: bool,
    #[serde(default)]
    pub warnings: Vec<SignalWarning>,
}

/// Normalizer output. `Hold` carries no price fields; sizing and assembly are skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Hold {
        reasoning: Option<String>,
        confidence: Option<Decimal>,
    },
    Trade(ValidatedSignal),
}
