use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::OrderAction;

/// Executes at the prevailing price; carries no `price` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub symbol: String,
    pub action: OrderAction,
    pub volume: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// LIMIT/STOP order; `price` is the trigger level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub symbol: String,
    pub action: OrderAction,
    pub price: Decimal,
    pub volume: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

// Pending is listed first so untagged decoding does not swallow `price` into Market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderPayload {
    Pending(PendingOrder),
    Market(MarketOrder),
}

impl OrderPayload {
    pub fn symbol(&self) -> &str {
        match self {
            OrderPayload::Market(o) => &o.symbol,
            OrderPayload::Pending(o) => &o.symbol,
        }
    }

    pub fn action(&self) -> OrderAction {
        match self {
            OrderPayload::Market(o) => o.action,
            OrderPayload::Pending(o) => o.action,
        }
    }

    pub fn volume(&self) -> Decimal {
        match self {
            OrderPayload::Market(o) => o.volume,
            OrderPayload::Pending(o) => o.volume,
        }
    }

    pub fn stop_loss(&self) -> Decimal {
        match self {
            OrderPayload::Market(o) => o.stop_loss,
            OrderPayload::Pending(o) => o.stop_loss,
        }
    }

    pub fn take_profit(&self) -> Option<Decimal> {
        match self {
            OrderPayload::Market(o) => o.take_profit,
            OrderPayload::Pending(o) => o.take_profit,
        }
    }

    /// Trigger price for pending orders.
    pub fn price(&self) -> Option<Decimal> {
        match self {
            OrderPayload::Market(_) => None,
            OrderPayload::Pending(o) => Some(o.price),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
