use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Tradeable actions. HOLD never reaches this type; see [`ParsedAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderAction {
    Buy,
    Sell,
    BuyLimit,
    SellLimit,
    BuyStop,
    SellStop,
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl OrderAction {
    pub const ALL: [OrderAction; 6] = [
        OrderAction::Buy,
        OrderAction::Sell,
        OrderAction::BuyLimit,
        OrderAction::SellLimit,
        OrderAction::BuyStop,
        OrderAction::SellStop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::Buy => "BUY",
            OrderAction::Sell => "SELL",
            OrderAction::BuyLimit => "BUY_LIMIT",
            OrderAction::SellLimit => "SELL_LIMIT",
            OrderAction::BuyStop => "BUY_STOP",
            OrderAction::SellStop => "SELL_STOP",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            OrderAction::Buy | OrderAction::BuyLimit | OrderAction::BuyStop => Direction::Long,
            OrderAction::Sell | OrderAction::SellLimit | OrderAction::SellStop => Direction::Short,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.direction() == Direction::Long
    }

    /// LIMIT and STOP orders wait for a trigger price.
    pub fn is_pending(&self) -> bool {
        !matches!(self, OrderAction::Buy | OrderAction::Sell)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedAction {
    Hold,
    Order(OrderAction),
}

impl ParsedAction {
    /// Map free-text model output onto the closed action set.
    ///
    /// Case, surrounding whitespace and the separator between side and order
    /// type (`_`, `-`, space or nothing) are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_uppercase()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect();

        let action = match key.as_str() {
            "BUY" | "LONG" | "BUYMARKET" => OrderAction::Buy,
            "SELL" | "SHORT" | "SELLMARKET" => OrderAction::Sell,
            "BUYLIMIT" | "LONGLIMIT" => OrderAction::BuyLimit,
            "SELLLIMIT" | "SHORTLIMIT" => OrderAction::SellLimit,
            "BUYSTOP" | "LONGSTOP" => OrderAction::BuyStop,
            "SELLSTOP" | "SHORTSTOP" => OrderAction::SellStop,
            "HOLD" | "NONE" | "NOTRADE" | "WAIT" | "FLAT" | "NEUTRAL" => {
                return Some(ParsedAction::Hold)
            }
            _ => return None,
        };
        Some(ParsedAction::Order(action))
    }
}
