use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePrice {
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl LivePrice {
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / dec!(2)
    }

    /// Price a market order in `direction` would fill at: ask for longs, bid for shorts.
    pub fn fill_price(&self, direction: Direction) -> Decimal {
        match direction {
            Direction::Long => self.ask,
            Direction::Short => self.bid,
        }
    }

    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.timestamp).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_side_follows_direction() {
        let p = LivePrice {
            symbol: "XAUUSD".to_string(),
            bid: dec!(2665.10),
            ask: dec!(2665.50),
            timestamp: Utc::now(),
        };
        assert_eq!(p.fill_price(Direction::Long), dec!(2665.50));
        assert_eq!(p.fill_price(Direction::Short), dec!(2665.10));
        assert_eq!(p.mid(), dec!(2665.30));
    }
}
