pub mod terminal;

pub use terminal::TerminalClient;

use async_trait::async_trait;

use crate::error::PriceError;
use crate::models::LivePrice;

#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn get_price(&self, symbol: &str) -> Result<LivePrice, PriceError>;
}
