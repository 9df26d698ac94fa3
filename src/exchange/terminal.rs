use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::contracts::normalize_symbol;
use crate::core::normalizer::coerce_decimal;
use crate::error::PriceError;
use crate::exchange::PriceFeed;
use crate::models::LivePrice;

/// Last tick as published by the terminal bridge.
#[derive(Debug, Deserialize)]
struct TickResponse {
    bid: Value,
    ask: Value,
    /// Unix seconds of the last quote.
    #[serde(default)]
    time: Option<i64>,
}

/// HTTP client for a trading-terminal bridge exposing `GET /tick/{symbol}`.
pub struct TerminalClient {
    client: Client,
    base_url: String,
    max_age_secs: i64,
}

impl TerminalClient {
    pub fn new(cfg: &Config) -> Result<Self, PriceError> {
        Self::with_base_url(&cfg.terminal_url, cfg.price_timeout, cfg.max_price_age_secs)
    }

    pub fn with_base_url(
        base_url: &str,
        timeout: Duration,
        max_age_secs: i64,
    ) -> Result<Self, PriceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceError::ConnectionFailed(format!("HTTP client setup: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_age_secs,
        })
    }

    pub async fn fetch_tick(&self, symbol: &str) -> Result<LivePrice, PriceError> {
        let symbol = normalize_symbol(symbol);
        info!("Requesting {} tick from terminal at {}", symbol, self.base_url);

        let resp = self
            .client
            .get(format!("{}/tick/{}", self.base_url, symbol))
            .send()
            .await
            .map_err(|e| PriceError::ConnectionFailed(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PriceError::SymbolNotFound(symbol));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PriceError::ConnectionFailed(format!(
                "terminal error {}: {}",
                status, body
            )));
        }

        let tick: TickResponse = resp
            .json()
            .await
            .map_err(|e| PriceError::ConnectionFailed(format!("bad tick payload: {}", e)))?;

        let price = parse_tick(&symbol, tick)?;

        let age = price.age_secs(Utc::now());
        if age > self.max_age_secs {
            warn!("{} tick is {}s old (limit {}s)", symbol, age, self.max_age_secs);
        }
        info!("Price for {}: bid {} ask {}", symbol, price.bid, price.ask);

        Ok(price)
    }
}

fn parse_tick(symbol: &str, tick: TickResponse) -> Result<LivePrice, PriceError> {
    let read = |name: &str, v: &Value| -> Result<Decimal, PriceError> {
        coerce_decimal(v)
            .filter(|d| *d > Decimal::ZERO)
            .ok_or_else(|| PriceError::ConnectionFailed(format!("{} {} is not a usable price", name, v)))
    };
    let bid = read("bid", &tick.bid)?;
    let ask = read("ask", &tick.ask)?;
    if bid > ask {
        return Err(PriceError::ConnectionFailed(format!(
            "crossed quote for {}: bid {} > ask {}",
            symbol, bid, ask
        )));
    }

    let timestamp = tick
        .time
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .unwrap_or_else(Utc::now);

    Ok(LivePrice {
        symbol: symbol.to_string(),
        bid,
        ask,
        timestamp,
    })
}

#[async_trait]
impl PriceFeed for TerminalClient {
    async fn get_price(&self, symbol: &str) -> Result<LivePrice, PriceError> {
        self.fetch_tick(symbol).await
    }
}
