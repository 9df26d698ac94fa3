use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chart_signal::config::Config;
use chart_signal::delivery::{Delivery, DeliverySink};
use chart_signal::error::{OracleError, PriceError};
use chart_signal::exchange::PriceFeed;
use chart_signal::models::{LivePrice, OrderPayload, RawSignal};
use chart_signal::oracle::{parse_signal_text, SignalOracle};

/// Config from explicit pairs with fast timeouts and retry backoff.
pub fn test_config(pairs: &[(&str, &str)]) -> Config {
    let mut map: HashMap<String, String> = [
        ("RETRY_BACKOFF_MS", "1"),
        ("PRICE_TIMEOUT_SECS", "2"),
        ("ORACLE_TIMEOUT_SECS", "2"),
        ("MAX_LOTS", "none"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in pairs {
        map.insert(k.to_string(), v.to_string());
    }
    Config::from_vars(|k| map.get(k).cloned()).unwrap()
}

/// Quote source that can fail its first `failures` calls.
pub struct MockFeed {
    pub bid: Decimal,
    pub ask: Decimal,
    pub failures: u32,
    pub calls: Arc<AtomicU32>,
}

impl MockFeed {
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self {
            bid,
            ask,
            failures: 0,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl PriceFeed for MockFeed {
    async fn get_price(&self, symbol: &str) -> Result<LivePrice, PriceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(PriceError::ConnectionFailed("terminal offline".to_string()));
        }
        Ok(LivePrice {
            symbol: symbol.to_string(),
            bid: self.bid,
            ask: self.ask,
            timestamp: Utc::now(),
        })
    }
}

/// Model stub returning canned text, optionally failing first.
pub struct MockOracle {
    pub text: String,
    pub failures: u32,
    /// Simulated model latency per call.
    pub delay: Option<Duration>,
    pub calls: Arc<AtomicU32>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl MockOracle {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            failures: 0,
            delay: None,
            calls: Arc::new(AtomicU32::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SignalOracle for MockOracle {
    async fn analyze(&self, _image: &[u8], prompt: &str) -> Result<RawSignal, OracleError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if n < self.failures {
            return Err(OracleError::QuotaExceeded);
        }
        parse_signal_text(&self.text)
    }
}

/// Records every payload it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub received: Arc<Mutex<Vec<OrderPayload>>>,
}

#[async_trait]
impl DeliverySink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, delivery: &Delivery) -> anyhow::Result<()> {
        self.received.lock().unwrap().push(delivery.payload.clone());
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl DeliverySink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn deliver(&self, _delivery: &Delivery) -> anyhow::Result<()> {
        anyhow::bail!("relay unavailable")
    }
}
