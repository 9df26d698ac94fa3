pub mod retry;

pub use retry::with_retry;

use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{Config, RiskConfig};
use crate::core::{assemble, ensure_within_budget, normalize, LotResult, LotSizeCalculator, ResolvedContract};
use crate::delivery::{fan_out, Delivery, DeliverySink};
use crate::error::{OracleError, PipelineError, PriceError};
use crate::exchange::PriceFeed;
use crate::models::{LivePrice, Normalized, OrderPayload, RawSignal, ValidatedSignal};
use crate::oracle::prompt::build_prompt;
use crate::oracle::SignalOracle;

/// Result of one run. Only `Order` is ever delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    NoTrade {
        reasoning: Option<String>,
        confidence: Option<Decimal>,
    },
    /// Sizing truncated to zero lots; reported, never upgraded.
    BelowMinimumVolume {
        signal: ValidatedSignal,
        lot: LotResult,
    },
    Order {
        signal: ValidatedSignal,
        lot: LotResult,
        payload: OrderPayload,
    },
}

/// Per-run constants for the core: risk, contract and lot rounding.
#[derive(Debug, Clone)]
pub struct SignalProcessor {
    pub risk: RiskConfig,
    pub contract: ResolvedContract,
    pub calculator: LotSizeCalculator,
}

impl SignalProcessor {
    pub fn from_config(cfg: &Config) -> Result<Self, PipelineError> {
        Ok(Self {
            risk: cfg.risk,
            contract: cfg.resolve_contract()?,
            calculator: cfg.lot_calculator()?,
        })
    }

    /// normalize -> size -> assemble. Pure apart from logging.
    pub fn process(&self, raw: &RawSignal, live: &LivePrice) -> Result<Decision, PipelineError> {
        let signal = match normalize(raw, live)? {
            Normalized::Hold {
                reasoning,
                confidence,
            } => {
                return Ok(Decision::NoTrade {
                    reasoning,
                    confidence,
                })
            }
            Normalized::Trade(signal) => signal,
        };

        let lot = self
            .calculator
            .compute(&signal, &self.risk, &self.contract.spec)?;

        if lot.is_below_minimum() {
            return Ok(Decision::BelowMinimumVolume { signal, lot });
        }
        ensure_within_budget(&lot)?;

        let payload = assemble(&signal, &lot, &self.contract.spec);
        Ok(Decision::Order {
            signal,
            lot,
            payload,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    pub price_timeout: Duration,
    pub oracle_timeout: Duration,
    pub retry_backoff: Duration,
    pub embed_live_price: bool,
}

impl RunSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            price_timeout: cfg.price_timeout,
            oracle_timeout: cfg.oracle_timeout,
            retry_backoff: cfg.retry_backoff,
            embed_live_price: cfg.embed_live_price,
        }
    }
}

pub struct Pipeline {
    symbol: String,
    processor: SignalProcessor,
    settings: RunSettings,
    price_feed: Box<dyn PriceFeed>,
    oracle: Box<dyn SignalOracle>,
    sinks: Vec<Box<dyn DeliverySink>>,
}

impl Pipeline {
    pub fn new(
        cfg: &Config,
        price_feed: Box<dyn PriceFeed>,
        oracle: Box<dyn SignalOracle>,
        sinks: Vec<Box<dyn DeliverySink>>,
    ) -> Result<Self, PipelineError> {
        let processor = SignalProcessor::from_config(cfg)?;
        Ok(Self {
            symbol: processor.contract.spec.symbol.clone(),
            processor,
            settings: RunSettings::from_config(cfg),
            price_feed,
            oracle,
            sinks,
        })
    }

    pub fn processor(&self) -> &SignalProcessor {
        &self.processor
    }

    /// Fetch price and analysis, then decide. Dropping this future cancels the
    /// run; nothing has been delivered at that point.
    pub async fn decide(&self, image: &[u8], template: &str) -> Result<Decision, PipelineError> {
        let (live, raw) = if self.settings.embed_live_price {
            let live = self.fetch_price().await?;
            let prompt = build_prompt(template, &self.symbol, Some(live.mid()));
            let raw = self.analyze(image, &prompt).await?;
            (live, raw)
        } else {
            let prompt = build_prompt(template, &self.symbol, None);
            tokio::try_join!(
                async { self.fetch_price().await.map_err(PipelineError::from) },
                async { self.analyze(image, &prompt).await.map_err(PipelineError::from) },
            )?
        };

        self.processor.process(&raw, &live)
    }

    /// Hand an `Order` decision to every sink. Other decisions deliver nothing.
    pub async fn deliver(&self, decision: &Decision) -> usize {
        let Decision::Order {
            signal,
            lot,
            payload,
        } = decision
        else {
            return 0;
        };
        let delivery = Delivery {
            payload: payload.clone(),
            lot: lot.clone(),
            signal: signal.clone(),
            contract_defaulted: self.processor.contract.defaulted,
            created_at: Utc::now(),
        };
        fan_out(&self.sinks, &delivery).await
    }

    pub async fn run(&self, image: &[u8], template: &str) -> Result<Decision, PipelineError> {
        let decision = self.decide(image, template).await?;
        match &decision {
            Decision::NoTrade { reasoning, .. } => {
                info!(
                    "No trade this run{}",
                    reasoning
                        .as_deref()
                        .map(|r| format!(": {}", r))
                        .unwrap_or_default()
                );
            }
            Decision::BelowMinimumVolume { lot, .. } => {
                warn!(
                    "Calculated volume {} is below the broker step; nothing sent (raw {:.4})",
                    lot.final_lots, lot.raw_lots
                );
            }
            Decision::Order { .. } => {
                let delivered = self.deliver(&decision).await;
                info!("Order handed to {}/{} sinks", delivered, self.sinks.len());
            }
        }
        Ok(decision)
    }

    async fn fetch_price(&self) -> Result<LivePrice, PriceError> {
        let symbol = self.symbol.as_str();
        with_retry(
            "price fetch",
            self.settings.price_timeout,
            self.settings.retry_backoff,
            || PriceError::ConnectionFailed(format!("timed out after {:?}", self.settings.price_timeout)),
            || self.price_feed.get_price(symbol),
        )
        .await
    }

    async fn analyze(&self, image: &[u8], prompt: &str) -> Result<RawSignal, OracleError> {
        with_retry(
            "chart analysis",
            self.settings.oracle_timeout,
            self.settings.retry_backoff,
            || OracleError::Timeout,
            || self.oracle.analyze(image, prompt),
        )
        .await
    }
}
