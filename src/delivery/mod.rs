pub mod email;
pub mod webhook;

pub use email::EmailSink;
pub use webhook::WebhookSink;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::core::LotResult;
use crate::models::{OrderPayload, ValidatedSignal};

/// Everything a sink may need: the order itself plus its audit trail.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub payload: OrderPayload,
    pub lot: LotResult,
    pub signal: ValidatedSignal,
    pub contract_defaulted: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait DeliverySink: Send + Sync {
    fn name(&self) -> &str;
    async fn deliver(&self, delivery: &Delivery) -> Result<()>;
}

/// Hand the delivery to every sink. Failures are reported and never change
/// the computed order. Returns how many sinks accepted it.
pub async fn fan_out(sinks: &[Box<dyn DeliverySink>], delivery: &Delivery) -> usize {
    let mut delivered = 0;
    for sink in sinks {
        match sink.deliver(delivery).await {
            Ok(()) => {
                info!("Delivered order to {}", sink.name());
                delivered += 1;
            }
            Err(e) => error!("Delivery to {} failed: {:#}", sink.name(), e),
        }
    }
    delivered
}
