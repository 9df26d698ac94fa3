use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::delivery::{Delivery, DeliverySink};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs the bare order payload as JSON.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl DeliverySink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, delivery: &Delivery) -> Result<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(&delivery.payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach webhook {}", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Webhook returned {}: {}", status, body);
        }
        Ok(())
    }
}
