use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info, warn};

use chart_signal::config::Config;
use chart_signal::error::{ErrorCategory, PipelineError};
use chart_signal::pipeline::{Decision, Pipeline};

pub struct SignalBot {
    pipeline: Pipeline,
    template: String,
    image_path: String,
    interval: Option<Duration>,
}

impl SignalBot {
    pub fn new(cfg: &Config, pipeline: Pipeline, template: String, image_path: String) -> Self {
        let processor = pipeline.processor();

        info!("{}", "=".repeat(60));
        info!("Chart signal pipeline starting up");
        info!("Symbol: {}", processor.contract.spec.symbol);
        info!(
            "Contract: {} ({}){}",
            processor.contract.spec.contract_size,
            processor.contract.spec.risk_unit,
            if processor.contract.defaulted { " DEFAULTED" } else { "" }
        );
        info!("Account Balance: ${:.2}", cfg.risk.account_balance);
        info!("Risk Percentage: {}%", cfg.risk.risk_percentage);
        info!("Risk Amount: ${:.2}", cfg.risk.risk_amount());
        info!("Lot step: {}  max lots: {:?}", cfg.lot_step, cfg.max_lots);
        match cfg.run_interval {
            Some(i) => info!("Mode: scheduled every {}s", i.as_secs()),
            None => info!("Mode: single run"),
        }
        info!("{}", "=".repeat(60));

        Self {
            pipeline,
            template,
            image_path,
            interval: cfg.run_interval,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let Some(interval) = self.interval else {
            return match self.run_once().await {
                Err(e) if is_cancel(&e) => Ok(()),
                other => other,
            };
        };

        info!("Running every {}s. Press Ctrl+C to stop.", interval.as_secs());
        loop {
            if let Err(e) = self.run_once().await {
                if is_cancel(&e) {
                    return Ok(());
                }
                warn!("Run failed, waiting for the next one: {:#}", e);
            }
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// One isolated run. Ctrl+C during the external calls abandons it before
    /// anything is delivered.
    async fn run_once(&self) -> Result<()> {
        let image = tokio::fs::read(&self.image_path)
            .await
            .with_context(|| format!("Failed to read chart image {}", self.image_path))?;

        let decision = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("Run cancelled; nothing delivered");
                return Err(PipelineError::Cancelled.into());
            }
            d = self.pipeline.decide(&image, &self.template) => d,
        };

        let decision = match decision {
            Ok(d) => d,
            Err(e) => {
                report(&e);
                return Err(e.into());
            }
        };

        match &decision {
            Decision::NoTrade { reasoning, confidence } => {
                info!(
                    "Model recommends no trade (confidence {:?}): {}",
                    confidence,
                    reasoning.as_deref().unwrap_or("-")
                );
            }
            Decision::BelowMinimumVolume { lot, .. } => {
                warn!(
                    "Risk budget ${:.2} buys {} lots (raw {:.4}); below broker step, nothing sent",
                    lot.risk_amount, lot.final_lots, lot.raw_lots
                );
            }
            Decision::Order { payload, signal, .. } => {
                for w in &signal.warnings {
                    warn!("Signal warning: {}", w);
                }
                println!("\n--- FINAL TRADE ORDER ---");
                println!("{}", payload.to_json_pretty()?);
                let delivered = self.pipeline.deliver(&decision).await;
                info!("Order handed to {} sink(s)", delivered);
            }
        }

        info!("Task completed");
        Ok(())
    }
}

fn report(e: &PipelineError) {
    match e.category() {
        ErrorCategory::Configuration => error!("ABORTING: configuration error: {}", e),
        ErrorCategory::Oracle => error!("ABORTING: external call failed: {}", e),
        ErrorCategory::Validation => error!("ABORTING: model output rejected: {}", e),
        ErrorCategory::Arithmetic => error!("ABORTING: risk invariant violated: {}", e),
        ErrorCategory::Cancelled => warn!("Run cancelled"),
    }
}

fn is_cancel(e: &anyhow::Error) -> bool {
    matches!(e.downcast_ref::<PipelineError>(), Some(PipelineError::Cancelled))
}
