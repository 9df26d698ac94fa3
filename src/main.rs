mod bot;

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use chart_signal::config::Config;
use chart_signal::delivery::{DeliverySink, EmailSink, WebhookSink};
use chart_signal::error::ConfigError;
use chart_signal::exchange::TerminalClient;
use chart_signal::oracle::prompt::load_template;
use chart_signal::oracle::GeminiClient;
use chart_signal::pipeline::Pipeline;

use crate::bot::SignalBot;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::new(
            time::format_description::well_known::Rfc3339,
        ))
        .init();

    let api_key = cfg.require_api_key()?.to_string();
    let image_path = cfg
        .chart_image
        .clone()
        .ok_or(ConfigError::Missing { key: "CHART_IMAGE" })?;
    let template = load_template(&cfg.prompt_file)?;

    let mut sinks: Vec<Box<dyn DeliverySink>> = Vec::new();
    if let Some(url) = &cfg.webhook_url {
        sinks.push(Box::new(WebhookSink::new(url)?));
    }
    if let Some(dir) = &cfg.outbox_dir {
        sinks.push(Box::new(EmailSink::new(dir)));
    }

    let price_feed = Box::new(TerminalClient::new(&cfg)?);
    let oracle = Box::new(GeminiClient::new(&cfg, &api_key)?);
    let pipeline = Pipeline::new(&cfg, price_feed, oracle, sinks)?;

    let mut bot = SignalBot::new(&cfg, pipeline, template, image_path);
    bot.run().await?;

    Ok(())
}
