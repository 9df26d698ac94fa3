use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing_subscriber::{fmt, EnvFilter};

use chart_signal::config::Config;
use chart_signal::core::LotResult;
use chart_signal::models::LivePrice;
use chart_signal::oracle::parse_signal_text;
use chart_signal::pipeline::{Decision, SignalProcessor};

/// Offline replay: run a saved model response through validation, sizing and
/// assembly against a given quote. No terminal, model or sink is contacted.
#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::new(
            time::format_description::well_known::Rfc3339,
        ))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        println!("usage: signal-check <raw-response.json> <bid> <ask>");
        anyhow::bail!("missing arguments");
    }

    let text = tokio::fs::read_to_string(&args[1])
        .await
        .with_context(|| format!("Failed to read {}", args[1]))?;
    let bid = Decimal::from_str(&args[2]).with_context(|| format!("bad bid {}", args[2]))?;
    let ask = Decimal::from_str(&args[3]).with_context(|| format!("bad ask {}", args[3]))?;

    let processor = SignalProcessor::from_config(&cfg)?;
    let live = LivePrice {
        symbol: processor.contract.spec.symbol.clone(),
        bid,
        ask,
        timestamp: Utc::now(),
    };

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║          SIGNAL CHECK (offline)                          ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!("  Symbol:     {}", live.symbol);
    println!("  Quote:      {} / {}", live.bid, live.ask);
    println!(
        "  Contract:   {} ({}){}",
        processor.contract.spec.contract_size,
        processor.contract.spec.risk_unit,
        if processor.contract.defaulted { " [default]" } else { "" }
    );
    println!(
        "  Risk:       {}% of ${:.2}",
        processor.risk.risk_percentage, processor.risk.account_balance
    );
    println!();

    let raw = parse_signal_text(&text)?;
    let decision = match processor.process(&raw, &live) {
        Ok(d) => d,
        Err(e) => {
            println!("REJECTED: {}", e);
            anyhow::bail!(e);
        }
    };

    match decision {
        Decision::NoTrade { reasoning, .. } => {
            println!("NO TRADE: {}", reasoning.as_deref().unwrap_or("-"));
        }
        Decision::BelowMinimumVolume { lot, .. } => {
            print_lot(&lot);
            println!();
            println!("NOT TRADEABLE: volume truncates to 0 at lot step {}", processor.calculator.step());
        }
        Decision::Order {
            signal,
            lot,
            payload,
        } => {
            print_lot(&lot);
            for w in &signal.warnings {
                println!("  warning: {}", w);
            }
            println!();
            println!("{}", payload.to_json_pretty()?);
        }
    }

    Ok(())
}

fn print_lot(lot: &LotResult) {
    println!("Lot size:");
    println!("  Risk amount:   ${:.2}", lot.risk_amount);
    println!("  Distance:      {}", lot.price_difference);
    println!("  Risk per lot:  ${:.2}", lot.risk_per_lot);
    println!("  Raw lots:      {:.4}", lot.raw_lots);
    println!("  Final lots:    {}", lot.final_lots);
    println!(
        "  Actual risk:   ${:.2} ({})",
        lot.actual_risk,
        if lot.is_safe { "SAFE" } else { "EXCEEDS LIMIT" }
    );
    println!("  Margin:        ${:.2}", lot.safety_margin);
}
