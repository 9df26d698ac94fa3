use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::Path;

use crate::models::OrderAction;

/// Read the operator's analysis prompt.
pub fn load_template(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt template {}", path.display()))?;
    if text.trim().is_empty() {
        anyhow::bail!("Prompt template {} is empty", path.display());
    }
    Ok(text)
}

/// Append the fixed output requirements to the template. The live price is
/// included only when the caller fetched it before the model call.
pub fn build_prompt(template: &str, symbol: &str, live_price: Option<Decimal>) -> String {
    let actions: Vec<&str> = OrderAction::ALL.iter().map(|a| a.as_str()).collect();
    let mut out = String::with_capacity(template.len() + 800);
    out.push_str(template.trim_end());
    out.push_str("\n\nCRITICAL REQUIREMENTS:\n");
    out.push_str(&format!("- Instrument: {}\n", symbol));
    out.push_str(&format!(
        "- \"action\" must be one of {} or HOLD when there is no trade\n",
        actions.join(", ")
    ));
    out.push_str("- You MUST provide a numeric \"entry_price\" for every trade\n");
    match live_price {
        Some(p) => out.push_str(&format!(
            "- For MARKET orders (BUY/SELL): entry_price = current market price ({})\n",
            p
        )),
        None => out.push_str("- For MARKET orders (BUY/SELL): entry_price = the last price on the chart\n"),
    }
    out.push_str("- For PENDING orders (LIMIT/STOP): entry_price = your specified trigger level\n");
    out.push_str("- \"stop_loss\" is mandatory and must differ from entry_price\n");
    out.push_str("- \"confidence\" is a number between 0 and 100\n");
    if let Some(p) = live_price {
        out.push_str(&format!("- Current market price is: {}\n", p));
    }
    out.push_str("\nRespond with a single JSON object.\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn live_price_is_embedded_when_known() {
        let p = build_prompt("Analyse this chart.", "XAUUSD", Some(dec!(2665.50)));
        assert!(p.starts_with("Analyse this chart."));
        assert!(p.contains("Current market price is: 2665.50"));
        assert!(p.contains("BUY_LIMIT"));
    }

    #[test]
    fn no_price_without_feed() {
        let p = build_prompt("Analyse.", "EURUSD", None);
        assert!(!p.contains("Current market price"));
        assert!(p.contains("EURUSD"));
    }

    #[test]
    fn empty_template_is_an_error() {
        let path = std::env::temp_dir().join(format!("chart_signal_prompt_{}.txt", std::process::id()));
        std::fs::write(&path, "   \n").unwrap();
        assert!(load_template(&path).is_err());
        std::fs::remove_file(&path).ok();
        assert!(load_template(&path).is_err());
    }
}
