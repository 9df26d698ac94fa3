pub mod gemini;
pub mod prompt;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::OracleError;
use crate::models::RawSignal;

/// Vision model that turns a chart image and a prompt into a trade idea.
/// Its output is untrusted and goes through the normalizer before any use.
#[async_trait]
pub trait SignalOracle: Send + Sync {
    async fn analyze(&self, image: &[u8], prompt: &str) -> Result<RawSignal, OracleError>;
}

/// Decode model text into a [`RawSignal`], tolerating Markdown code fences.
/// A top-level array is accepted when its first element is an object.
pub fn parse_signal_text(text: &str) -> Result<RawSignal, OracleError> {
    let cleaned = strip_code_fences(text);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| OracleError::MalformedResponse(format!("{}: {}", e, preview(text))))?;

    let obj = match &value {
        Value::Object(obj) => obj,
        Value::Array(items) => items
            .first()
            .and_then(Value::as_object)
            .ok_or_else(|| OracleError::MalformedResponse(preview(text)))?,
        _ => return Err(OracleError::MalformedResponse(preview(text))),
    };
    Ok(RawSignal::from_object(obj))
}

fn strip_code_fences(text: &str) -> &str {
    let t = text.trim();
    let t = t
        .strip_prefix("```json")
        .or_else(|| t.strip_prefix("```JSON"))
        .or_else(|| t.strip_prefix("```"))
        .unwrap_or(t);
    t.strip_suffix("```").unwrap_or(t).trim()
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_fenced_json() {
        let text = "```json\n{\"action\": \"SELL_LIMIT\", \"entry_price\": 1.075, \"stop_loss\": 1.078}\n```";
        let raw = parse_signal_text(text).unwrap();
        assert_eq!(raw.action.as_deref(), Some("SELL_LIMIT"));
        assert_eq!(raw.entry_price, Some(json!(1.075)));
    }

    #[test]
    fn parses_first_element_of_array() {
        let raw = parse_signal_text(r#"[{"action":"BUY","sl":1}]"#).unwrap();
        assert_eq!(raw.action.as_deref(), Some("BUY"));
        assert_eq!(raw.stop_loss, Some(json!(1)));
    }

    #[test]
    fn prose_is_malformed() {
        let err = parse_signal_text("I think gold will go up").unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse(_)));
        assert!(parse_signal_text("42").is_err());
    }
}
