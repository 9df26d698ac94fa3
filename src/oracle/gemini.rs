use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::OracleError;
use crate::models::{OrderAction, RawSignal};
use crate::oracle::{parse_signal_text, SignalOracle};

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: Value,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(cfg: &Config, api_key: &str) -> Result<Self, OracleError> {
        Self::with_base_url(&cfg.gemini_base_url, api_key, &cfg.gemini_model, cfg.oracle_timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::ApiError(format!("HTTP client setup: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn generate(&self, image: &[u8], prompt: &str) -> Result<String, OracleError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: sniff_mime(image),
                            data: STANDARD.encode(image),
                        },
                    },
                ],
            }],
            generation_config: json!({
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            }),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        info!("Sending {} byte image to {} for analysis", image.len(), self.model);

        let resp = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout
                } else {
                    OracleError::ApiError(e.to_string())
                }
            })?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::QuotaExceeded);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::ApiError(format!("{}: {}", status, body)));
        }

        let data: GenerateResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout
            } else {
                OracleError::ApiError(format!("Failed to parse response: {}", e))
            }
        })?;

        let text: String = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(OracleError::ApiError("response contained no text".to_string()));
        }
        debug!("Raw model response: {}", text);
        Ok(text)
    }
}

#[async_trait]
impl SignalOracle for GeminiClient {
    async fn analyze(&self, image: &[u8], prompt: &str) -> Result<RawSignal, OracleError> {
        let text = self.generate(image, prompt).await?;
        let raw = parse_signal_text(&text)?;
        info!("Analysis received: action={:?}", raw.action);
        Ok(raw)
    }
}

fn response_schema() -> Value {
    let mut actions: Vec<&str> = OrderAction::ALL.iter().map(|a| a.as_str()).collect();
    actions.push("HOLD");
    json!({
        "type": "OBJECT",
        "properties": {
            "symbol": { "type": "STRING" },
            "action": { "type": "STRING", "enum": actions },
            "entry_price": {
                "type": "NUMBER",
                "description": "Required for every order. Market orders use the current price; pending orders use the trigger level."
            },
            "stop_loss": { "type": "NUMBER" },
            "take_profit": { "type": "NUMBER" },
            "confidence": { "type": "NUMBER", "description": "Confidence between 0 and 100" },
            "reasoning": { "type": "STRING" }
        },
        "required": ["symbol", "action", "entry_price", "stop_loss", "take_profit"]
    })
}

fn sniff_mime(image: &[u8]) -> &'static str {
    if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if image.starts_with(b"RIFF") && image.get(8..12) == Some(b"WEBP".as_slice()) {
        "image/webp"
    } else {
        "image/png"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: "p".to_string(),
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: STANDARD.encode([1u8, 2, 3]),
                        },
                    },
                ],
            }],
            generation_config: json!({}),
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "p");
        assert_eq!(v["contents"][0]["parts"][1]["inline_data"]["data"], "AQID");
        assert!(v.get("generationConfig").is_some());
    }

    #[test]
    fn schema_allows_hold() {
        let s = response_schema();
        let actions = s["properties"]["action"]["enum"].as_array().unwrap();
        assert_eq!(actions.len(), 7);
        assert!(actions.iter().any(|a| a == "HOLD"));
    }

    #[test]
    fn mime_sniffing() {
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_mime(b"\x89PNG\r\n"), "image/png");
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
    }
}
