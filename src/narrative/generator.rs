use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

use super::prompts::SYSTEM_INSTRUCTION;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Failures from the generative-text service. The flow layer collapses all
/// of these into "narrative unavailable"; they never block stats rendering.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NarrativeError {
    #[error("Narrative API error: {0}")]
    Api(u16),

    #[error("Narrative request failed: {0}")]
    Network(String),

    #[error("Malformed narrative response: {0}")]
    Malformed(String),
}

/// Client for the Gemini `generateContent` endpoint.
pub struct Generator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base: String,
}

impl Generator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base(api_key, model, API_BASE)
    }

    /// Point the generator at a different base URL. Exists for test doubles.
    pub fn with_base(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build reqwest client");
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base: base.into(),
        }
    }

    /// Submit the prompt with the fixed system instruction and return the
    /// raw response text. The output is non-deterministic; callers cache the
    /// first success per input pair instead of regenerating.
    pub async fn generate(&self, prompt: &str) -> Result<String, NarrativeError> {
        info!("Generating narrative with model '{}'", self.model);

        let body = serde_json::json!({
            "contents": [
                {"parts": [{"text": prompt}]}
            ],
            "systemInstruction": {
                "parts": [{"text": SYSTEM_INSTRUCTION}]
            }
        });

        let url = format!("{}/models/{}:generateContent", self.base, self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let msg = if e.is_timeout() {
                    "timed out after 60s".to_string()
                } else {
                    e.to_string()
                };
                error!("Narrative request failed: {}", msg);
                NarrativeError::Network(msg)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Narrative API returned {}: {}", status, truncate(&body, 512));
            return Err(NarrativeError::Api(status.as_u16()));
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| NarrativeError::Network(e.to_string()))?;
        extract_text(&body_text)
    }
}

/// Pull the generated text out of the response wrapper:
/// `candidates[0].content.parts[*].text`, parts concatenated.
fn extract_text(body: &str) -> Result<String, NarrativeError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| NarrativeError::Malformed(format!("not JSON: {}", e)))?;

    let parts = value["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| NarrativeError::Malformed("no candidates in response".to_string()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(NarrativeError::Malformed(
            "candidate carries no text".to_string(),
        ));
    }
    Ok(text)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
