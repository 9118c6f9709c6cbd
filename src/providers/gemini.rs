//! Google Gemini provider (`models/{model}:generateContent`).

use crate::providers::reliable::parse_retry_hint;
use crate::providers::traits::Provider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: Option<&str>, model: &str, temperature: f64) -> Self {
        Self::with_base_url(None, api_key, model, temperature)
    }

    pub fn with_base_url(
        base_url: Option<&str>,
        api_key: Option<&str>,
        model: &str,
        temperature: f64,
    ) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.map(ToString::to_string),
            model: normalize_model_name(model),
            temperature,
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Accept both `gemini-2.5-flash` and the fully qualified `models/gemini-2.5-flash`.
fn normalize_model_name(model: &str) -> String {
    let trimmed = model.trim();
    trimmed
        .strip_prefix("models/")
        .unwrap_or(trimmed)
        .to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

fn extract_text(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Build an error from a Gemini error body, keeping the status token and any
/// retry hint visible even when the message itself gets truncated.
fn describe_error(status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    let (message, status_token) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.to_string(), String::new()),
    };

    let sanitized = super::sanitize_api_error(&message);
    let mut description = format!("gemini API error ({status})");
    if !status_token.is_empty() {
        description.push_str(&format!(" {status_token}"));
    }
    description.push_str(&format!(": {sanitized}"));
    if let Some(hint) = parse_retry_hint(&message) {
        description.push_str(&format!(" (retry in {:.3}s)", hint.as_secs_f64()));
    }
    anyhow::anyhow!(description)
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "gemini API key not set. Set GEMINI_API_KEY or api_key in config.toml."
            )
        })?;

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
            return Err(describe_error(status, &body));
        }

        let parsed: GenerateResponse = response.json().await?;
        extract_text(parsed).ok_or_else(|| anyhow::anyhow!("Empty response from gemini"))
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
