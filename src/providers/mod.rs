//! Provider subsystem for language-model backends.
//!
//! Each backend implements the one-method [`Provider`] trait defined in
//! [`traits`] and is registered in the factory function [`create_provider`]
//! by its canonical string key. Every call site wraps provider calls in
//! [`reliable::call_with_retry`] so rate limits are handled in one place.
//!
//! # Extension
//!
//! To add a new provider, implement [`Provider`] in a new submodule, register
//! it in [`create_provider`], and list it in [`list_providers`].

pub mod compatible;
pub mod gemini;
pub mod reliable;
pub mod traits;

pub use reliable::{call_with_retry, RetryPolicy, TransientError};
pub use traits::Provider;

use compatible::{AuthStyle, OpenAiCompatibleProvider};
use gemini::GeminiProvider;

const MAX_API_ERROR_CHARS: usize = 200;
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Settings shared by every provider constructed through the factory.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub model: String,
    pub temperature: f64,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.2,
        }
    }
}

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Scrub known secret-like token prefixes from provider error strings.
///
/// Redacts tokens with prefixes like `sk-` (OpenAI), `AIza` (Google API keys)
/// and bearer tokens echoed back by gateways.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [&str; 4] = ["sk-", "AIza", "Bearer ", "key="];

    let mut scrubbed = input.to_string();

    for prefix in PREFIXES {
        let mut search_from = 0;
        loop {
            let Some(rel) = scrubbed[search_from..].find(prefix) else {
                break;
            };

            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Sanitize API error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

/// Build a sanitized provider error from a failed HTTP response.
///
/// The status code stays in the message so the retry wrapper can spot `429`.
pub async fn api_error(provider: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());
    describe_api_error(provider, status, &body)
}

/// Sanitized error text for a failed call. A `retry in Ns` hint from the raw
/// body is appended so truncation cannot hide it from the retry wrapper.
fn describe_api_error(provider: &str, status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    let sanitized = sanitize_api_error(body);
    let mut description = format!("{provider} API error ({status}): {sanitized}");
    if let Some(hint) = reliable::parse_retry_hint(body) {
        description.push_str(&format!(" (retry in {:.3}s)", hint.as_secs_f64()));
    }
    anyhow::anyhow!(description)
}

/// Resolve API key for a provider from config and environment variables.
fn resolve_provider_credential(name: &str, credential_override: Option<&str>) -> Option<String> {
    if let Some(raw_override) = credential_override {
        let trimmed_override = raw_override.trim();
        if !trimmed_override.is_empty() {
            return Some(trimmed_override.to_owned());
        }
    }

    let provider_env_candidates: Vec<&str> = match name {
        "gemini" | "google" => vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        "openai" => vec!["OPENAI_API_KEY"],
        "azure-openai" => vec!["AZURE_OPENAI_KEY"],
        _ => vec![],
    };

    for env_var in provider_env_candidates
        .into_iter()
        .chain(["CLOUDPILOT_API_KEY", "API_KEY"])
    {
        if let Ok(value) = std::env::var(env_var) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Factory: create the right provider from its name and options.
///
/// Accepts the canonical names from [`list_providers`], their aliases, and
/// `custom:<URL>` for any OpenAI-compatible endpoint.
pub fn create_provider(name: &str, options: &ProviderOptions) -> anyhow::Result<Box<dyn Provider>> {
    let normalized = name.trim();
    let key = resolve_provider_credential(normalized, options.api_key.as_deref());
    let key = key.as_deref();
    let model = options.model.as_str();
    let temperature = options.temperature;

    if let Some(url) = normalized.strip_prefix("custom:") {
        let url = url.trim();
        if url.is_empty() {
            anyhow::bail!("custom provider requires a URL, e.g. custom:http://localhost:11434/v1");
        }
        return Ok(Box::new(OpenAiCompatibleProvider::new(
            "custom",
            url,
            key,
            AuthStyle::Bearer,
            model,
            temperature,
        )));
    }

    match normalized {
        "gemini" | "google" => Ok(Box::new(GeminiProvider::with_base_url(
            options.api_url.as_deref(),
            key,
            model,
            temperature,
        ))),
        "openai" => Ok(Box::new(OpenAiCompatibleProvider::new(
            "openai",
            options.api_url.as_deref().unwrap_or(OPENAI_BASE_URL),
            key,
            AuthStyle::Bearer,
            model,
            temperature,
        ))),
        "azure-openai" => {
            let Some(url) = options.api_url.as_deref() else {
                anyhow::bail!(
                    "azure-openai requires api_url (the deployment's chat/completions endpoint)"
                );
            };
            Ok(Box::new(OpenAiCompatibleProvider::new(
                "azure-openai",
                url,
                key,
                AuthStyle::ApiKey,
                model,
                temperature,
            )))
        }
        _ => anyhow::bail!(
            "Unknown provider: {name}. Supported: gemini, openai, azure-openai, custom:<URL>."
        ),
    }
}

/// Information about a supported provider for display purposes.
pub struct ProviderInfo {
    /// Canonical name used in config (e.g. `"gemini"`)
    pub name: &'static str,
    /// Human-readable display name
    pub display_name: &'static str,
    /// Alternative names accepted in config
    pub aliases: &'static [&'static str],
    /// Whether an `api_url` must be configured
    pub requires_url: bool,
}

/// Return the list of all known providers for display in `cloudpilot providers`.
pub fn list_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            name: "gemini",
            display_name: "Google Gemini",
            aliases: &["google"],
            requires_url: false,
        },
        ProviderInfo {
            name: "openai",
            display_name: "OpenAI",
            aliases: &[],
            requires_url: false,
        },
        ProviderInfo {
            name: "azure-openai",
            display_name: "Azure OpenAI",
            aliases: &[],
            requires_url: true,
        },
    ]
}
