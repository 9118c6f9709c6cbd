//! Two-stage intent classification.
//!
//! Stage 1 matches fixed keyword sets in [`Intent::PRIORITY`] order and never
//! leaves the process. Stage 2 runs only when no keyword matched: it asks the
//! language model for a category name through the retry wrapper. A stage 2
//! failure falls open to [`Intent::FALLBACK`] and is recorded in the
//! [`ClassificationMethod`] so the choice stays traceable.

use super::intent::Intent;
use crate::providers::{call_with_retry, Provider, RetryPolicy};
use std::fmt::Write;
use std::sync::Arc;

/// How an intent was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationMethod {
    /// A keyword from the intent's table appeared in the query.
    Keyword { keyword: &'static str },
    /// The model replied with a recognizable category name.
    Model { raw: String },
    /// The model call failed or its reply named no category.
    Fallback { reason: String },
}

impl ClassificationMethod {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Keyword { .. } => "keyword",
            Self::Model { .. } => "model",
            Self::Fallback { .. } => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    pub method: ClassificationMethod,
}

/// Why the model stage could not produce an intent.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("classification model call failed: {0:#}")]
    Model(#[source] anyhow::Error),
    #[error("classification reply named no known category: {0:?}")]
    Unparseable(String),
}

/// Stage 1: first keyword hit in priority order, or `None`.
pub fn match_keywords(query: &str) -> Option<(Intent, &'static str)> {
    let lowered = query.to_lowercase();
    Intent::PRIORITY.into_iter().find_map(|intent| {
        intent
            .keywords()
            .iter()
            .find(|keyword| lowered.contains(*keyword))
            .map(|keyword| (intent, *keyword))
    })
}

/// Find a category name anywhere in a model reply. Case-insensitive; spaces
/// and hyphens count as underscores. Ties resolve in priority order.
pub fn parse_category(reply: &str) -> Option<Intent> {
    let normalized = reply.to_uppercase().replace([' ', '-'], "_");
    Intent::PRIORITY
        .into_iter()
        .find(|intent| normalized.contains(intent.category()))
}

/// Prompt listing every category with its example keywords, then the query.
pub fn classification_prompt(query: &str) -> String {
    let mut prompt = String::from(
        "You are a cloud operations router.\n\
         Classify the following user query into exactly one of these categories:\n",
    );
    for (index, intent) in Intent::PRIORITY.into_iter().enumerate() {
        let _ = writeln!(
            prompt,
            "{}. {} ({}; keywords: {})",
            index + 1,
            intent.category(),
            intent.description(),
            intent.keywords().join(", ")
        );
    }
    let _ = write!(
        prompt,
        "\nUser query: \"{query}\"\n\n\
         Return ONLY the category name exactly as written above."
    );
    prompt
}

/// Classifies queries, calling the model only when no keyword matches.
pub struct IntentClassifier {
    model: Arc<dyn Provider>,
    retry: RetryPolicy,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn Provider>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    pub async fn classify(&self, query: &str) -> Classification {
        if let Some((intent, keyword)) = match_keywords(query) {
            tracing::debug!(intent = intent.id(), keyword, "Classified by keyword");
            return Classification {
                intent,
                method: ClassificationMethod::Keyword { keyword },
            };
        }

        match self.classify_with_model(query).await {
            Ok((intent, raw)) => {
                tracing::debug!(intent = intent.id(), "Classified by model");
                Classification {
                    intent,
                    method: ClassificationMethod::Model { raw },
                }
            }
            Err(error) => {
                let reason = error.to_string();
                tracing::warn!(
                    fallback = Intent::FALLBACK.id(),
                    reason = %crate::providers::sanitize_api_error(&reason),
                    "Intent classification failed; using fallback intent"
                );
                Classification {
                    intent: Intent::FALLBACK,
                    method: ClassificationMethod::Fallback { reason },
                }
            }
        }
    }

    /// Stage 2 on its own: one model call (plus retries) and a parse.
    pub async fn classify_with_model(
        &self,
        query: &str,
    ) -> Result<(Intent, String), ClassificationError> {
        let prompt = classification_prompt(query);
        let model = &self.model;
        let prompt = prompt.as_str();

        let reply = call_with_retry(&self.retry, || async move { model.complete(prompt).await })
            .await
            .map_err(ClassificationError::Model)?;

        let raw = reply.trim().to_string();
        match parse_category(&raw) {
            Some(intent) => Ok((intent, raw)),
            None => Err(ClassificationError::Unparseable(raw)),
        }
    }
}
