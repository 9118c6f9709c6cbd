//! Language-model provider interface.

use async_trait::async_trait;
use std::sync::Arc;

/// A text-in, text-out language model backend.
///
/// Intent classification and summary generation both go through this one
/// method; concrete backends (OpenAI-compatible, Gemini) adapt their wire
/// formats to it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send a single prompt and return the model's text reply.
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;

    /// Canonical provider name (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Model identifier the provider sends requests to.
    fn model(&self) -> &str;
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for Arc<P> {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        (**self).complete(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            Ok(prompt.to_uppercase())
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }
    }

    #[tokio::test]
    async fn arc_wrapped_provider_delegates() {
        let provider: Arc<dyn Provider> = Arc::new(EchoProvider);
        let shared = Arc::new(provider);
        assert_eq!(shared.complete("hi").await.unwrap(), "HI");
        assert_eq!(shared.name(), "echo");
        assert_eq!(shared.model(), "echo-1");
    }
}
