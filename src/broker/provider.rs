//! The Delegating Provider: an `LlmProvider` implementation that never
//! performs network I/O. Every operation manufactures a delegation token
//! and returns immediately, object-safe behind an `Arc<dyn LlmProvider>`
//! via `async_trait`. `validate_auth` always succeeds — no API key is ever
//! needed because no model is ever called directly.

use crate::broker::directive::RequestParameters;
use async_trait::async_trait;
use uuid::Uuid;

/// Result of asking a provider to perform one LLM operation. A real provider
/// would have a `Completion(..)` variant too; the broker only ever talks to
/// [`DelegatingProvider`], which always returns [`ProviderOutcome::Delegation`].
#[derive(Debug, Clone)]
pub enum ProviderOutcome {
    /// The provider did not call a model. The caller (a command core) must
    /// turn this into a pending-interaction signal rather than treat it as
    /// a completion.
    Delegation {
        interaction_id: String,
        details: RequestParameters,
    },
}

/// Operation surface every LLM provider — real or delegating — implements.
/// Command cores hold an `Arc<dyn LlmProvider>` selected by role
/// configuration and never know which kind they were handed.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate_text(&self, params: RequestParameters) -> ProviderOutcome;

    /// Default streaming implementation delegates to `generate_text`; a real
    /// streaming provider would override this.
    async fn stream_text(&self, params: RequestParameters) -> ProviderOutcome {
        self.generate_text(params).await
    }

    async fn generate_object(&self, params: RequestParameters) -> ProviderOutcome;

    /// Always succeeds for a delegating provider; a real provider would
    /// check its stored credential here.
    async fn validate_auth(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &str;
}

/// A provider that turns every LLM operation into a delegation token instead
/// of performing the call, so that the Agent process performs it instead.
pub struct DelegatingProvider {
    name: String,
}

impl DelegatingProvider {
    pub fn new(name: impl Into<String>) -> Self {
        DelegatingProvider { name: name.into() }
    }

    fn delegate(&self, params: RequestParameters) -> ProviderOutcome {
        ProviderOutcome::Delegation {
            interaction_id: Uuid::new_v4().to_string(),
            details: params,
        }
    }
}

#[async_trait]
impl LlmProvider for DelegatingProvider {
    async fn generate_text(&self, params: RequestParameters) -> ProviderOutcome {
        self.delegate(params)
    }

    async fn generate_object(&self, params: RequestParameters) -> ProviderOutcome {
        self.delegate(params)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;

    fn params() -> RequestParameters {
        RequestParameters {
            model_id: "gpt".to_string(),
            messages: vec![],
            max_tokens: None,
            temperature: None,
            schema: None,
            object_name: None,
            hints: JsonValue::Null,
        }
    }

    #[tokio::test]
    async fn generate_text_always_delegates() {
        let provider = DelegatingProvider::new("agent-llm");
        let ProviderOutcome::Delegation { interaction_id, .. } =
            provider.generate_text(params()).await;
        assert!(!interaction_id.is_empty());
    }

    #[tokio::test]
    async fn validate_auth_never_fails() {
        let provider = DelegatingProvider::new("agent-llm");
        assert!(provider.validate_auth().await);
    }
}
