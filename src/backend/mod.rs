//! The language-model capability boundary.
//!
//! The estimator never talks to a concrete provider directly. Everything it
//! needs from a model is captured by [`DecisionBackend`]: one deterministic
//! chat call and an n-way independent sampling call. Concrete backends
//! (HTTP proxies, test doubles) implement the trait and are injected through
//! the validator's constructor; no global handles, no runtime type sniffing.

mod http;
mod types;

pub use http::{BackendConfig, HttpBackend};
pub use types::{ChatMessage, ChatRole};

use async_trait::async_trait;

use crate::error::Result;

/// Sampling-only access to a language model.
#[async_trait]
pub trait DecisionBackend: Send + Sync {
    /// Single completion for a conversation.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Draw `n` independent completions for the same conversation.
    ///
    /// Contract for implementations: an individual draw that fails is
    /// degraded to an empty completion (which downstream classification
    /// treats as a decline) rather than aborting the batch. Return
    /// [`Error::BackendUnavailable`](crate::Error::BackendUnavailable) only
    /// when no draw could reach the backend at all.
    async fn sample_n(
        &self,
        messages: &[ChatMessage],
        n: usize,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<Vec<String>>;
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedBackend;
    use super::*;

    #[tokio::test]
    async fn test_scripted_backend_rules() {
        let backend = ScriptedBackend::new("no").with_rule("the sky is blue", "yes");

        let with_evidence = [ChatMessage::user("Evidence: the sky is blue. Verify.")];
        assert_eq!(backend.chat(&with_evidence).await.unwrap(), "yes");

        let without = [ChatMessage::user("Evidence: [withheld]. Verify.")];
        assert_eq!(backend.chat(&without).await.unwrap(), "no");
    }

    #[tokio::test]
    async fn test_scripted_backend_counts_samples() {
        let backend = ScriptedBackend::constant("yes");
        let msgs = [ChatMessage::user("check")];
        let samples = backend.sample_n(&msgs, 5, 0.2, 32).await.unwrap();
        assert_eq!(samples.len(), 5);
        assert_eq!(backend.call_count(), 5);
    }
}
