//! # groundcheck
//!
//! Evidence-grounding and hallucination-risk estimation for LLM outputs.
//!
//! Given black-box, sampling-only access to a language model, groundcheck
//! estimates how much of the model's willingness to assert a claim is caused
//! by the supplied evidence rather than by prior belief that would persist
//! even if the evidence were destroyed.
//!
//! ## Core Algorithm
//!
//! For a candidate output C with evidence E:
//!
//! 1. Build an evaluation prompt asking whether C is supported by E, and
//!    derive `m` seeded skeletons in which E is erased or degraded.
//! 2. Sample `n` yes/no decisions from the model for the full prompt
//!    (`p_answer`) and for each skeleton (`q_k`, floored at `1/(n+2)`).
//! 3. Reduce to an information gain: the mean clipped log-ratio between
//!    `p_answer` and each skeleton rate, in nats.
//! 4. Accept only when the gain clears a trust threshold derived from the
//!    worst-case skeleton rate and the target hallucination rate, with a
//!    margin against borderline flapping; report an upper bound on the
//!    probability the claim is prior-driven.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use groundcheck::{BackendConfig, HttpBackend, Validator};
//!
//! let backend = Arc::new(HttpBackend::new(BackendConfig::new(
//!     "https://proxy.example/v1/chat/completions",
//!     std::env::var("API_TOKEN")?,
//!     "verifier-model",
//! ))?);
//! let validator = Validator::new(backend);
//!
//! let outcome = validator
//!     .validate_evidence_based(
//!         "Extract flight prices",
//!         search_results,
//!         extracted_flights,
//!     )
//!     .await;
//!
//! if !outcome.accept {
//!     println!("flagged (risk <= {:.3}): {}", outcome.risk_bound, outcome.rationale);
//! }
//! ```
//!
//! Validation is terminal by design: entry points always return an outcome.
//! If the backend is unreachable the outcome fails open with the risk bound
//! pinned to 1.0, so the surrounding pipeline keeps moving while consumers
//! that inspect the bound still see "unverified".

pub mod backend;
pub mod config;
pub mod decision;
pub mod error;
pub mod prompt;
pub mod risk;
pub mod signal;
pub mod skeleton;
pub mod validator;

#[cfg(test)]
mod proptest;

// Re-exports for convenience
pub use backend::{BackendConfig, ChatMessage, ChatRole, DecisionBackend, HttpBackend};
pub use config::ValidationConfig;
pub use decision::{Decision, DecisionClassifier};
pub use error::{Error, Result};
pub use prompt::{decision_messages, EvaluationPrompt};
pub use risk::{
    aggregate, bernoulli_kl_nats, clipped_log_ratio, information_gain_nats, risk_bound,
    sufficiency_ratio, trust_threshold_nats, ClipMode, RiskVerdict,
};
pub use signal::{SignalBundle, SignalEstimator};
pub use skeleton::{Skeleton, SkeletonGenerator, SkeletonPolicy};
pub use validator::{BatchOutcome, ValidationOutcome, Validator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _config = ValidationConfig::default();
        let _classifier = DecisionClassifier::new();
        let _generator = SkeletonGenerator::new();

        let kl = bernoulli_kl_nats(0.8, 0.5);
        assert!(kl > 0.0);

        let bound = risk_bound(0.0, 0.5);
        assert!((bound - 0.5).abs() < 1e-6);
    }
}
