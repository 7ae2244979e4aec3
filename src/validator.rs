//! Task-level validation façade.
//!
//! The entry points here are terminal: no error escapes to the caller in
//! normal operation. Anything that goes wrong below this layer degrades to a
//! fail-open outcome whose risk bound is pinned to the worst case, so a
//! monitoring-only deployment never blocks the surrounding pipeline while
//! still telling bound-inspecting consumers that the output is unverified.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::DecisionBackend;
use crate::config::ValidationConfig;
use crate::error::{Error, Result};
use crate::prompt::EvaluationPrompt;
use crate::risk::{aggregate, RiskVerdict};
use crate::signal::SignalEstimator;
use crate::skeleton::{SkeletonGenerator, SkeletonPolicy};

/// Outcome of one validation call: the accept flag, the risk bound, and a
/// rationale sufficient for a human auditor.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub accept: bool,
    pub risk_bound: f64,
    pub rationale: String,
}

impl ValidationOutcome {
    fn from_verdict(verdict: &RiskVerdict) -> Self {
        Self {
            accept: verdict.accepted(),
            risk_bound: verdict.risk_bound,
            rationale: verdict.rationale.clone(),
        }
    }

    fn disabled() -> Self {
        Self {
            accept: true,
            risk_bound: 0.0,
            rationale: "validation_disabled".to_string(),
        }
    }

    fn fail_open(error: &Error) -> Self {
        Self {
            accept: true,
            risk_bound: 1.0,
            rationale: format!("validation_error: {error}"),
        }
    }
}

/// Outcome of batch validation. The batch is accepted or rejected
/// atomically: `valid_count` is the full item count or zero.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub accept: bool,
    pub risk_bound: f64,
    pub rationale: String,
    pub valid_count: usize,
}

/// Hallucination-risk validator over an injected decision backend.
pub struct Validator {
    backend: Arc<dyn DecisionBackend>,
    config: ValidationConfig,
    generator: SkeletonGenerator,
}

impl Validator {
    /// Create a validator with default configuration.
    pub fn new(backend: Arc<dyn DecisionBackend>) -> Self {
        Self {
            backend,
            config: ValidationConfig::default(),
            generator: SkeletonGenerator::new(),
        }
    }

    /// Create a validator with an explicit configuration.
    pub fn with_config(backend: Arc<dyn DecisionBackend>, config: ValidationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            config,
            generator: SkeletonGenerator::new(),
        })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a candidate output against supplied evidence.
    pub async fn validate_evidence_based(
        &self,
        task: &str,
        evidence: &str,
        candidate: &str,
    ) -> ValidationOutcome {
        self.validate_evidence_based_with_samples(
            task,
            evidence,
            candidate,
            self.config.samples_per_prompt,
            self.config.skeleton_count,
        )
        .await
    }

    /// Evidence-based validation with per-call sampling overrides.
    pub async fn validate_evidence_based_with_samples(
        &self,
        task: &str,
        evidence: &str,
        candidate: &str,
        n: usize,
        m: usize,
    ) -> ValidationOutcome {
        if !self.config.enabled {
            return ValidationOutcome::disabled();
        }
        let prompt = EvaluationPrompt::evidence_based(task, evidence, candidate);
        self.run(prompt, SkeletonPolicy::EvidenceErase, n, m).await
    }

    /// Validate a candidate output with no external evidence: a
    /// self-consistency check under prompt perturbation.
    pub async fn validate_closed_book(&self, question: &str, candidate: &str) -> ValidationOutcome {
        self.validate_closed_book_with_samples(
            question,
            candidate,
            self.config.samples_per_prompt,
            self.config.skeleton_count,
        )
        .await
    }

    /// Closed-book validation with per-call sampling overrides.
    pub async fn validate_closed_book_with_samples(
        &self,
        question: &str,
        candidate: &str,
        n: usize,
        m: usize,
    ) -> ValidationOutcome {
        if !self.config.enabled {
            return ValidationOutcome::disabled();
        }
        let prompt = EvaluationPrompt::closed_book(question, candidate);
        self.run(prompt, SkeletonPolicy::ClosedBook, n, m).await
    }

    /// Validate a batch of structured extracted items against evidence.
    ///
    /// Items are serialized to canonical JSON and validated as one claim
    /// set; the batch passes or fails as a whole. An empty batch passes
    /// without touching the backend.
    pub async fn validate_extraction_batch<T: Serialize>(
        &self,
        task: &str,
        evidence: &str,
        items: &[T],
        item_type: &str,
    ) -> BatchOutcome {
        if items.is_empty() {
            return BatchOutcome {
                accept: true,
                risk_bound: 0.0,
                rationale: "no_items_to_validate".to_string(),
                valid_count: 0,
            };
        }

        let rendered = match serde_json::to_string_pretty(items) {
            Ok(json) => json,
            Err(e) => {
                let outcome = ValidationOutcome::fail_open(&Error::from(e));
                warn!(rationale = %outcome.rationale, "batch items not serializable");
                return BatchOutcome {
                    accept: outcome.accept,
                    risk_bound: outcome.risk_bound,
                    rationale: outcome.rationale,
                    valid_count: items.len(),
                };
            }
        };

        let task = format!("{task}\n\nExtracted {} {item_type}.", items.len());
        let outcome = self.validate_evidence_based(&task, evidence, &rendered).await;
        let valid_count = if outcome.accept { items.len() } else { 0 };

        info!(
            item_type,
            count = items.len(),
            accept = outcome.accept,
            risk_bound = outcome.risk_bound,
            "batch validation"
        );

        BatchOutcome {
            accept: outcome.accept,
            risk_bound: outcome.risk_bound,
            rationale: outcome.rationale,
            valid_count,
        }
    }

    async fn run(
        &self,
        prompt: EvaluationPrompt,
        policy: SkeletonPolicy,
        n: usize,
        m: usize,
    ) -> ValidationOutcome {
        match self.verdict(prompt, policy, n, m).await {
            Ok(verdict) => {
                info!(
                    decision = %verdict.decision,
                    risk_bound = verdict.risk_bound,
                    sufficiency_ratio = verdict.sufficiency_ratio,
                    "validation complete"
                );
                ValidationOutcome::from_verdict(&verdict)
            }
            Err(e) => {
                warn!("validation failed, failing open: {e}");
                ValidationOutcome::fail_open(&e)
            }
        }
    }

    async fn verdict(
        &self,
        prompt: EvaluationPrompt,
        policy: SkeletonPolicy,
        n: usize,
        m: usize,
    ) -> Result<RiskVerdict> {
        let call_config = ValidationConfig {
            samples_per_prompt: n,
            skeleton_count: m,
            ..self.config.clone()
        };
        call_config.validate()?;

        let skeletons = self.generator.generate(&prompt, m, policy);
        let estimator = SignalEstimator::new(
            Arc::clone(&self.backend),
            call_config.temperature,
            call_config.max_decision_tokens,
        );
        let signals = estimator.estimate(&prompt, &skeletons, n).await?;

        Ok(aggregate(&signals, &call_config))
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use crate::backend::testing::{ScriptedBackend, UnreachableBackend};

    use super::*;

    const EVIDENCE: &str =
        "Flight BA117 departs LHR at 09:40 and lands at JFK at 12:35, fare 420 USD.";
    const CANDIDATE: &str = "BA117 LHR-JFK, 420 USD";

    fn evidence_sensitive() -> Arc<ScriptedBackend> {
        Arc::new(ScriptedBackend::new("no").with_rule(EVIDENCE, "yes"))
    }

    #[tokio::test]
    async fn test_evidence_driven_output_accepted() {
        let validator = Validator::new(evidence_sensitive());
        let outcome = validator
            .validate_evidence_based("Extract flights", EVIDENCE, CANDIDATE)
            .await;

        assert!(outcome.accept);
        assert!(outcome.risk_bound < 0.05);
        assert!(outcome.rationale.contains("decision=answer"));
    }

    #[tokio::test]
    async fn test_evidence_independent_output_flagged() {
        let validator = Validator::new(Arc::new(ScriptedBackend::constant("yes")));
        let outcome = validator
            .validate_evidence_based("Extract flights", EVIDENCE, CANDIDATE)
            .await;

        assert!(!outcome.accept);
        assert!(outcome.risk_bound > 0.9);
        assert!(outcome.rationale.contains("decision=decline"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_open() {
        let validator = Validator::new(Arc::new(UnreachableBackend));
        let outcome = validator
            .validate_evidence_based("Extract flights", EVIDENCE, CANDIDATE)
            .await;

        assert!(outcome.accept);
        assert_eq!(outcome.risk_bound, 1.0);
        assert!(outcome.rationale.starts_with("validation_error:"));
    }

    #[tokio::test]
    async fn test_disabled_validator_passes_without_backend_calls() {
        let backend = Arc::new(ScriptedBackend::constant("yes"));
        let validator =
            Validator::with_config(Arc::clone(&backend) as Arc<dyn DecisionBackend>, ValidationConfig::disabled()).unwrap();

        let outcome = validator
            .validate_evidence_based("Extract flights", EVIDENCE, CANDIDATE)
            .await;

        assert!(outcome.accept);
        assert_eq!(outcome.risk_bound, 0.0);
        assert_eq!(outcome.rationale, "validation_disabled");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_sampling_override_fails_open() {
        let validator = Validator::new(evidence_sensitive());
        let outcome = validator
            .validate_evidence_based_with_samples("Extract flights", EVIDENCE, CANDIDATE, 0, 4)
            .await;

        assert!(outcome.accept);
        assert_eq!(outcome.risk_bound, 1.0);
        assert!(outcome.rationale.contains("configuration error"));
    }

    #[tokio::test]
    async fn test_closed_book_consistency() {
        // Declines on every well-informed-assistant reframing, answers on
        // the direct question: the gain clears the threshold.
        let backend = Arc::new(
            ScriptedBackend::new("yes").with_rule("well-informed assistant", "no"),
        );
        let validator = Validator::new(backend);

        let outcome = validator
            .validate_closed_book("Is this itinerary coherent?", "Day 1 arrive, day 2 museum")
            .await;

        assert!(outcome.accept);
        assert!(outcome.risk_bound < 0.05);
    }

    #[tokio::test]
    async fn test_round_trip_reproducibility() {
        let validator = Validator::new(evidence_sensitive());

        let first = validator
            .validate_evidence_based("Extract flights", EVIDENCE, CANDIDATE)
            .await;
        let second = validator
            .validate_evidence_based("Extract flights", EVIDENCE, CANDIDATE)
            .await;

        assert_eq!(first, second);
    }

    #[derive(Serialize)]
    struct FlightRecord {
        code: &'static str,
        fare_usd: u32,
    }

    #[tokio::test]
    async fn test_batch_accepted_atomically() {
        let validator = Validator::new(evidence_sensitive());
        let items = vec![FlightRecord {
            code: "BA117",
            fare_usd: 420,
        }];

        let outcome = validator
            .validate_extraction_batch("Extract flights", EVIDENCE, &items, "flights")
            .await;

        assert!(outcome.accept);
        assert_eq!(outcome.valid_count, 1);
    }

    #[tokio::test]
    async fn test_batch_rejected_atomically() {
        let validator = Validator::new(Arc::new(ScriptedBackend::constant("yes")));
        let items = vec![
            FlightRecord {
                code: "BA117",
                fare_usd: 420,
            },
            FlightRecord {
                code: "BA118",
                fare_usd: 380,
            },
        ];

        let outcome = validator
            .validate_extraction_batch("Extract flights", EVIDENCE, &items, "flights")
            .await;

        assert!(!outcome.accept);
        assert_eq!(outcome.valid_count, 0);
    }

    #[tokio::test]
    async fn test_empty_batch_passes_without_backend_calls() {
        let backend = evidence_sensitive();
        let validator = Validator::new(Arc::clone(&backend) as Arc<dyn DecisionBackend>);
        let items: Vec<FlightRecord> = Vec::new();

        let outcome = validator
            .validate_extraction_batch("Extract flights", EVIDENCE, &items, "flights")
            .await;

        assert!(outcome.accept);
        assert_eq!(outcome.risk_bound, 0.0);
        assert_eq!(outcome.rationale, "no_items_to_validate");
        assert_eq!(outcome.valid_count, 0);
        assert_eq!(backend.call_count(), 0);
    }
}
