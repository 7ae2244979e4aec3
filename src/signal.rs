//! Decision signal estimation.
//!
//! For one validation call this module samples the backend `n` times for the
//! full prompt and for each of the `m` skeletons, classifies every
//! completion, and reduces the labels to answer rates. These `n x (1 + m)`
//! backend calls dominate the cost of a validation, so the per-prompt
//! batches are issued concurrently; the backend serializes or throttles them
//! under its own discipline.
//!
//! The full-prompt rate and the skeleton rates measure the same event (the
//! model asserts), and the skeleton rates are stored once and reused for
//! both the information-gain priors and the trust statistics, so the two
//! can never drift apart.

use std::sync::Arc;

use futures::future::{try_join, try_join_all};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::DecisionBackend;
use crate::decision::{Decision, DecisionClassifier};
use crate::error::Result;
use crate::prompt::{decision_messages, EvaluationPrompt};
use crate::skeleton::Skeleton;

/// Reduced sampling statistics for one validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalBundle {
    /// Answer rate over `n` samples of the full prompt.
    pub p_answer: f64,
    /// Per-skeleton answer rates, floored at `1/(n+2)`. Used both as the
    /// information-gain priors and as the trust statistics.
    pub skeleton_answer_rates: Vec<f64>,
    /// Samples drawn per prompt.
    pub samples_per_prompt: usize,
    /// First label sampled on the full prompt, kept for audit logs.
    pub first_label: Decision,
}

impl SignalBundle {
    /// Laplace-style floor preventing zero-probability degeneracies.
    pub fn probability_floor(n: usize) -> f64 {
        1.0 / (n as f64 + 2.0)
    }

    /// Build a bundle directly from answer counts.
    pub fn from_counts(
        posterior_answers: usize,
        skeleton_answers: &[usize],
        n: usize,
        first_label: Decision,
    ) -> Self {
        let n = n.max(1);
        let floor = Self::probability_floor(n);
        let rate = |count: usize| (count.min(n) as f64 / n as f64).max(floor);

        Self {
            p_answer: posterior_answers.min(n) as f64 / n as f64,
            skeleton_answer_rates: skeleton_answers.iter().map(|&c| rate(c)).collect(),
            samples_per_prompt: n,
            first_label,
        }
    }

    /// Mean skeleton answer rate.
    pub fn q_avg(&self) -> f64 {
        if self.skeleton_answer_rates.is_empty() {
            return 0.0;
        }
        self.skeleton_answer_rates.iter().sum::<f64>() / self.skeleton_answer_rates.len() as f64
    }

    /// Worst-case (minimum) skeleton answer rate. Already floored.
    pub fn q_lo(&self) -> f64 {
        self.skeleton_answer_rates
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
            .min(1.0)
            .max(0.0)
    }
}

/// Samples and classifies decisions for a prompt and its skeletons.
pub struct SignalEstimator {
    backend: Arc<dyn DecisionBackend>,
    classifier: DecisionClassifier,
    temperature: f64,
    max_tokens: u32,
}

impl SignalEstimator {
    pub fn new(backend: Arc<dyn DecisionBackend>, temperature: f64, max_tokens: u32) -> Self {
        Self {
            backend,
            classifier: DecisionClassifier::new(),
            temperature,
            max_tokens,
        }
    }

    /// Estimate decision signals with `n` samples per prompt.
    ///
    /// All `1 + m` sampling batches run concurrently and the reduction only
    /// happens once every batch has resolved; a partial sample set is never
    /// observed. A failed individual draw arrives as an empty completion and
    /// classifies as a decline; an unreachable backend fails the whole call.
    pub async fn estimate(
        &self,
        prompt: &EvaluationPrompt,
        skeletons: &[Skeleton],
        n: usize,
    ) -> Result<SignalBundle> {
        let posterior_msgs = decision_messages(prompt.text());
        let skeleton_msgs: Vec<_> = skeletons
            .iter()
            .map(|s| decision_messages(&s.text))
            .collect();

        let posterior_fut = self
            .backend
            .sample_n(&posterior_msgs, n, self.temperature, self.max_tokens);
        let priors_fut = try_join_all(
            skeleton_msgs
                .iter()
                .map(|msgs| self.backend.sample_n(msgs, n, self.temperature, self.max_tokens)),
        );

        let (posterior, priors) = try_join(posterior_fut, priors_fut).await?;

        let labels: Vec<Decision> = posterior
            .iter()
            .map(|text| self.classifier.classify(text))
            .collect();
        let first_label = labels.first().copied().unwrap_or(Decision::Decline);
        let p_answer = answer_rate(&labels);

        let floor = SignalBundle::probability_floor(n);
        let skeleton_answer_rates: Vec<f64> = priors
            .iter()
            .map(|batch| {
                let labels: Vec<Decision> = batch
                    .iter()
                    .map(|text| self.classifier.classify(text))
                    .collect();
                answer_rate(&labels).max(floor)
            })
            .collect();

        debug!(
            p_answer,
            ?skeleton_answer_rates,
            samples_per_prompt = n,
            "estimated decision signals"
        );

        Ok(SignalBundle {
            p_answer,
            skeleton_answer_rates,
            samples_per_prompt: n,
            first_label,
        })
    }
}

fn answer_rate(labels: &[Decision]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let answers = labels.iter().filter(|&&l| l == Decision::Answer).count();
    answers as f64 / labels.len() as f64
}
