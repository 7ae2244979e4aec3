//! Configuration for validation calls.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::risk::ClipMode;

/// Process-wide validation defaults, overridable per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// When false, every validation passes immediately with a
    /// "validation_disabled" rationale and no backend calls.
    pub enabled: bool,
    /// Target hallucination rate h*.
    pub target_risk: f64,
    /// Samples drawn per prompt (n).
    pub samples_per_prompt: usize,
    /// Skeletons generated per call (m).
    pub skeleton_count: usize,
    /// Extra gain (nats) required beyond the trust threshold, so borderline
    /// calls do not flap right at the boundary.
    pub margin_nats: f64,
    /// Per-sample log-ratio clip bound B (nats).
    pub clip_bound_nats: f64,
    /// How log-ratios are clipped.
    pub clip_mode: ClipMode,
    /// Sampling temperature for decision draws. Low, for consistency.
    pub temperature: f64,
    /// Token budget for one decision completion.
    pub max_decision_tokens: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_risk: 0.05,
            samples_per_prompt: 5,
            skeleton_count: 4,
            margin_nats: 0.2,
            clip_bound_nats: 12.0,
            clip_mode: ClipMode::OneSided,
            temperature: 0.2,
            max_decision_tokens: 32,
        }
    }
}

impl ValidationConfig {
    /// Cheaper settings for latency-sensitive pipelines.
    pub fn fast() -> Self {
        Self {
            samples_per_prompt: 3,
            skeleton_count: 4,
            ..Self::default()
        }
    }

    /// More samples and skeletons for offline auditing.
    pub fn thorough() -> Self {
        Self {
            samples_per_prompt: 7,
            skeleton_count: 6,
            ..Self::default()
        }
    }

    pub fn with_target_risk(mut self, target_risk: f64) -> Self {
        self.target_risk = target_risk;
        self
    }

    pub fn with_sampling(mut self, samples_per_prompt: usize, skeleton_count: usize) -> Self {
        self.samples_per_prompt = samples_per_prompt;
        self.skeleton_count = skeleton_count;
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Reject invalid settings eagerly. Nothing here is silently clamped;
    /// the only floor in the system is the probability floor on skeleton
    /// answer rates.
    pub fn validate(&self) -> Result<()> {
        if self.samples_per_prompt == 0 {
            return Err(Error::config("samples_per_prompt must be at least 1"));
        }
        if self.skeleton_count == 0 {
            return Err(Error::config("skeleton_count must be at least 1"));
        }
        if !(self.target_risk > 0.0 && self.target_risk < 1.0) {
            return Err(Error::config(format!(
                "target_risk must be in (0, 1), got {}",
                self.target_risk
            )));
        }
        if self.margin_nats < 0.0 {
            return Err(Error::config("margin_nats must be non-negative"));
        }
        if self.clip_bound_nats <= 0.0 {
            return Err(Error::config("clip_bound_nats must be positive"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::config(format!(
                "temperature must be in [0, 2], got {}",
                self.temperature
            )));
        }
        if self.max_decision_tokens == 0 {
            return Err(Error::config("max_decision_tokens must be at least 1"));
        }
        Ok(())
    }
}
