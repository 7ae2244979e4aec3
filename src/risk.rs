//! Risk aggregation: information gain, trust threshold, and the
//! hallucination-risk bound.
//!
//! Everything here is pure arithmetic over the sampled answer rates. The
//! quantities mirror the expectation-level decompression framing: evidence
//! is trusted only when the information it injected (the clipped
//! log-ratio between the full-prompt answer rate and each degraded-prompt
//! answer rate) clears a threshold derived from how readily the model
//! answers without evidence.
//!
//! All probabilities are clamped away from {0, 1} before any logarithm, so
//! no input can produce an infinite statistic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ValidationConfig;
use crate::decision::Decision;
use crate::signal::SignalBundle;

/// Clamp applied to probabilities before taking logs.
const PROB_EPS: f64 = 1e-10;
/// Guard for ratios with a vanishing denominator.
const DIV_EPS: f64 = 1e-12;

/// How per-skeleton log-ratios are clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipMode {
    /// Cap only the positive side at `+B`; negative gains pass through.
    OneSided,
    /// Clamp to `[-B, +B]`.
    Symmetric,
}

fn clamp_prob(p: f64) -> f64 {
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// Bernoulli KL divergence D_KL(Ber(p) || Ber(q)) in nats.
pub fn bernoulli_kl_nats(p: f64, q: f64) -> f64 {
    let p = clamp_prob(p);
    let q = clamp_prob(q);
    p * (p / q).ln() + (1.0 - p) * ((1.0 - p) / (1.0 - q)).ln()
}

/// ln(p/q), clipped per `mode`.
pub fn clipped_log_ratio(p: f64, q: f64, bound: f64, mode: ClipMode) -> f64 {
    let ratio = (clamp_prob(p) / clamp_prob(q)).ln();
    match mode {
        ClipMode::OneSided => ratio.min(bound),
        ClipMode::Symmetric => ratio.clamp(-bound, bound),
    }
}

/// Information gain in nats: the mean clipped log-ratio between the
/// full-prompt answer rate and each skeleton's answer rate.
///
/// Both sides measure the same event (the model asserts), so a gain near
/// zero means the evidence did not change the model's willingness to
/// answer. Monotone nondecreasing in `p_answer`.
pub fn information_gain_nats(
    p_answer: f64,
    prior_rates: &[f64],
    bound: f64,
    mode: ClipMode,
) -> f64 {
    if prior_rates.is_empty() {
        return 0.0;
    }
    let total: f64 = prior_rates
        .iter()
        .map(|&s| clipped_log_ratio(p_answer, s, bound, mode))
        .sum();
    total / prior_rates.len() as f64
}

/// Minimum information gain (nats) required to certify risk at or below
/// `target_risk`, given the worst-case skeleton answer rate `q_lo`:
/// KL(Ber(1 - h*) || Ber(q_lo)).
pub fn trust_threshold_nats(q_lo: f64, target_risk: f64) -> f64 {
    bernoulli_kl_nats(1.0 - target_risk, q_lo)
}

/// Information sufficiency ratio: gain over threshold.
pub fn sufficiency_ratio(gain: f64, threshold: f64) -> f64 {
    gain / threshold.max(DIV_EPS)
}

/// Upper bound on hallucination risk.
///
/// The smallest `h` in `[0, q_avg]` whose Bernoulli divergence from the
/// skeleton average answer rate fits inside the observed gain:
/// with no gain the bound collapses to `q_avg` itself (every answer may be
/// prior-driven); a large gain pushes the residual prior-driven answer mass
/// toward zero. Decreasing in `gain`, increasing in `q_avg`, always in
/// `[0, 1]`.
pub fn risk_bound(gain: f64, q_avg: f64) -> f64 {
    let q = clamp_prob(q_avg);
    let gain = gain.max(0.0);

    if bernoulli_kl_nats(0.0, q) <= gain {
        return 0.0;
    }

    // KL(Ber(h) || Ber(q)) is strictly decreasing in h on [0, q], so the
    // boundary of the feasible region is found by bisection.
    let mut lo = 0.0_f64;
    let mut hi = q;
    for _ in 0..64 {
        let mid = 0.5 * (lo + hi);
        if bernoulli_kl_nats(mid, q) <= gain {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    hi.clamp(0.0, 1.0)
}

/// Immutable output of risk aggregation for one validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    /// Final decision under the sufficiency rule.
    pub decision: Decision,
    /// Upper bound on hallucination probability, in `[0, 1]`.
    pub risk_bound: f64,
    /// Mean clipped log-ratio gain across skeletons (nats).
    pub information_gain_nats: f64,
    /// Required gain given the worst-case skeleton (nats).
    pub trust_threshold_nats: f64,
    /// Gain over threshold.
    pub sufficiency_ratio: f64,
    /// Answer rate on the full prompt.
    pub p_answer: f64,
    /// Mean skeleton answer rate.
    pub q_avg: f64,
    /// Worst-case (minimum, floored) skeleton answer rate.
    pub q_lo: f64,
    /// Audit string: every statistic above plus the decision, formatted so
    /// a reviewer can reconstruct the call without re-running it.
    pub rationale: String,
    /// When aggregation completed.
    pub completed_at: DateTime<Utc>,
}

impl RiskVerdict {
    /// True when the claims were accepted for presentation.
    pub fn accepted(&self) -> bool {
        self.decision == Decision::Answer
    }
}

/// Reduce a signal bundle to a verdict. Pure; no I/O.
pub fn aggregate(signals: &SignalBundle, config: &ValidationConfig) -> RiskVerdict {
    let q_avg = signals.q_avg();
    let q_lo = signals.q_lo();

    let gain = information_gain_nats(
        signals.p_answer,
        &signals.skeleton_answer_rates,
        config.clip_bound_nats,
        config.clip_mode,
    );
    let threshold = trust_threshold_nats(q_lo, config.target_risk);
    let isr = sufficiency_ratio(gain, threshold);
    let bound = risk_bound(gain, q_avg);

    let decision = if isr >= 1.0 && gain >= threshold + config.margin_nats {
        Decision::Answer
    } else {
        Decision::Decline
    };

    let rationale = format!(
        "gain={gain:.4} nats, threshold={threshold:.4} nats, isr={isr:.3}, \
         p_answer={:.3}, q_avg={q_avg:.3}, q_lo={q_lo:.3}, risk_bound={bound:.3}; \
         decision={decision}",
        signals.p_answer
    );

    RiskVerdict {
        decision,
        risk_bound: bound,
        information_gain_nats: gain,
        trust_threshold_nats: threshold,
        sufficiency_ratio: isr,
        p_answer: signals.p_answer,
        q_avg,
        q_lo,
        rationale,
        completed_at: Utc::now(),
    }
}
