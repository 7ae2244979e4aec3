//! Property-based tests for the risk estimation invariants.
//!
//! These tests verify the mathematical contracts the estimator relies on:
//!
//! - Risk bounds and answer rates stay inside [0, 1]
//! - The probability floor holds no matter how many declines occur
//! - Information gain is monotone in the full-prompt answer rate
//! - The accept decision is consistent with the sufficiency rule, in both
//!   directions, for every reachable signal bundle

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::config::ValidationConfig;
    use crate::decision::Decision;
    use crate::risk::{
        aggregate, bernoulli_kl_nats, information_gain_nats, risk_bound, trust_threshold_nats,
        ClipMode,
    };
    use crate::signal::SignalBundle;

    // Strategy for probabilities away from the exact endpoints.
    fn probability() -> impl Strategy<Value = f64> {
        0.01f64..0.99f64
    }

    // Strategy for a reachable signal bundle: n samples, up to six
    // skeletons, arbitrary answer counts.
    fn signal_bundle() -> impl Strategy<Value = SignalBundle> {
        (1usize..=8)
            .prop_flat_map(|n| {
                (
                    Just(n),
                    0usize..=n,
                    prop::collection::vec(0usize..=n, 1..=6),
                )
            })
            .prop_map(|(n, posterior, skeletons)| {
                SignalBundle::from_counts(posterior, &skeletons, n, Decision::Decline)
            })
    }

    proptest! {
        /// KL divergence is non-negative (Gibbs' inequality).
        #[test]
        fn kl_is_non_negative(p in probability(), q in probability()) {
            let kl = bernoulli_kl_nats(p, q);
            prop_assert!(kl >= 0.0, "KL({}, {}) = {} should be >= 0", p, q, kl);
        }

        /// KL divergence is zero for identical distributions.
        #[test]
        fn kl_is_zero_for_identical(p in probability()) {
            prop_assert!(bernoulli_kl_nats(p, p).abs() < 1e-9);
        }

        /// The trust threshold is non-negative for any prior and target.
        #[test]
        fn trust_threshold_is_non_negative(
            q_lo in probability(),
            target in 0.01f64..0.5f64
        ) {
            prop_assert!(trust_threshold_nats(q_lo, target) >= 0.0);
        }

        /// The risk bound is a probability for any gain, including
        /// negative gains from evidence that suppressed answering.
        #[test]
        fn risk_bound_is_a_probability(
            gain in -20.0f64..20.0f64,
            q_avg in 0.0f64..=1.0f64
        ) {
            let bound = risk_bound(gain, q_avg);
            prop_assert!(
                (0.0..=1.0).contains(&bound),
                "risk_bound({}, {}) = {}",
                gain, q_avg, bound
            );
        }

        /// The risk bound never exceeds the prior answer rate.
        #[test]
        fn risk_bound_at_most_prior(
            gain in 0.0f64..20.0f64,
            q_avg in probability()
        ) {
            prop_assert!(risk_bound(gain, q_avg) <= q_avg + 1e-9);
        }

        /// Information gain is monotone nondecreasing in the full-prompt
        /// answer rate, for both clip modes.
        #[test]
        fn gain_is_monotone_in_p_answer(
            p_low in 0.0f64..=1.0f64,
            p_delta in 0.0f64..=1.0f64,
            rates in prop::collection::vec(0.01f64..0.99f64, 1..6)
        ) {
            let p_high = (p_low + p_delta).min(1.0);
            for mode in [ClipMode::OneSided, ClipMode::Symmetric] {
                let low = information_gain_nats(p_low, &rates, 12.0, mode);
                let high = information_gain_nats(p_high, &rates, 12.0, mode);
                prop_assert!(
                    high >= low - 1e-12,
                    "gain decreased ({mode:?}): p {} -> {} gave {} -> {}",
                    p_low, p_high, low, high
                );
            }
        }

        /// Bundle invariants: the floor holds regardless of decline counts,
        /// and the rate ordering never inverts.
        #[test]
        fn bundle_rates_respect_floor_and_ordering(bundle in signal_bundle()) {
            let floor = SignalBundle::probability_floor(bundle.samples_per_prompt);
            prop_assert!(bundle.q_lo() >= floor - 1e-12);
            prop_assert!(bundle.q_lo() <= bundle.q_avg() + 1e-12);
            prop_assert!(bundle.q_avg() <= 1.0 + 1e-12);
            prop_assert!((0.0..=1.0).contains(&bundle.p_answer));
        }

        /// The accept decision holds exactly when the sufficiency rule
        /// holds: implication in both directions.
        #[test]
        fn decision_matches_sufficiency_rule(bundle in signal_bundle()) {
            let config = ValidationConfig::default();
            let verdict = aggregate(&bundle, &config);

            let sufficient = verdict.sufficiency_ratio >= 1.0
                && verdict.information_gain_nats
                    >= verdict.trust_threshold_nats + config.margin_nats;

            prop_assert_eq!(
                verdict.accepted(),
                sufficient,
                "decision {} inconsistent with rule for {}",
                verdict.decision,
                verdict.rationale
            );
        }

        /// Every reachable verdict carries a risk bound in [0, 1].
        #[test]
        fn verdict_risk_bound_in_range(bundle in signal_bundle()) {
            let verdict = aggregate(&bundle, &ValidationConfig::default());
            prop_assert!((0.0..=1.0).contains(&verdict.risk_bound));
        }

        /// Aggregation is a pure function of its inputs.
        #[test]
        fn aggregation_is_reproducible(bundle in signal_bundle()) {
            let config = ValidationConfig::default();
            let a = aggregate(&bundle, &config);
            let b = aggregate(&bundle, &config);
            prop_assert_eq!(a.decision, b.decision);
            prop_assert_eq!(a.risk_bound, b.risk_bound);
            prop_assert_eq!(a.rationale, b.rationale);
        }
    }
}
