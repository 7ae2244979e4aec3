//! Decision protocol classification.
//!
//! Every sampled completion reduces to a binary label: the model either
//! asserted the claims (answer) or it did not (decline). The protocol is
//! strict and fail-closed: only an explicit affirmative token near the start
//! of the completion counts as an answer. Hedges, explanations that never
//! commit, empty completions, and degraded samples all classify as decline,
//! because ambiguity is evidence against sufficiency.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Binary label for one sampled completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The model asserted the claims.
    Answer,
    /// The model declined, hedged, or produced an unclassifiable reply.
    Decline,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Answer => write!(f, "answer"),
            Self::Decline => write!(f, "decline"),
        }
    }
}

/// Maps free-text completions to [`Decision`] labels.
///
/// Pure and deterministic: the same text always classifies the same way.
pub struct DecisionClassifier {
    accept_re: Regex,
    decline_re: Regex,
}

/// Tokens beyond this depth no longer count as "near the start".
const MAX_HEAD_TOKENS: usize = 8;

impl DecisionClassifier {
    pub fn new() -> Self {
        Self {
            accept_re: Regex::new(r"^(?:yes|answer)$").expect("static accept pattern"),
            decline_re: Regex::new(r"^(?:no|refuse|refused|refusal|decline|declined|cannot|can't|unsure|unknown)$")
                .expect("static decline pattern"),
        }
    }

    /// Classify one completion.
    ///
    /// Scans the leading tokens of the first non-empty line for the first
    /// protocol token. Label-style tokens ("Answer:", "Decision:") are
    /// skipped so that "Answer: no" reads as a decline, not an answer.
    pub fn classify(&self, completion: &str) -> Decision {
        let lower = completion.to_lowercase();
        let head = lower
            .lines()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("");

        for raw in head.split_whitespace().take(MAX_HEAD_TOKENS) {
            if raw.ends_with(':') {
                continue;
            }
            let token =
                raw.trim_matches(|c: char| !(c.is_ascii_alphanumeric() || c == '\''));
            if token.is_empty() {
                continue;
            }
            if self.accept_re.is_match(token) {
                return Decision::Answer;
            }
            if self.decline_re.is_match(token) {
                return Decision::Decline;
            }
        }

        Decision::Decline
    }
}

impl Default for DecisionClassifier {
    fn default() -> Self {
        Self::new()
    }
}
