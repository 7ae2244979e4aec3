//! Seeded skeleton generation.
//!
//! A skeleton is an evidence-degraded variant of an evaluation prompt. The
//! answer rate across skeletons estimates the model's prior willingness to
//! assert the candidate without (reliable) evidence; comparing it to the
//! answer rate on the full prompt isolates how much of that willingness the
//! evidence actually caused.
//!
//! Generation is deterministic: seed `k` of a given prompt and policy always
//! produces the byte-identical skeleton, independent of how many skeletons
//! are requested, so a validation call can be audited by regenerating its
//! exact prompt variants.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::prompt::EvaluationPrompt;

/// How evidence is degraded when deriving skeletons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkeletonPolicy {
    /// Replace the evidence block with a seed-derived placeholder or a
    /// deterministic word-shuffle, keeping task and candidate verbatim.
    EvidenceErase,
    /// Strip all evidence and reframe the prompt as an internal-consistency
    /// question for a well-informed assistant.
    ClosedBook,
}

/// One derived prompt variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    /// The rendered skeleton prompt.
    pub text: String,
    /// The seed that produced it.
    pub seed: u64,
}

const EVIDENCE_PLACEHOLDERS: [&str; 6] = [
    "[evidence withheld]",
    "[evidence redacted]",
    "[no evidence provided]",
    "[evidence omitted for this check]",
    "[source material removed]",
    "[evidence unavailable]",
];

const CLOSED_BOOK_PREAMBLES: [&str; 4] = [
    "Suppose you are a well-informed assistant answering from general knowledge alone.",
    "Set aside any source material; rely only on what a well-informed assistant would know.",
    "Answer as a well-informed assistant with no documents at hand.",
    "Judge this as a well-informed assistant would, without consulting external sources.",
];

const CLOSED_BOOK_EMPHASES: [&str; 3] = [
    "Focus on whether the pieces fit together.",
    "Weigh the claims against each other, not against any source.",
    "Treat this purely as a coherence check.",
];

/// Derives perturbed prompt variants from seeds `0..m-1`.
pub struct SkeletonGenerator;

impl SkeletonGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate `m` skeletons for `prompt` under `policy`, seeds `0..m-1`.
    pub fn generate(
        &self,
        prompt: &EvaluationPrompt,
        m: usize,
        policy: SkeletonPolicy,
    ) -> Vec<Skeleton> {
        (0..m as u64)
            .map(|seed| {
                let text = match policy {
                    SkeletonPolicy::EvidenceErase => erase_evidence(prompt, seed),
                    SkeletonPolicy::ClosedBook => closed_book_variant(prompt, seed),
                };
                Skeleton { text, seed }
            })
            .collect()
    }
}

impl Default for SkeletonGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn erase_evidence(prompt: &EvaluationPrompt, seed: u64) -> String {
    let evidence = prompt.evidence().unwrap_or("");

    // Three erasure seeds to one shuffle seed: the prior should mostly see
    // missing evidence, occasionally evidence degraded beyond usefulness.
    let word_count = evidence.split_whitespace().count();
    let replacement = if seed % 4 == 3 && word_count >= 2 {
        shuffle_words(evidence, &digest(b"evidence-erase", seed, evidence))
    } else {
        EVIDENCE_PLACEHOLDERS[seed as usize % EVIDENCE_PLACEHOLDERS.len()].to_string()
    };

    prompt.render_with_evidence(&replacement)
}

fn closed_book_variant(prompt: &EvaluationPrompt, seed: u64) -> String {
    let preamble = CLOSED_BOOK_PREAMBLES[seed as usize % CLOSED_BOOK_PREAMBLES.len()];
    let emphasis = CLOSED_BOOK_EMPHASES
        [(seed as usize / CLOSED_BOOK_PREAMBLES.len()) % CLOSED_BOOK_EMPHASES.len()];
    prompt.render_closed_book_variant(&format!("{preamble} {emphasis}"))
}

fn digest(tag: &[u8], seed: u64, text: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(seed.to_le_bytes());
    hasher.update(text.as_bytes());
    hasher.finalize().into()
}

/// Deterministic Fisher-Yates over whitespace-separated words, driven by
/// digest bytes. The leading word is guaranteed to move whenever at least
/// two distinct words exist, so no prefix of the original survives intact.
fn shuffle_words(text: &str, digest: &[u8; 32]) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    let original = words.clone();

    let mut k = 0usize;
    for i in (1..words.len()).rev() {
        let b = u16::from_le_bytes([digest[k % 32], digest[(k + 1) % 32]]);
        k += 2;
        let j = b as usize % (i + 1);
        words.swap(i, j);
    }

    if !words.is_empty() && words[0] == original[0] {
        if let Some(idx) = words.iter().position(|w| *w != original[0]) {
            words.swap(0, idx);
        }
    }

    words.join(" ")
}
