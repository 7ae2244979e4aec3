//! Evaluation prompt construction and the decision protocol.
//!
//! An [`EvaluationPrompt`] is the immutable unit of identity for one
//! validation call: a task description, an evidence block (absent in
//! closed-book mode), and the candidate output to verify, rendered into one
//! exact text. Two prompts with different evidence content are different
//! entities even when task and candidate match.

use crate::backend::ChatMessage;

/// Evidence blocks are truncated to keep the decision prompt inside the
/// budget of small verification models.
pub const MAX_EVIDENCE_CHARS: usize = 2000;
/// Candidate output limit for evidence-based prompts.
pub const MAX_CANDIDATE_CHARS: usize = 1000;
/// Candidate output limit for closed-book prompts.
pub const MAX_CLOSED_BOOK_CHARS: usize = 1500;

/// Truncate at a char boundary without allocating when under the limit.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// An immutable verification prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationPrompt {
    task: String,
    evidence: Option<String>,
    candidate: String,
    text: String,
}

impl EvaluationPrompt {
    /// Build a prompt that asks whether `candidate` is fully supported by
    /// `evidence`.
    pub fn evidence_based(task: &str, evidence: &str, candidate: &str) -> Self {
        let evidence = truncate_chars(evidence, MAX_EVIDENCE_CHARS).to_string();
        let candidate = truncate_chars(candidate, MAX_CANDIDATE_CHARS).to_string();
        let text = render_evidence_based(task, &evidence, &candidate);

        Self {
            task: task.to_string(),
            evidence: Some(evidence),
            candidate,
            text,
        }
    }

    /// Build a prompt with no evidence block, asking whether `candidate` is
    /// internally consistent as an answer to `question`.
    pub fn closed_book(question: &str, candidate: &str) -> Self {
        let candidate = truncate_chars(candidate, MAX_CLOSED_BOOK_CHARS).to_string();
        let text = render_closed_book(question, &candidate, None);

        Self {
            task: question.to_string(),
            evidence: None,
            candidate,
            text,
        }
    }

    /// The exact rendered prompt text. This is the prompt's identity.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// The (truncated) evidence block, if the prompt carries one.
    pub fn evidence(&self) -> Option<&str> {
        self.evidence.as_deref()
    }

    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    pub fn is_closed_book(&self) -> bool {
        self.evidence.is_none()
    }

    /// Re-render with the evidence block replaced, task and candidate
    /// preserved verbatim. Used by skeleton generation.
    pub(crate) fn render_with_evidence(&self, evidence_text: &str) -> String {
        render_evidence_based(&self.task, evidence_text, &self.candidate)
    }

    /// Re-render as a closed-book consistency question with a framing
    /// preamble, dropping any evidence. Used by skeleton generation.
    pub(crate) fn render_closed_book_variant(&self, preamble: &str) -> String {
        render_closed_book(&self.task, &self.candidate, Some(preamble))
    }
}

fn render_evidence_based(task: &str, evidence: &str, candidate: &str) -> String {
    format!(
        "VERIFICATION TASK: {task}\n\
         \n\
         SOURCE EVIDENCE:\n\
         {evidence}\n\
         \n\
         CLAIMS TO VERIFY:\n\
         {candidate}\n\
         \n\
         INSTRUCTIONS:\n\
         1. Check whether each claim is explicitly stated in the source evidence\n\
         2. Verify names, numbers, dates, and quantities against the source\n\
         3. Answer \"yes\" only if every claim is supported by the evidence above\n\
         4. Answer \"no\" if any claim is unsupported or contradicts the evidence\n\
         \n\
         QUESTION: Are all claims fully supported by the source evidence?\n\
         Answer: yes or no"
    )
}

fn render_closed_book(question: &str, candidate: &str, preamble: Option<&str>) -> String {
    let preamble = match preamble {
        Some(p) => format!("{p}\n\n"),
        None => String::new(),
    };
    format!(
        "{preamble}{question}\n\
         \n\
         Proposed answer:\n\
         {candidate}\n\
         \n\
         INSTRUCTIONS:\n\
         1. Check whether the answer is internally consistent\n\
         2. Verify dates, locations, and numbers are logically coherent\n\
         3. Answer \"yes\" if the answer is consistent and plausible\n\
         4. Answer \"no\" if it contains contradictions or implausible claims\n\
         \n\
         QUESTION: Is this answer internally consistent and coherent?\n\
         Answer: yes or no"
    )
}

/// Wrap a rendered prompt in the strict decision protocol.
///
/// The system message pins the model to a one-word yes/no reply so that the
/// classifier sees an unambiguous token in the common case. Anything else it
/// produces is treated as a decline.
pub fn decision_messages(prompt_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a strict verification assistant. Read the prompt and reply \
             with exactly one word: \"yes\" if you would assert the claims as \
             stated, or \"no\" if you would decline. Do not explain.",
        ),
        ChatMessage::user(prompt_text),
    ]
}
