//! Turn, draft, and refinement bookkeeping types.
//!
//! A [`Turn`] is one request-response exchange for a persona. During a turn the
//! pipeline produces an ordered sequence of [`Draft`]s; rejected drafts
//! accumulate in an [`AttemptHistory`] so the refiner can forbid repeating
//! prior phrasings. The accepted (or last) draft, together with the full
//! audit trail, becomes the [`FinalResult`].

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::persona::PersonaConfig;
use super::policy::Verdict;

/// Unique identifier for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(Uuid);

impl TurnId {
    /// Generates a fresh turn id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One request-response exchange for a persona within a session.
///
/// Owns nothing beyond the turn's inputs; destroyed after a [`FinalResult`]
/// is returned. Persistence is an external concern.
#[derive(Debug, Clone)]
pub struct Turn {
    /// Turn identifier, used to correlate archive records.
    pub id: TurnId,
    /// The character speaking this turn.
    pub persona: PersonaConfig,
    /// Shared story background injected ahead of the persona prompt.
    pub global_story: String,
    /// Caller session identifier (opaque to the pipeline).
    pub session_id: String,
    /// Version tag of the character file the caller used.
    pub character_file_version: String,
}

impl Turn {
    /// Creates a new turn with a fresh id.
    pub fn new(
        persona: PersonaConfig,
        global_story: impl Into<String>,
        session_id: impl Into<String>,
        character_file_version: impl Into<String>,
    ) -> Self {
        Self {
            id: TurnId::new(),
            persona,
            global_story: global_story.into(),
            session_id: session_id.into(),
            character_file_version: character_file_version.into(),
        }
    }
}

/// Where a draft came from within its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "attempt")]
pub enum DraftOrigin {
    /// The first draft requested for the turn.
    Initial,
    /// Produced by refinement attempt N (1-based).
    Refined(u32),
}

impl fmt::Display for DraftOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftOrigin::Initial => write!(f, "initial"),
            DraftOrigin::Refined(n) => write!(f, "refined:{n}"),
        }
    }
}

/// A candidate character line for the turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Candidate text.
    pub text: String,
    /// Which stage of the turn produced it.
    pub origin: DraftOrigin,
}

impl Draft {
    /// Creates the initial draft for a turn.
    pub fn initial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: DraftOrigin::Initial,
        }
    }

    /// Creates a draft produced by refinement attempt `attempt` (1-based).
    pub fn refined(text: impl Into<String>, attempt: u32) -> Self {
        Self {
            text: text.into(),
            origin: DraftOrigin::Refined(attempt),
        }
    }
}

/// Ordered record of drafts rejected during refinement of one turn.
///
/// Monotonically growing, scoped to a single turn, never shared across turns
/// or personas. Its length always equals the number of rejected refinement
/// attempts so far.
#[derive(Debug, Clone, Default)]
pub struct AttemptHistory {
    rejected: Vec<Draft>,
}

impl AttemptHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rejected draft.
    pub fn push(&mut self, draft: Draft) {
        self.rejected.push(draft);
    }

    /// Number of rejected drafts recorded so far.
    pub fn len(&self) -> usize {
        self.rejected.len()
    }

    /// True if no draft has been rejected yet.
    pub fn is_empty(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Iterates rejected drafts in rejection order.
    pub fn iter(&self) -> impl Iterator<Item = &Draft> {
        self.rejected.iter()
    }

    /// The rejected texts in rejection order, for prompt embedding.
    pub fn texts(&self) -> Vec<&str> {
        self.rejected.iter().map(|d| d.text.as_str()).collect()
    }
}

/// One evaluated draft in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// The draft that was evaluated.
    pub draft: Draft,
    /// The verdict the policy engine produced for it.
    pub verdict: Verdict,
}

/// Outcome of one turn through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResult {
    /// The accepted draft's text after persona formatting.
    pub text: String,
    /// Every (draft, verdict) pair in evaluation order.
    pub audit: Vec<AuditEntry>,
    /// True if the final draft passed policy; false if the refinement budget
    /// was exhausted while still violating.
    pub accepted_cleanly: bool,
    /// Number of refinement attempts consumed.
    pub attempts_used: u32,
}

impl FinalResult {
    /// The unformatted text of the first draft, if any was produced.
    pub fn original_text(&self) -> Option<&str> {
        self.audit
            .iter()
            .find(|e| e.draft.origin == DraftOrigin::Initial)
            .map(|e| e.draft.text.as_str())
    }

    /// The text of the last refined draft, if refinement ran.
    pub fn refined_text(&self) -> Option<&str> {
        self.audit
            .iter()
            .rev()
            .find(|e| matches!(e.draft.origin, DraftOrigin::Refined(_)))
            .map(|e| e.draft.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::Violation;

    #[test]
    fn draft_origin_displays_attempt_number() {
        assert_eq!(DraftOrigin::Initial.to_string(), "initial");
        assert_eq!(DraftOrigin::Refined(2).to_string(), "refined:2");
    }

    #[test]
    fn attempt_history_grows_monotonically() {
        let mut history = AttemptHistory::new();
        assert!(history.is_empty());

        history.push(Draft::initial("first try"));
        history.push(Draft::refined("second try", 1));

        assert_eq!(history.len(), 2);
        assert_eq!(history.texts(), vec!["first try", "second try"]);
    }

    #[test]
    fn final_result_exposes_original_and_refined_texts() {
        let result = FinalResult {
            text: "final".to_string(),
            audit: vec![
                AuditEntry {
                    draft: Draft::initial("raw"),
                    verdict: Verdict::Violation(Violation::new(
                        "length-budget",
                        "too long",
                        Some("raw".to_string()),
                    )),
                },
                AuditEntry {
                    draft: Draft::refined("fixed", 1),
                    verdict: Verdict::Clean,
                },
            ],
            accepted_cleanly: true,
            attempts_used: 1,
        };

        assert_eq!(result.original_text(), Some("raw"));
        assert_eq!(result.refined_text(), Some("fixed"));
    }

    #[test]
    fn final_result_refined_text_absent_without_refinement() {
        let result = FinalResult {
            text: "final".to_string(),
            audit: vec![AuditEntry {
                draft: Draft::initial("raw"),
                verdict: Verdict::Clean,
            }],
            accepted_cleanly: true,
            attempts_used: 0,
        };

        assert_eq!(result.refined_text(), None);
    }

    #[test]
    fn turn_ids_are_unique() {
        assert_ne!(TurnId::new(), TurnId::new());
    }
}
