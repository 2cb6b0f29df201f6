//! Turn Archive Port - best-effort persistence of turns and invocations.
//!
//! Archival exists for analytics only. It is fire-and-forget relative to the
//! decision pipeline: failures are logged at warn level and never alter the
//! returned result. Implementations must not block the pipeline on anything
//! beyond their own I/O.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::persona::ChatMessage;
use crate::domain::turn::TurnId;

/// Which generation role produced an archived invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    /// The initial persona draft.
    Initial,
    /// The consistency judge.
    Judge,
    /// A refinement attempt.
    Refine,
}

impl PromptRole {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptRole::Initial => "initial",
            PromptRole::Judge => "judge",
            PromptRole::Refine => "refine",
        }
    }
}

/// Row describing one turn at the moment it starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Turn identifier.
    pub turn_id: TurnId,
    /// Caller session identifier.
    pub session_id: String,
    /// Version tag of the character file the caller used.
    pub character_file_version: String,
    /// Model serving the turn.
    pub model: String,
    /// Persona speaking this turn.
    pub persona_name: String,
    /// Conversation history supplied with the turn.
    pub chat_messages: Vec<ChatMessage>,
}

/// Row describing one generation-capability invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRecord {
    /// Turn this invocation belongs to.
    pub turn_id: TurnId,
    /// Which pipeline stage made the call.
    pub prompt_role: PromptRole,
    /// System prompt sent.
    pub system_prompt: String,
    /// Messages sent.
    pub messages: Vec<ChatMessage>,
    /// Prompt token count, when the provider reports one.
    pub input_tokens: Option<u32>,
    /// Completion token count, when the provider reports one.
    pub output_tokens: Option<u32>,
    /// Raw response text.
    pub response: String,
    /// When the call started.
    pub started_at: DateTime<Utc>,
    /// When the call finished.
    pub finished_at: DateTime<Utc>,
}

/// Summary written when a turn completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// The unformatted initial draft.
    pub original_response: String,
    /// The last judge reply, if the critique stage ran.
    pub critique_response: Option<String>,
    /// True if any draft was found in violation.
    pub problems_detected: bool,
    /// The formatted text returned to the caller.
    pub final_response: String,
    /// The last refined draft, if refinement ran.
    pub refined_response: Option<String>,
    /// False when the refinement budget was exhausted while still violating.
    pub accepted_cleanly: bool,
}

/// Port for best-effort turn/invocation archival.
#[async_trait]
pub trait TurnArchive: Send + Sync {
    /// Records the start of a turn.
    async fn begin_turn(&self, record: TurnRecord) -> Result<(), ArchiveError>;

    /// Records one generation invocation within a turn.
    async fn record_invocation(&self, record: InvocationRecord) -> Result<(), ArchiveError>;

    /// Records the final outcome of a turn.
    async fn finish_turn(&self, turn_id: TurnId, outcome: TurnOutcome) -> Result<(), ArchiveError>;
}

/// Archive failures. Logged and swallowed by the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Underlying storage failed.
    #[error("archive storage error: {0}")]
    Storage(String),

    /// A record could not be serialized for storage.
    #[error("archive serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_role_storage_form_is_stable() {
        assert_eq!(PromptRole::Initial.as_str(), "initial");
        assert_eq!(PromptRole::Judge.as_str(), "judge");
        assert_eq!(PromptRole::Refine.as_str(), "refine");
    }

    #[test]
    fn prompt_role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PromptRole::Judge).unwrap(),
            "\"judge\""
        );
    }
}
