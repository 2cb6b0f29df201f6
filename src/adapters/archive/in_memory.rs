//! In-memory implementation of TurnArchive.
//!
//! Used in tests and when no database is configured. Records are held in
//! memory and exposed for verification.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::turn::TurnId;
use crate::ports::{ArchiveError, InvocationRecord, TurnArchive, TurnOutcome, TurnRecord};

/// In-memory TurnArchive for tests and archive-less deployments.
#[derive(Debug, Default)]
pub struct InMemoryTurnArchive {
    turns: Mutex<Vec<TurnRecord>>,
    invocations: Mutex<Vec<InvocationRecord>>,
    outcomes: Mutex<Vec<(TurnId, TurnOutcome)>>,
}

impl InMemoryTurnArchive {
    /// Creates an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// All archived turn-start records.
    pub fn turns(&self) -> Vec<TurnRecord> {
        self.turns.lock().unwrap().clone()
    }

    /// All archived invocation records.
    pub fn invocations(&self) -> Vec<InvocationRecord> {
        self.invocations.lock().unwrap().clone()
    }

    /// The most recently archived turn outcome, if any.
    pub fn outcome(&self) -> Option<TurnOutcome> {
        self.outcomes
            .lock()
            .unwrap()
            .last()
            .map(|(_, outcome)| outcome.clone())
    }
}

#[async_trait]
impl TurnArchive for InMemoryTurnArchive {
    async fn begin_turn(&self, record: TurnRecord) -> Result<(), ArchiveError> {
        self.turns.lock().unwrap().push(record);
        Ok(())
    }

    async fn record_invocation(&self, record: InvocationRecord) -> Result<(), ArchiveError> {
        self.invocations.lock().unwrap().push(record);
        Ok(())
    }

    async fn finish_turn(&self, turn_id: TurnId, outcome: TurnOutcome) -> Result<(), ArchiveError> {
        self.outcomes.lock().unwrap().push((turn_id, outcome));
        Ok(())
    }
}

/// TurnArchive that fails every write. Used to verify that archive failures
/// never affect pipeline outcomes.
#[derive(Debug, Default)]
pub struct FailingTurnArchive;

#[async_trait]
impl TurnArchive for FailingTurnArchive {
    async fn begin_turn(&self, _record: TurnRecord) -> Result<(), ArchiveError> {
        Err(ArchiveError::Storage("archive is down".to_string()))
    }

    async fn record_invocation(&self, _record: InvocationRecord) -> Result<(), ArchiveError> {
        Err(ArchiveError::Storage("archive is down".to_string()))
    }

    async fn finish_turn(
        &self,
        _turn_id: TurnId,
        _outcome: TurnOutcome,
    ) -> Result<(), ArchiveError> {
        Err(ArchiveError::Storage("archive is down".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PromptRole;
    use chrono::Utc;

    #[tokio::test]
    async fn records_are_retrievable() {
        let archive = InMemoryTurnArchive::new();
        let turn_id = TurnId::new();

        archive
            .begin_turn(TurnRecord {
                turn_id,
                session_id: "s-1".to_string(),
                character_file_version: "v1".to_string(),
                model: "mock-model".to_string(),
                persona_name: "Mira Voss".to_string(),
                chat_messages: vec![],
            })
            .await
            .unwrap();

        archive
            .record_invocation(InvocationRecord {
                turn_id,
                prompt_role: PromptRole::Initial,
                system_prompt: "sys".to_string(),
                messages: vec![],
                input_tokens: Some(10),
                output_tokens: None,
                response: "a line".to_string(),
                started_at: Utc::now(),
                finished_at: Utc::now(),
            })
            .await
            .unwrap();

        assert_eq!(archive.turns().len(), 1);
        assert_eq!(archive.invocations().len(), 1);
        assert!(archive.outcome().is_none());
    }

    #[tokio::test]
    async fn failing_archive_always_errors() {
        let archive = FailingTurnArchive;
        let err = archive
            .finish_turn(
                TurnId::new(),
                TurnOutcome {
                    original_response: String::new(),
                    critique_response: None,
                    problems_detected: false,
                    final_response: String::new(),
                    refined_response: None,
                    accepted_cleanly: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Storage(_)));
    }
}
