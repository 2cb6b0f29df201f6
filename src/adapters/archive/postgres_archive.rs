//! PostgreSQL implementation of TurnArchive.
//!
//! Persists turns and generation invocations for offline analytics. All
//! failures surface as [`ArchiveError`]; the pipeline logs and ignores them.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::turn::TurnId;
use crate::ports::{ArchiveError, InvocationRecord, TurnArchive, TurnOutcome, TurnRecord};

/// PostgreSQL implementation of TurnArchive.
#[derive(Clone)]
pub struct PostgresTurnArchive {
    pool: PgPool,
}

impl PostgresTurnArchive {
    /// Creates a new PostgresTurnArchive.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the archive tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), ArchiveError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_turns (
                id UUID PRIMARY KEY,
                session_id TEXT NOT NULL,
                character_file_version TEXT NOT NULL,
                model TEXT NOT NULL,
                persona_name TEXT NOT NULL,
                chat_messages JSONB NOT NULL,
                original_response TEXT,
                critique_response TEXT,
                problems_detected BOOLEAN,
                final_response TEXT,
                refined_response TEXT,
                accepted_cleanly BOOLEAN,
                started_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                finished_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ai_invocations (
                id BIGSERIAL PRIMARY KEY,
                conversation_turn_id UUID NOT NULL,
                prompt_role TEXT NOT NULL,
                system_prompt TEXT NOT NULL,
                prompt_messages JSONB NOT NULL,
                input_tokens BIGINT,
                output_tokens BIGINT,
                total_tokens BIGINT,
                response TEXT NOT NULL,
                started_at TIMESTAMPTZ NOT NULL,
                finished_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }
}

fn storage_error(e: sqlx::Error) -> ArchiveError {
    ArchiveError::Storage(e.to_string())
}

#[async_trait]
impl TurnArchive for PostgresTurnArchive {
    async fn begin_turn(&self, record: TurnRecord) -> Result<(), ArchiveError> {
        let chat_messages = serde_json::to_value(&record.chat_messages)
            .map_err(|e| ArchiveError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO conversation_turns (
                id, session_id, character_file_version, model, persona_name, chat_messages
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.turn_id.as_uuid())
        .bind(&record.session_id)
        .bind(&record.character_file_version)
        .bind(&record.model)
        .bind(&record.persona_name)
        .bind(chat_messages)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn record_invocation(&self, record: InvocationRecord) -> Result<(), ArchiveError> {
        let prompt_messages = serde_json::to_value(&record.messages)
            .map_err(|e| ArchiveError::Serialization(e.to_string()))?;
        let total_tokens = match (record.input_tokens, record.output_tokens) {
            (None, None) => None,
            (input, output) => Some(
                i64::from(input.unwrap_or(0)) + i64::from(output.unwrap_or(0)),
            ),
        };

        sqlx::query(
            r#"
            INSERT INTO ai_invocations (
                conversation_turn_id, prompt_role, system_prompt, prompt_messages,
                input_tokens, output_tokens, total_tokens, response, started_at, finished_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.turn_id.as_uuid())
        .bind(record.prompt_role.as_str())
        .bind(&record.system_prompt)
        .bind(prompt_messages)
        .bind(record.input_tokens.map(i64::from))
        .bind(record.output_tokens.map(i64::from))
        .bind(total_tokens)
        .bind(&record.response)
        .bind(record.started_at)
        .bind(record.finished_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn finish_turn(&self, turn_id: TurnId, outcome: TurnOutcome) -> Result<(), ArchiveError> {
        sqlx::query(
            r#"
            UPDATE conversation_turns SET
                original_response = $2,
                critique_response = $3,
                problems_detected = $4,
                final_response = $5,
                refined_response = $6,
                accepted_cleanly = $7,
                finished_at = now()
            WHERE id = $1
            "#,
        )
        .bind(turn_id.as_uuid())
        .bind(&outcome.original_response)
        .bind(&outcome.critique_response)
        .bind(outcome.problems_detected)
        .bind(&outcome.final_response)
        .bind(&outcome.refined_response)
        .bind(outcome.accepted_cleanly)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }
}
