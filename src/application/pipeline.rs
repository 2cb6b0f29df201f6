//! The generate → critique → bounded-refine pipeline.
//!
//! One [`PipelineService::run_turn`] call drives a whole turn: request an
//! initial draft, evaluate it against policy, and either accept it or refine
//! it within a fixed budget. Every draft and verdict is retained for the
//! audit trail regardless of how the turn ends.
//!
//! The loop is strictly sequential: each generation call is one blocking
//! round trip, and critique never runs concurrently with generation. Provider
//! errors abort the turn; the refinement budget only covers policy failures.
//! Archive writes are best-effort and never gate the outcome.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::domain::format::{ResponseFormatter, WrapMarkers};
use crate::domain::persona::ChatMessage;
use crate::domain::policy::{LengthRule, ReplyClassifier, Verdict};
use crate::domain::prompt::{PromptBuilder, RefinementStrategy};
use crate::domain::turn::{AttemptHistory, AuditEntry, Draft, FinalResult, Turn};
use crate::ports::{
    AIProvider, CompletionRequest, InvocationRecord, PromptRole, ProviderError, TokenUsage,
    TurnArchive, TurnOutcome, TurnRecord,
};

/// Composes the deterministic length rule and the model-mediated
/// contradiction rule into one verdict per draft.
///
/// Both checks always run: a length violation alone never skips the judge
/// call, so the refiner always has the judge's narrative explanation to work
/// with.
pub struct PolicyEngine {
    length: LengthRule,
    classifier: ReplyClassifier,
    prompts: PromptBuilder,
    max_tokens: u32,
}

/// Outcome of evaluating one draft, including the judge round trip for the
/// audit archive.
pub struct Evaluation {
    /// Combined verdict from both rules.
    pub verdict: Verdict,
    /// Judge call details, for archival.
    pub judge: JudgeTrace,
}

/// One judge round trip.
pub struct JudgeTrace {
    /// System prompt sent to the judge.
    pub system_prompt: String,
    /// Raw free-text reply.
    pub reply: String,
    /// Usage counts, when reported.
    pub usage: Option<TokenUsage>,
    /// When the call started.
    pub started_at: DateTime<Utc>,
    /// When the call finished.
    pub finished_at: DateTime<Utc>,
}

impl PolicyEngine {
    /// Creates an engine from policy configuration.
    pub fn new(config: &PipelineConfig, max_tokens: u32) -> Self {
        Self {
            length: LengthRule::new(config.length_rule()),
            classifier: ReplyClassifier::new(config.clean_patterns.clone()),
            prompts: PromptBuilder::new(
                config.investigator_name.clone(),
                config.context_exchanges,
            ),
            max_tokens,
        }
    }

    /// Evaluates one draft: the deterministic length check plus one judge
    /// call, merged so neither result suppresses the other.
    pub async fn evaluate(
        &self,
        turn: &Turn,
        draft: &Draft,
        provider: &dyn AIProvider,
    ) -> Result<Evaluation, ProviderError> {
        let length_verdict = self.length.check(&draft.text);

        let system_prompt = self.prompts.judge_prompt(&turn.persona, &draft.text);
        let started_at = Utc::now();
        let response = provider
            .complete(
                CompletionRequest::new(
                    system_prompt.clone(),
                    vec![ChatMessage::user(draft.text.clone())],
                )
                .with_max_tokens(self.max_tokens),
            )
            .await?;
        let finished_at = Utc::now();

        let judge_verdict = self.classifier.classify(&response.content);

        Ok(Evaluation {
            verdict: length_verdict.merge(judge_verdict),
            judge: JudgeTrace {
                system_prompt,
                reply: response.content,
                usage: response.usage,
                started_at,
                finished_at,
            },
        })
    }
}

/// Orchestrates the refinement loop for a turn.
pub struct PipelineService {
    provider: Arc<dyn AIProvider>,
    archive: Arc<dyn TurnArchive>,
    engine: PolicyEngine,
    prompts: PromptBuilder,
    formatter: ResponseFormatter,
    max_attempts: u32,
    aggressive_after: u32,
    max_tokens: u32,
}

impl PipelineService {
    /// Wires the pipeline from its collaborators and policy configuration.
    pub fn new(
        provider: Arc<dyn AIProvider>,
        archive: Arc<dyn TurnArchive>,
        config: &PipelineConfig,
        max_tokens: u32,
    ) -> Self {
        Self {
            engine: PolicyEngine::new(config, max_tokens),
            prompts: PromptBuilder::new(
                config.investigator_name.clone(),
                config.context_exchanges,
            ),
            formatter: ResponseFormatter::new()
                .with_wrapping(config.investigator_name.clone(), WrapMarkers::monologue()),
            max_attempts: config.max_attempts,
            aggressive_after: config.aggressive_after,
            max_tokens,
            provider,
            archive,
        }
    }

    /// Runs one turn end to end.
    ///
    /// Never fails for policy reasons: budget exhaustion degrades to the last
    /// draft with `accepted_cleanly = false`. Only transport-level
    /// [`ProviderError`]s propagate.
    #[tracing::instrument(
        skip(self, turn),
        fields(turn_id = %turn.id, persona = %turn.persona.name)
    )]
    pub async fn run_turn(&self, turn: Turn) -> Result<FinalResult, ProviderError> {
        self.record_turn_start(&turn).await;

        let system_prompt = self.prompts.system_prompt(&turn);
        let initial_text = self
            .invoke(
                &turn,
                PromptRole::Initial,
                system_prompt,
                turn.persona.messages.clone(),
            )
            .await?;
        debug!(draft = %initial_text, "initial draft");

        let result = if turn.persona.has_violation_rules() {
            self.refinement_loop(&turn, Draft::initial(initial_text))
                .await?
        } else {
            // No persona rules to enforce: the critique stage is skipped
            // entirely and the initial draft stands.
            debug!("no violation rules configured; skipping critique");
            let draft = Draft::initial(initial_text);
            let text = self.formatter.format(&turn.persona.name, &draft.text);
            FinalResult {
                text,
                audit: vec![AuditEntry {
                    draft,
                    verdict: Verdict::Clean,
                }],
                accepted_cleanly: true,
                attempts_used: 0,
            }
        };

        info!(
            accepted_cleanly = result.accepted_cleanly,
            attempts = result.attempts_used,
            "turn complete"
        );
        self.record_turn_finish(&turn, &result).await;
        Ok(result)
    }

    /// Evaluating → {Accepted | Refining} → Evaluating → … → Accepted |
    /// Exhausted.
    async fn refinement_loop(
        &self,
        turn: &Turn,
        initial: Draft,
    ) -> Result<FinalResult, ProviderError> {
        let mut draft = initial;
        let mut audit: Vec<AuditEntry> = Vec::new();
        let mut history = AttemptHistory::new();
        let mut attempts_used: u32 = 0;

        let (final_draft, accepted_cleanly) = loop {
            let evaluation = self.engine.evaluate(turn, &draft, self.provider.as_ref()).await?;
            self.record_judge(turn, &draft, &evaluation).await;
            audit.push(AuditEntry {
                draft: draft.clone(),
                verdict: evaluation.verdict.clone(),
            });

            let violation = match evaluation.verdict {
                Verdict::Clean => break (draft, true),
                Verdict::Violation(v) => v,
            };
            debug!(rule = %violation.rule, origin = %draft.origin, "draft rejected");

            if attempts_used >= self.max_attempts {
                // Budget exhausted: degrade gracefully with the last draft.
                break (draft, false);
            }

            history.push(draft.clone());
            attempts_used += 1;
            let strategy = RefinementStrategy::for_attempt(attempts_used, self.aggressive_after);
            let refiner_prompt = self.prompts.refiner_prompt(
                &turn.persona,
                turn.persona.trigger_message().unwrap_or_default(),
                &violation,
                &history,
                strategy,
            );
            let refined_text = self
                .invoke(
                    turn,
                    PromptRole::Refine,
                    refiner_prompt,
                    vec![ChatMessage::user(draft.text.clone())],
                )
                .await?;
            draft = Draft::refined(refined_text, attempts_used);
        };

        let text = self.formatter.format(&turn.persona.name, &final_draft.text);
        Ok(FinalResult {
            text,
            audit,
            accepted_cleanly,
            attempts_used,
        })
    }

    /// One generation round trip, archived best-effort.
    async fn invoke(
        &self,
        turn: &Turn,
        role: PromptRole,
        system_prompt: String,
        messages: Vec<ChatMessage>,
    ) -> Result<String, ProviderError> {
        let started_at = Utc::now();
        let response = self
            .provider
            .complete(
                CompletionRequest::new(system_prompt.clone(), messages.clone())
                    .with_max_tokens(self.max_tokens),
            )
            .await?;
        let finished_at = Utc::now();

        self.record_invocation(InvocationRecord {
            turn_id: turn.id,
            prompt_role: role,
            system_prompt,
            messages,
            input_tokens: response.usage.map(|u| u.input_tokens),
            output_tokens: response.usage.map(|u| u.output_tokens),
            response: response.content.clone(),
            started_at,
            finished_at,
        })
        .await;

        Ok(response.content)
    }

    async fn record_turn_start(&self, turn: &Turn) {
        let record = TurnRecord {
            turn_id: turn.id,
            session_id: turn.session_id.clone(),
            character_file_version: turn.character_file_version.clone(),
            model: self.provider.provider_info().model,
            persona_name: turn.persona.name.clone(),
            chat_messages: turn.persona.messages.clone(),
        };
        if let Err(err) = self.archive.begin_turn(record).await {
            warn!(%err, "failed to archive turn start");
        }
    }

    async fn record_judge(&self, turn: &Turn, draft: &Draft, evaluation: &Evaluation) {
        self.record_invocation(InvocationRecord {
            turn_id: turn.id,
            prompt_role: PromptRole::Judge,
            system_prompt: evaluation.judge.system_prompt.clone(),
            messages: vec![ChatMessage::user(draft.text.clone())],
            input_tokens: evaluation.judge.usage.map(|u| u.input_tokens),
            output_tokens: evaluation.judge.usage.map(|u| u.output_tokens),
            response: evaluation.judge.reply.clone(),
            started_at: evaluation.judge.started_at,
            finished_at: evaluation.judge.finished_at,
        })
        .await;
    }

    async fn record_invocation(&self, record: InvocationRecord) {
        if let Err(err) = self.archive.record_invocation(record).await {
            warn!(%err, "failed to archive invocation");
        }
    }

    async fn record_turn_finish(&self, turn: &Turn, result: &FinalResult) {
        let critique_response = result
            .audit
            .iter()
            .rev()
            .find_map(|entry| entry.verdict.violation().map(|v| v.explanation.clone()));
        let outcome = TurnOutcome {
            original_response: result.original_text().unwrap_or_default().to_string(),
            critique_response,
            problems_detected: result.audit.iter().any(|e| !e.verdict.is_clean()),
            final_response: result.text.clone(),
            refined_response: result.refined_text().map(str::to_string),
            accepted_cleanly: result.accepted_cleanly,
        };
        if let Err(err) = self.archive.finish_turn(turn.id, outcome).await {
            warn!(%err, "failed to archive turn outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError};
    use crate::adapters::archive::InMemoryTurnArchive;
    use crate::domain::persona::PersonaConfig;

    fn persona() -> PersonaConfig {
        PersonaConfig {
            name: "Mira Voss".to_string(),
            personality: "guarded".to_string(),
            bio: "the lighthouse keeper".to_string(),
            known_facts: "saw a boat at midnight".to_string(),
            secret: "owed the victim money".to_string(),
            violation_rules: "Principle 2: never admits to leaving the tower.".to_string(),
            messages: vec![ChatMessage::user("Where were you at midnight?")],
        }
    }

    fn turn() -> Turn {
        Turn::new(persona(), "A storm cut the island off.", "session-1", "v3")
    }

    fn service(provider: MockAIProvider) -> (PipelineService, Arc<InMemoryTurnArchive>) {
        let archive = Arc::new(InMemoryTurnArchive::new());
        let service = PipelineService::new(
            Arc::new(provider),
            archive.clone(),
            &PipelineConfig::default(),
            1024,
        );
        (service, archive)
    }

    #[tokio::test]
    async fn clean_initial_draft_is_accepted_without_refinement() {
        let provider = MockAIProvider::new()
            .with_response("I was in the tower, watching the boat.")
            .with_response("NONE!");
        let (service, archive) = service(provider);

        let result = service.run_turn(turn()).await.unwrap();

        assert!(result.accepted_cleanly);
        assert_eq!(result.attempts_used, 0);
        assert_eq!(result.text, "I was in the tower, watching the boat.");
        assert_eq!(result.audit.len(), 1);
        assert!(result.audit[0].verdict.is_clean());
        // initial + judge
        assert_eq!(archive.invocations().len(), 2);
    }

    #[tokio::test]
    async fn length_violation_triggers_refinement_and_judge_still_runs() {
        let long_line = "x".repeat(400);
        let provider = MockAIProvider::new()
            .with_response(long_line)
            .with_response("NONE!") // judge is consulted even though length fired
            .with_response("A short line.")
            .with_response("NONE!");
        let (service, _archive) = service(provider.clone());

        let result = service.run_turn(turn()).await.unwrap();

        assert!(result.accepted_cleanly);
        assert_eq!(result.attempts_used, 1);
        assert_eq!(result.text, "A short line.");
        assert_eq!(result.audit.len(), 2);
        assert!(!result.audit[0].verdict.is_clean());
        // initial, judge, refine, judge
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn budget_exhaustion_returns_last_draft_flagged_unclean() {
        let violation_reply =
            "Quote: \"bad line\" Critique: contradicts the boat sighting. Violated principle: Principle A.";
        let provider = MockAIProvider::new()
            .with_response("bad line 0")
            .with_response(violation_reply)
            .with_response("bad line 1")
            .with_response(violation_reply)
            .with_response("bad line 2")
            .with_response(violation_reply);
        let (service, provider_archive) = service(provider.clone());

        let result = service.run_turn(turn()).await.unwrap();

        assert!(!result.accepted_cleanly);
        assert_eq!(result.attempts_used, 2);
        assert_eq!(result.text, "bad line 2");
        assert_eq!(result.audit.len(), 3);
        // initial + 2 judges + 2 refines + final judge = 6 provider calls
        assert_eq!(provider.call_count(), 6);
        let outcome = provider_archive.outcome().expect("outcome archived");
        assert!(!outcome.accepted_cleanly);
        assert!(outcome.problems_detected);
        assert_eq!(outcome.refined_response.as_deref(), Some("bad line 2"));
    }

    #[tokio::test]
    async fn provider_error_aborts_before_any_evaluation() {
        let provider = MockAIProvider::new().with_error(MockError::Unavailable {
            message: "overloaded".to_string(),
        });
        let (service, archive) = service(provider.clone());

        let err = service.run_turn(turn()).await.unwrap_err();

        assert!(matches!(err, ProviderError::Unavailable { .. }));
        assert_eq!(provider.call_count(), 1);
        assert!(archive.outcome().is_none());
    }

    #[tokio::test]
    async fn provider_error_during_judge_aborts_the_turn() {
        let provider = MockAIProvider::new()
            .with_response("a line")
            .with_error(MockError::Network {
                message: "reset".to_string(),
            });
        let (service, _archive) = service(provider);

        let err = service.run_turn(turn()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }

    #[tokio::test]
    async fn empty_violation_rules_skip_critique() {
        let mut p = persona();
        p.violation_rules = "  ".to_string();
        let turn = Turn::new(p, "story", "session-1", "v3");

        let provider = MockAIProvider::new().with_response("Any line at all.");
        let (service, _archive) = service(provider.clone());

        let result = service.run_turn(turn).await.unwrap();

        assert!(result.accepted_cleanly);
        assert_eq!(result.audit.len(), 1);
        // Only the initial draft call; no judge.
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn investigator_lines_are_formatted_as_monologue() {
        let mut p = persona();
        p.name = "Kiro Nikaido".to_string();
        let turn = Turn::new(p, "story", "session-1", "v3");

        let provider = MockAIProvider::new()
            .with_response("The tide was already in.")
            .with_response("NONE!");
        let (service, _archive) = service(provider);

        let result = service.run_turn(turn).await.unwrap();
        assert_eq!(result.text, "（The tide was already in.）");
    }
}
