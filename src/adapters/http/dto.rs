//! HTTP DTOs for the invoke endpoint.
//!
//! These types decouple the wire format from domain types. Field aliases
//! accept the legacy client payload shape (`context1`, `violation`).

use serde::{Deserialize, Serialize};

use crate::domain::persona::{ChatMessage, ChatRole, PersonaConfig};
use crate::domain::turn::{DraftOrigin, FinalResult, Turn};

// Request DTOs

/// Request to serve one conversational turn.
#[derive(Debug, Clone, Deserialize)]
pub struct InvokeRequest {
    pub global_story: String,
    pub actor: ActorDto,
    pub session_id: String,
    pub character_file_version: String,
}

/// One character as supplied by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorDto {
    pub name: String,
    pub bio: String,
    pub personality: String,
    #[serde(alias = "context1")]
    pub known_facts: String,
    pub secret: String,
    #[serde(alias = "violation")]
    pub violation_rules: String,
    pub messages: Vec<ChatMessageDto>,
}

/// One chat message as supplied by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageDto {
    pub role: String,
    pub content: String,
}

impl ChatMessageDto {
    /// Parses the wire role tag.
    pub fn parse(self) -> Result<ChatMessage, String> {
        let role = match self.role.as_str() {
            "system" => ChatRole::System,
            "user" => ChatRole::User,
            "assistant" => ChatRole::Assistant,
            other => return Err(format!("unknown message role: {other}")),
        };
        Ok(ChatMessage::new(role, self.content))
    }
}

impl InvokeRequest {
    /// Converts the request into a domain turn.
    pub fn into_turn(self) -> Result<Turn, String> {
        let messages = self
            .actor
            .messages
            .into_iter()
            .map(ChatMessageDto::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let persona = PersonaConfig {
            name: self.actor.name,
            personality: self.actor.personality,
            bio: self.actor.bio,
            known_facts: self.actor.known_facts,
            secret: self.actor.secret,
            violation_rules: self.actor.violation_rules,
            messages,
        };

        Ok(Turn::new(
            persona,
            self.global_story,
            self.session_id,
            self.character_file_version,
        ))
    }
}

// Response DTOs

/// Response for one served turn.
#[derive(Debug, Clone, Serialize)]
pub struct InvokeResponse {
    /// The unformatted initial draft.
    pub original_response: String,
    /// The last violation explanation, if any draft was rejected.
    pub critique_response: Option<String>,
    /// True if any draft was found in violation.
    pub problems_detected: bool,
    /// The formatted text to show the player.
    pub final_response: String,
    /// The last refined draft, if refinement ran.
    pub refined_response: Option<String>,
    /// False when the refinement budget ran out while still violating.
    pub accepted_cleanly: bool,
    /// Refinement attempts consumed.
    pub attempts: u32,
    /// Full audit trail, one entry per evaluated draft.
    pub audit: Vec<AuditEntryDto>,
}

/// One evaluated draft in the audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntryDto {
    /// "initial" or "refined:N".
    pub origin: String,
    /// Draft text.
    pub text: String,
    /// "clean" or "violation".
    pub verdict: String,
    /// Violated rule identifier, when the verdict is a violation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Violation explanation, when the verdict is a violation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl From<FinalResult> for InvokeResponse {
    fn from(result: FinalResult) -> Self {
        let original_response = result.original_text().unwrap_or_default().to_string();
        let refined_response = result.refined_text().map(str::to_string);
        let critique_response = result
            .audit
            .iter()
            .rev()
            .find_map(|e| e.verdict.violation().map(|v| v.explanation.clone()));
        let problems_detected = result.audit.iter().any(|e| !e.verdict.is_clean());

        let audit = result
            .audit
            .iter()
            .map(|entry| AuditEntryDto {
                origin: match entry.draft.origin {
                    DraftOrigin::Initial => "initial".to_string(),
                    DraftOrigin::Refined(n) => format!("refined:{n}"),
                },
                text: entry.draft.text.clone(),
                verdict: if entry.verdict.is_clean() {
                    "clean".to_string()
                } else {
                    "violation".to_string()
                },
                rule: entry.verdict.violation().map(|v| v.rule.clone()),
                explanation: entry.verdict.violation().map(|v| v.explanation.clone()),
            })
            .collect();

        Self {
            original_response,
            critique_response,
            problems_detected,
            final_response: result.text,
            refined_response,
            accepted_cleanly: result.accepted_cleanly,
            attempts: result.attempts_used,
            audit,
        }
    }
}

/// Error payload for failed requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    /// Client sent an invalid request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: "bad_request".to_string(),
            message: message.into(),
        }
    }

    /// Upstream generation provider failed.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            error: "provider_error".to_string(),
            message: message.into(),
        }
    }

    /// Internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: "internal_error".to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::{Verdict, Violation};
    use crate::domain::turn::{AuditEntry, Draft};

    fn request_json() -> serde_json::Value {
        serde_json::json!({
            "global_story": "A storm cut the island off.",
            "actor": {
                "name": "Mira Voss",
                "bio": "the lighthouse keeper",
                "personality": "guarded",
                "context1": "saw a boat at midnight",
                "secret": "owed the victim money",
                "violation": "Principle 2: never admits to leaving the tower.",
                "messages": [
                    {"role": "user", "content": "Where were you?"}
                ]
            },
            "session_id": "s-1",
            "character_file_version": "v3"
        })
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let request: InvokeRequest = serde_json::from_value(request_json()).unwrap();
        assert_eq!(request.actor.known_facts, "saw a boat at midnight");
        assert!(request.actor.violation_rules.starts_with("Principle 2"));
    }

    #[test]
    fn into_turn_builds_persona_and_messages() {
        let request: InvokeRequest = serde_json::from_value(request_json()).unwrap();
        let turn = request.into_turn().unwrap();
        assert_eq!(turn.persona.name, "Mira Voss");
        assert_eq!(turn.persona.messages.len(), 1);
        assert_eq!(turn.session_id, "s-1");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let dto = ChatMessageDto {
            role: "narrator".to_string(),
            content: "hm".to_string(),
        };
        assert!(dto.parse().is_err());
    }

    #[test]
    fn response_summarizes_the_audit_trail() {
        let result = FinalResult {
            text: "fixed".to_string(),
            audit: vec![
                AuditEntry {
                    draft: Draft::initial("raw"),
                    verdict: Verdict::Violation(Violation::new(
                        "length-budget",
                        "too long",
                        None,
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

        let response = InvokeResponse::from(result);
        assert_eq!(response.original_response, "raw");
        assert_eq!(response.refined_response.as_deref(), Some("fixed"));
        assert_eq!(response.critique_response.as_deref(), Some("too long"));
        assert!(response.problems_detected);
        assert!(response.accepted_cleanly);
        assert_eq!(response.audit.len(), 2);
        assert_eq!(response.audit[0].origin, "initial");
        assert_eq!(response.audit[1].verdict, "clean");
    }
}
