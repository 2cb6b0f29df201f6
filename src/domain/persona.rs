//! Persona configuration and chat messages.
//!
//! A [`PersonaConfig`] is the caller-owned description of one character for one
//! turn: voice, backstory, the facts the character knows, the secret they keep,
//! and the persona-specific prohibited behaviors the policy engine enforces.
//! It is immutable for the duration of a turn.

use serde::{Deserialize, Serialize};

/// Role of a chat message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions (guides model behavior).
    System,
    /// Player input.
    User,
    /// Character (model) response.
    Assistant,
}

/// A single message in a persona's conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who sent this message.
    pub role: ChatRole,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Creates a new message.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Configuration for one character, supplied by the caller per turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Character name, also the formatter key.
    pub name: String,
    /// Core personality description.
    pub personality: String,
    /// Backstory and relationships.
    pub bio: String,
    /// Facts the character knows (or is willing to reveal) about the story.
    pub known_facts: String,
    /// The secret the character must not volunteer.
    pub secret: String,
    /// Free-text list of persona-specific prohibited behaviors.
    ///
    /// Empty or whitespace-only text disables the critique stage for this
    /// persona entirely.
    pub violation_rules: String,
    /// Ordered conversation history, oldest first. The last user message is
    /// the one that triggered the current turn.
    pub messages: Vec<ChatMessage>,
}

impl PersonaConfig {
    /// Returns true if this persona has any prohibited-behavior rules to
    /// enforce beyond the built-in fact-contradiction principle.
    pub fn has_violation_rules(&self) -> bool {
        !self.violation_rules.trim().is_empty()
    }

    /// The message that triggered this turn: the most recent user message.
    pub fn trigger_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }

    /// The most recent `exchanges` user/assistant exchanges, oldest first.
    ///
    /// An exchange is one user message plus one assistant reply, so this
    /// returns at most `2 * exchanges` messages. Used to give the judge enough
    /// context to resolve elliptical references in the candidate line.
    pub fn recent_exchanges(&self, exchanges: usize) -> &[ChatMessage] {
        let take = exchanges.saturating_mul(2);
        let start = self.messages.len().saturating_sub(take);
        &self.messages[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona_with_messages(messages: Vec<ChatMessage>) -> PersonaConfig {
        PersonaConfig {
            name: "Mira Voss".to_string(),
            personality: "guarded".to_string(),
            bio: "the lighthouse keeper".to_string(),
            known_facts: "saw a boat at midnight".to_string(),
            secret: "owed the victim money".to_string(),
            violation_rules: "Principle 2: never admits to leaving the tower".to_string(),
            messages,
        }
    }

    #[test]
    fn chat_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChatRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&ChatRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn has_violation_rules_ignores_whitespace() {
        let mut persona = persona_with_messages(vec![]);
        assert!(persona.has_violation_rules());

        persona.violation_rules = "   \n ".to_string();
        assert!(!persona.has_violation_rules());
    }

    #[test]
    fn trigger_message_is_last_user_message() {
        let persona = persona_with_messages(vec![
            ChatMessage::user("Where were you?"),
            ChatMessage::assistant("In the tower."),
            ChatMessage::user("All night?"),
        ]);
        assert_eq!(persona.trigger_message(), Some("All night?"));
    }

    #[test]
    fn trigger_message_none_without_user_messages() {
        let persona = persona_with_messages(vec![ChatMessage::assistant("...")]);
        assert_eq!(persona.trigger_message(), None);
    }

    #[test]
    fn recent_exchanges_takes_message_pairs_from_the_end() {
        let messages: Vec<ChatMessage> = (0..14)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("q{i}"))
                } else {
                    ChatMessage::assistant(format!("a{i}"))
                }
            })
            .collect();
        let persona = persona_with_messages(messages);

        let recent = persona.recent_exchanges(5);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "q4");
        assert_eq!(recent[9].content, "a13");
    }

    #[test]
    fn recent_exchanges_handles_short_history() {
        let persona = persona_with_messages(vec![ChatMessage::user("hello")]);
        assert_eq!(persona.recent_exchanges(5).len(), 1);
    }
}
