//! Domain layer: personas, turns, policy rules, prompts, and formatting.
//!
//! Everything here is pure and synchronous. The generation capability is only
//! reachable through the `ports` layer; the domain supplies the prompts sent
//! to it and the parsing of its replies.

pub mod format;
pub mod persona;
pub mod policy;
pub mod prompt;
pub mod turn;

pub use format::{ResponseFormatter, WrapMarkers};
pub use persona::{ChatMessage, ChatRole, PersonaConfig};
pub use policy::{
    LengthRule, LengthRuleConfig, ReplyClassifier, Verdict, Violation, CLEAN_SENTINEL,
    CONSISTENCY_RULE_ID, LENGTH_RULE_ID,
};
pub use prompt::{PromptBuilder, RefinementStrategy};
pub use turn::{AttemptHistory, AuditEntry, Draft, DraftOrigin, FinalResult, Turn, TurnId};
