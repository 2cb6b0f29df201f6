//! Consistency policy for candidate dialogue lines.
//!
//! Two rules guard every draft: a deterministic character-budget check
//! ([`LengthRule`]) and a model-mediated contradiction check whose free-text
//! answer is normalized by [`ReplyClassifier`]. Both produce a [`Verdict`];
//! the policy engine merges them.

mod critique;
mod length;
mod verdict;

pub use critique::{ReplyClassifier, CLEAN_SENTINEL, CONSISTENCY_RULE_ID};
pub use length::{LengthRule, LengthRuleConfig, LENGTH_RULE_ID};
pub use verdict::{Verdict, Violation};
