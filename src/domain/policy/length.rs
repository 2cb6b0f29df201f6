//! Deterministic character-budget rule.
//!
//! Dialogue lines are bounded by *equivalent length*: ideographic characters
//! read slower and count as a full unit, while every other character
//! (letters, digits, punctuation, whitespace) counts as half a unit, rounded
//! up in aggregate. Threshold and weights are table-driven so products can
//! tune persona-specific limits.

use super::verdict::{Verdict, Violation};

/// Rule identifier reported in length violations.
pub const LENGTH_RULE_ID: &str = "length-budget";

/// Excerpt length (in characters) quoted in violations.
const EXCERPT_CHARS: usize = 50;

/// Configuration for [`LengthRule`].
///
/// Weights are expressed in half-units so the arithmetic stays exact:
/// the default ideographic weight of 2 half-units is 1 full unit, the
/// default weight of 1 half-unit for everything else is 0.5 units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthRuleConfig {
    /// Maximum equivalent length in whole units.
    pub max_units: u32,
    /// Half-units charged per ideographic character.
    pub ideographic_half_units: u32,
    /// Half-units charged per non-ideographic character.
    pub other_half_units: u32,
}

impl Default for LengthRuleConfig {
    fn default() -> Self {
        Self {
            max_units: 88,
            ideographic_half_units: 2,
            other_half_units: 1,
        }
    }
}

/// Deterministic equivalent-length check. Pure: no suspension, no side
/// effects.
#[derive(Debug, Clone, Default)]
pub struct LengthRule {
    config: LengthRuleConfig,
}

impl LengthRule {
    /// Creates a rule with the given configuration.
    pub fn new(config: LengthRuleConfig) -> Self {
        Self { config }
    }

    /// Computes the equivalent length of `text` in whole units (rounded up).
    pub fn equivalent_units(&self, text: &str) -> u32 {
        let mut half_units: u64 = 0;
        for ch in text.chars() {
            half_units += if is_ideographic(ch) {
                u64::from(self.config.ideographic_half_units)
            } else {
                u64::from(self.config.other_half_units)
            };
        }
        // Round the aggregate up to whole units.
        ((half_units + 1) / 2) as u32
    }

    /// Checks `text` against the configured budget.
    pub fn check(&self, text: &str) -> Verdict {
        let units = self.equivalent_units(text);
        if units <= self.config.max_units {
            return Verdict::Clean;
        }

        Verdict::Violation(Violation::new(
            LENGTH_RULE_ID,
            format!(
                "the line is too long: {units} equivalent units exceeds the budget of {} \
                 (ideographic characters count 1 unit, all others 0.5)",
                self.config.max_units
            ),
            Some(excerpt(text)),
        ))
    }
}

/// First [`EXCERPT_CHARS`] characters of `text`, with an ellipsis when
/// truncated.
fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        out.push_str("...");
    }
    out
}

/// True for characters in the Han ideograph blocks.
fn is_ideographic(ch: char) -> bool {
    matches!(
        u32::from(ch),
        0x3400..=0x4DBF        // CJK Extension A
        | 0x4E00..=0x9FFF      // CJK Unified Ideographs
        | 0xF900..=0xFAFF      // CJK Compatibility Ideographs
        | 0x20000..=0x2A6DF    // CJK Extension B
        | 0x2A700..=0x2EBEF    // CJK Extensions C-F
        | 0x30000..=0x3134F    // CJK Extension G
    )
}
