//! Judge-reply normalization and parsing.
//!
//! The contradiction judge is a free-text generator, so its verdict arrives as
//! prose. Classification is a two-stage transform: the raw reply is first
//! normalized (trimmed, lowercased), then scanned against an ordered list of
//! clean patterns; anything that matches none of them fails closed as a
//! [`Verdict::Violation`], parsed into quote / critique / violated-principle
//! fields when the structured format is present.
//!
//! The clean-pattern list is policy configuration, not control flow: new
//! "no violation" phrasings are added to the list, never as inline
//! conditionals.

use once_cell::sync::Lazy;

use super::verdict::{Verdict, Violation};

/// Rule identifier used when the judge reports a violation without naming a
/// principle in the recognized format.
pub const CONSISTENCY_RULE_ID: &str = "story-consistency";

/// Sentinel token the judge is instructed to emit when no principle is
/// violated.
pub const CLEAN_SENTINEL: &str = "NONE!";

/// Field labels of the structured violation format the judge is asked to use.
const QUOTE_LABEL: &str = "quote:";
const CRITIQUE_LABEL: &str = "critique:";
const PRINCIPLE_LABEL: &str = "violated principle:";

/// Default phrasings treated as "no violation found", matched
/// case-insensitively anywhere in the reply. Ordered: earlier patterns are
/// checked first.
static DEFAULT_CLEAN_PATTERNS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "none!",
        "no violation found",
        "no violations found",
        "no principles violated",
        "no principle was violated",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
});

/// Classifies free-text judge replies into tagged verdicts.
#[derive(Debug, Clone)]
pub struct ReplyClassifier {
    clean_patterns: Vec<String>,
}

impl Default for ReplyClassifier {
    fn default() -> Self {
        Self {
            clean_patterns: DEFAULT_CLEAN_PATTERNS.clone(),
        }
    }
}

impl ReplyClassifier {
    /// Creates a classifier with a custom ordered pattern list. Patterns are
    /// matched case-insensitively as substrings of the normalized reply.
    pub fn new(clean_patterns: Vec<String>) -> Self {
        Self {
            clean_patterns: clean_patterns
                .into_iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    /// Classifies a judge reply.
    ///
    /// A reply containing any clean pattern (even surrounded by commentary,
    /// e.g. step-by-step reasoning ending in the sentinel) is [`Verdict::Clean`].
    /// Everything else is treated as a violation: this heuristic fails closed
    /// rather than silently accepting questionable output.
    pub fn classify(&self, reply: &str) -> Verdict {
        let normalized = reply.trim().to_lowercase();
        if normalized.is_empty() {
            // An empty judge reply carries no verdict; fail closed.
            return Verdict::Violation(Violation::new(
                CONSISTENCY_RULE_ID,
                "the consistency judge returned an empty reply",
                None,
            ));
        }

        if self
            .clean_patterns
            .iter()
            .any(|pattern| normalized.contains(pattern))
        {
            return Verdict::Clean;
        }

        Verdict::Violation(self.parse_violation(reply, &normalized))
    }

    /// Extracts the structured fields from a violation reply, falling back to
    /// the whole reply as the explanation.
    fn parse_violation(&self, reply: &str, normalized: &str) -> Violation {
        let excerpt = field_after(reply, normalized, QUOTE_LABEL, &[CRITIQUE_LABEL]);
        let critique = field_after(reply, normalized, CRITIQUE_LABEL, &[PRINCIPLE_LABEL]);
        let principle = field_after(reply, normalized, PRINCIPLE_LABEL, &[]);

        let explanation = critique.unwrap_or_else(|| reply.trim().to_string());
        let rule = principle.unwrap_or_else(|| CONSISTENCY_RULE_ID.to_string());

        Violation::new(rule, explanation, excerpt)
    }
}

/// Returns the text following `label` (case-insensitive match against
/// `normalized`), up to the first of `terminators` or end of reply.
fn field_after(
    reply: &str,
    normalized: &str,
    label: &str,
    terminators: &[&str],
) -> Option<String> {
    let start = normalized.find(label)? + label.len();
    let rest_normalized = &normalized[start..];
    let end = terminators
        .iter()
        .filter_map(|t| rest_normalized.find(t))
        .min()
        .unwrap_or(rest_normalized.len());

    // Label and terminator offsets are byte positions into the lowercased
    // string; lowercasing can change byte lengths for some scripts, so slice
    // the original reply defensively via char-boundary-safe get().
    let value = reply
        .get(start..start + end)
        .unwrap_or(&rest_normalized[..end]);
    let value = value.trim().trim_matches('"').trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ReplyClassifier {
        ReplyClassifier::default()
    }

    #[test]
    fn exact_sentinel_is_clean() {
        assert!(classifier().classify("NONE!").is_clean());
    }

    #[test]
    fn sentinel_is_case_insensitive() {
        assert!(classifier().classify("none!").is_clean());
        assert!(classifier().classify("None!").is_clean());
    }

    #[test]
    fn sentinel_embedded_in_commentary_is_clean() {
        let reply = "Let me think step by step. The line matches the known facts. NONE!";
        assert!(classifier().classify(reply).is_clean());
    }

    #[test]
    fn explicit_no_violation_phrasing_is_clean() {
        assert!(classifier()
            .classify("After review, no violation found in this line.")
            .is_clean());
    }

    #[test]
    fn structured_violation_is_parsed_into_fields() {
        let reply = r#"The speaker denies the meeting. Quote: "I never met him." Critique: the character's own facts state they met on Tuesday. Violated principle: Principle A: the line contradicts facts the character knows."#;
        let verdict = classifier().classify(reply);

        let v = verdict.violation().expect("should violate");
        assert_eq!(v.excerpt.as_deref(), Some("I never met him."));
        assert!(v.explanation.contains("met on Tuesday"));
        assert!(v.rule.starts_with("Principle A"));
    }

    #[test]
    fn unstructured_reply_fails_closed_with_full_text() {
        let reply = "This line seems to hint at the secret being revealed.";
        let verdict = classifier().classify(reply);

        let v = verdict.violation().expect("should violate");
        assert_eq!(v.rule, CONSISTENCY_RULE_ID);
        assert_eq!(v.explanation, reply);
        assert_eq!(v.excerpt, None);
    }

    #[test]
    fn empty_reply_fails_closed() {
        assert!(!classifier().classify("   ").is_clean());
    }

    #[test]
    fn custom_pattern_list_extends_clean_phrasings() {
        let classifier = ReplyClassifier::new(vec![
            "none!".to_string(),
            "all clear".to_string(),
        ]);
        assert!(classifier.classify("All clear, nothing to report.").is_clean());
        // Default phrasings not in the custom list no longer match.
        assert!(!classifier.classify("no violation found").is_clean());
    }

    #[test]
    fn violation_format_without_principle_uses_default_rule() {
        let reply = r#"Quote: "It was raining." Critique: the story says the night was dry."#;
        let v = classifier().classify(reply);
        let v = v.violation().unwrap();
        assert_eq!(v.rule, CONSISTENCY_RULE_ID);
        assert_eq!(v.excerpt.as_deref(), Some("It was raining."));
    }
}
