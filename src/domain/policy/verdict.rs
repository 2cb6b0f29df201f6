//! Policy verdicts.

use serde::{Deserialize, Serialize};

/// Outcome of policy evaluation for a single draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "verdict")]
pub enum Verdict {
    /// The draft passed every check.
    Clean,
    /// The draft violated at least one rule.
    Violation(Violation),
}

impl Verdict {
    /// True if the draft passed.
    pub fn is_clean(&self) -> bool {
        matches!(self, Verdict::Clean)
    }

    /// The violation details, if any.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Verdict::Clean => None,
            Verdict::Violation(v) => Some(v),
        }
    }

    /// Merges two verdicts into one.
    ///
    /// A deterministic violation is never suppressed by a clean judge result,
    /// and vice versa: the merge is Clean only when both inputs are Clean.
    /// When both are violations, explanations and rule identifiers are
    /// concatenated so the refiner sees every issue.
    pub fn merge(self, other: Verdict) -> Verdict {
        match (self, other) {
            (Verdict::Clean, v) | (v, Verdict::Clean) => v,
            (Verdict::Violation(a), Verdict::Violation(b)) => Verdict::Violation(a.merge(b)),
        }
    }
}

/// Details of a policy violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Identifier of the rule (or rules) that fired.
    pub rule: String,
    /// Narrative explanation, fed back to the refiner.
    pub explanation: String,
    /// Quoted excerpt of the offending text, when available.
    pub excerpt: Option<String>,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(
        rule: impl Into<String>,
        explanation: impl Into<String>,
        excerpt: Option<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            explanation: explanation.into(),
            excerpt,
        }
    }

    /// Concatenates another violation onto this one.
    fn merge(mut self, other: Violation) -> Violation {
        self.rule.push_str(", ");
        self.rule.push_str(&other.rule);
        self.explanation.push('\n');
        self.explanation.push_str(&other.explanation);
        if self.excerpt.is_none() {
            self.excerpt = other.excerpt;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(rule: &str, explanation: &str) -> Verdict {
        Verdict::Violation(Violation::new(rule, explanation, None))
    }

    #[test]
    fn clean_merged_with_clean_is_clean() {
        assert!(Verdict::Clean.merge(Verdict::Clean).is_clean());
    }

    #[test]
    fn violation_survives_merge_with_clean() {
        let merged = violation("length-budget", "too long").merge(Verdict::Clean);
        assert_eq!(merged.violation().unwrap().rule, "length-budget");

        let merged = Verdict::Clean.merge(violation("story-consistency", "contradicts facts"));
        assert_eq!(merged.violation().unwrap().rule, "story-consistency");
    }

    #[test]
    fn two_violations_concatenate() {
        let merged = violation("length-budget", "too long")
            .merge(violation("story-consistency", "contradicts facts"));

        let v = merged.violation().unwrap();
        assert_eq!(v.rule, "length-budget, story-consistency");
        assert_eq!(v.explanation, "too long\ncontradicts facts");
    }

    #[test]
    fn merge_keeps_first_available_excerpt() {
        let a = Verdict::Violation(Violation::new("a", "x", None));
        let b = Verdict::Violation(Violation::new("b", "y", Some("quoted".to_string())));
        let v = a.merge(b);
        assert_eq!(v.violation().unwrap().excerpt.as_deref(), Some("quoted"));
    }
}
