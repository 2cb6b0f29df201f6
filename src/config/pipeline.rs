//! Refinement pipeline configuration
//!
//! All policy knobs live here rather than as ambient constants: the length
//! budget and weights, the refinement budget, the escalation threshold, the
//! judge clean-pattern list, and the investigator persona identity.

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::policy::LengthRuleConfig;

/// Pipeline policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum refinement attempts per turn
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Attempt index (1-based) at which refinement stops editing the prior
    /// draft and regenerates from persona facts
    #[serde(default = "default_aggressive_after")]
    pub aggressive_after: u32,

    /// Maximum equivalent length in whole units
    #[serde(default = "default_length_max_units")]
    pub length_max_units: u32,

    /// Half-units charged per ideographic character
    #[serde(default = "default_ideographic_half_units")]
    pub ideographic_half_units: u32,

    /// Half-units charged per non-ideographic character
    #[serde(default = "default_other_half_units")]
    pub other_half_units: u32,

    /// Ordered judge-reply phrasings treated as "no violation found"
    #[serde(default = "default_clean_patterns")]
    pub clean_patterns: Vec<String>,

    /// Conversation exchanges embedded in the judge prompt
    #[serde(default = "default_context_exchanges")]
    pub context_exchanges: usize,

    /// Name of the investigator persona (inner-monologue formatting and the
    /// self-reflection prompt template key off this)
    #[serde(default = "default_investigator_name")]
    pub investigator_name: String,
}

impl PipelineConfig {
    /// Length-rule configuration derived from this section.
    pub fn length_rule(&self) -> LengthRuleConfig {
        LengthRuleConfig {
            max_units: self.length_max_units,
            ideographic_half_units: self.ideographic_half_units,
            other_half_units: self.other_half_units,
        }
    }

    /// Validate pipeline configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.aggressive_after == 0 {
            return Err(ValidationError::InvalidRefinementBudget);
        }
        if self.length_max_units == 0 {
            return Err(ValidationError::InvalidLengthBudget);
        }
        if self.clean_patterns.is_empty() {
            return Err(ValidationError::EmptyCleanPatterns);
        }
        if self.investigator_name.trim().is_empty() {
            return Err(ValidationError::EmptyInvestigatorName);
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            aggressive_after: default_aggressive_after(),
            length_max_units: default_length_max_units(),
            ideographic_half_units: default_ideographic_half_units(),
            other_half_units: default_other_half_units(),
            clean_patterns: default_clean_patterns(),
            context_exchanges: default_context_exchanges(),
            investigator_name: default_investigator_name(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_aggressive_after() -> u32 {
    3
}

fn default_length_max_units() -> u32 {
    88
}

fn default_ideographic_half_units() -> u32 {
    2
}

fn default_other_half_units() -> u32 {
    1
}

fn default_clean_patterns() -> Vec<String> {
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
}

fn default_context_exchanges() -> usize {
    5
}

fn default_investigator_name() -> String {
    "Kiro Nikaido".to_string()
}
