//! Persona-specific output formatting.
//!
//! The investigator's lines are inner monologue and are wrapped in fullwidth
//! parentheses before being returned to the player. Formatting is idempotent:
//! existing markers are stripped before reapplying, so repeated formatting
//! across refinement attempts never nests markers.

use std::collections::HashMap;

/// Wrapping markers applied to one persona's lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapMarkers {
    /// Opening marker.
    pub open: String,
    /// Closing marker.
    pub close: String,
}

impl WrapMarkers {
    /// Fullwidth parentheses, denoting inner monologue.
    pub fn monologue() -> Self {
        Self {
            open: "（".to_string(),
            close: "）".to_string(),
        }
    }
}

/// Idempotent persona-keyed post-processing of accepted text.
///
/// Personas without a registered wrapping pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct ResponseFormatter {
    wrappings: HashMap<String, WrapMarkers>,
}

impl ResponseFormatter {
    /// Creates a formatter with no registered wrappings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a wrapping for `persona`.
    pub fn with_wrapping(mut self, persona: impl Into<String>, markers: WrapMarkers) -> Self {
        self.wrappings.insert(persona.into(), markers);
        self
    }

    /// Formats `text` for `persona`.
    pub fn format(&self, persona: &str, text: &str) -> String {
        let Some(markers) = self.wrappings.get(persona) else {
            return text.to_string();
        };

        let mut inner = text.trim();
        // Strip any number of existing marker layers before reapplying.
        while let Some(stripped) = inner
            .strip_prefix(markers.open.as_str())
            .and_then(|s| s.strip_suffix(markers.close.as_str()))
        {
            inner = stripped.trim();
        }

        format!("{}{}{}", markers.open, inner, markers.close)
    }
}
