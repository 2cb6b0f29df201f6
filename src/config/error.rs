//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Refinement budget must allow at least the initial draft")]
    InvalidRefinementBudget,

    #[error("Length budget must be positive")]
    InvalidLengthBudget,

    #[error("Clean-pattern list must not be empty")]
    EmptyCleanPatterns,

    #[error("Investigator persona name must not be empty")]
    EmptyInvestigatorName,
}
