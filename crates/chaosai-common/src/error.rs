//! Error types for ChaosAI
//!
//! Provides a unified error type and domain-specific error variants

use thiserror::Error;

/// Result type alias using ChaosError
pub type Result<T> = std::result::Result<T, ChaosError>;

/// Unified error type for ChaosAI operations
#[derive(Debug, Error)]
pub enum ChaosError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No scenarios found. Please provide at least 1 scenario family in the configuration")]
    NoScenarioFamilyConfigured,

    // Scenario construction errors
    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("Unable to build a population of {target} unique scenarios after {attempts} attempts")]
    PopulationExhausted { target: usize, attempts: usize },

    // Scenario execution errors
    #[error("Execution error: {0}")]
    Execution(String),

    // Metrics backend errors
    #[error("Metrics backend error: {0}")]
    Metrics(String),

    // Fitness computation errors
    #[error("Fitness calculation failed: {0}")]
    Fitness(String),

    // Health check watcher errors
    #[error("Health check watcher error: {0}")]
    Watcher(#[from] WatcherError),

    // Result persistence errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Filesystem errors
    #[error("I/O error: {0}")]
    Io(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Scenario construction errors
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Parameter {parameter} has no candidate values")]
    EmptyCandidates { parameter: String },

    #[error("Scenario family {0} is not configured")]
    FamilyNotConfigured(&'static str),
}

/// Health check watcher lifecycle errors
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Watcher is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Health check poller for {name} panicked: {reason}")]
    PollerFailed { name: String, reason: String },
}

// Implement From for common external error types
impl From<serde_json::Error> for ChaosError {
    fn from(err: serde_json::Error) -> Self {
        ChaosError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ChaosError {
    fn from(err: std::io::Error) -> Self {
        ChaosError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for ChaosError {
    fn from(err: reqwest::Error) -> Self {
        ChaosError::Metrics(err.to_string())
    }
}

impl From<config::ConfigError> for ChaosError {
    fn from(err: config::ConfigError) -> Self {
        ChaosError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for ChaosError {
    fn from(err: anyhow::Error) -> Self {
        ChaosError::Internal(err.to_string())
    }
}
