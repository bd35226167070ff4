//! Error types for the harness

use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while building, running or persisting tests
#[derive(Error, Debug)]
pub enum EvalError {
    /// Failed to load a dataset or result file
    #[error("Failed to load file: {0}")]
    LoadError(String),

    /// Failed to parse a dataset or fixture
    #[error("Failed to parse: {0}")]
    ParseError(String),

    /// Test case execution failed
    #[error("Test case execution failed: {0}")]
    ExecutionError(String),

    /// Agent or team error during a test
    #[error("Agent error: {0}")]
    AgentError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A test exceeded its time budget
    #[error("Timed out after {0:.2}s")]
    TimeoutError(f64),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Scoring error
    #[error("Scoring error: {0}")]
    ScoringError(String),
}

impl From<aqa_core::AqaError> for EvalError {
    fn from(err: aqa_core::AqaError) -> Self {
        match err {
            aqa_core::AqaError::Timeout(secs) => EvalError::TimeoutError(secs),
            other => EvalError::AgentError(other.to_string()),
        }
    }
}
