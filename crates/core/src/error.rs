//! Core Error Types
//!
//! Foundational error types shared by the engine crates. Kept dependency-light
//! (thiserror + serde_json) so the reconcile and pacing crates can use them
//! without pulling in transport or HTTP stacks.

use thiserror::Error;

/// Core error type for the case review workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Inbound JSON that does not match any known shape
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Well-formed input that violates an engine rule
    #[error("Validation error: {0}")]
    Validation(String),

    /// Decoded input that is missing what an event needs
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
