//! Core Error Types
//!
//! Defines the foundational error types used across the Ponder workspace.
//! These error types are dependency-free (only thiserror + serde_json) to keep
//! the core crate lightweight.
//!
//! The llm and patches crates define their own richer error enums for
//! transport-level failures; this one covers validation and (de)serialization
//! at the contract boundary.

use thiserror::Error;

/// Core error type for the Ponder workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::validation("questions out of range");
        assert_eq!(err.to_string(), "Validation error: questions out of range");
    }

    #[test]
    fn test_error_conversion() {
        let err = CoreError::validation("questions out of range");
        let msg: String = err.into();
        assert!(msg.contains("Validation error"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let core_err: CoreError = parse_err.into();
        assert!(matches!(core_err, CoreError::Serialization(_)));
    }
}
