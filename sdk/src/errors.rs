//! Error types and handling
//!
//! This module provides the error taxonomy shared by the Axon engine and every
//! collaborator adapter. All errors implement the `TutorErrorExt` trait which
//! provides user-friendly hints and indicates whether errors are recoverable.
//!
//! # Propagation
//!
//! - `NotFound` and `UnsupportedInput` are reported to the caller as-is.
//! - `Upstream` raised by an optional step (one document's context lookup)
//!   is swallowed and the step treated as producing nothing.
//! - `Upstream` raised by the selected answer strategy aborts the request and
//!   is folded into a single `Processing` error.
//! - `Configuration` for a strategy causes fallback to the next strategy,
//!   unless the caller asked for that strategy alone.

use thiserror::Error;

/// Result type used across collaborator traits
pub type Result<T> = std::result::Result<T, TutorError>;

/// Trait for Axon error extensions
///
/// Provides a hint that is safe to show to a student and whether retrying the
/// same request can succeed.
pub trait TutorErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    fn is_recoverable(&self) -> bool;
}

/// Main tutor error type
///
/// # Examples
///
/// ```
/// use axon_sdk::errors::{TutorError, TutorErrorExt};
///
/// let error = TutorError::NotFound("File notes.txt".to_string());
/// assert!(error.is_recoverable());
/// println!("Hint: {}", error.user_hint());
///
/// let missing_key = TutorError::Configuration("TAVILY_API_KEY not set".to_string());
/// assert!(!missing_key.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum TutorError {
    /// A credential or setting required by a component is missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unknown conversation or document on a lookup/deletion path
    #[error("{0} not found")]
    NotFound(String),

    /// A collaborator call failed or returned a non-success status
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// Unrecognized document format, malformed audio and the like
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// The request could not be completed; carries the underlying cause
    #[error("Error processing request: {0}")]
    Processing(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TutorError {
    /// Build an upstream failure from any displayable cause
    pub fn upstream(cause: impl std::fmt::Display) -> Self {
        Self::Upstream(cause.to_string())
    }

    /// Fold this error into the uniform request-level failure.
    ///
    /// Errors that are already `Processing` pass through unchanged so the
    /// cause is not wrapped twice.
    pub fn into_processing(self) -> Self {
        match self {
            Self::Processing(_) => self,
            other => Self::Processing(other.to_string()),
        }
    }
}

impl TutorErrorExt for TutorError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Configuration(_) => "A required setting or API key is missing. Check config.toml and environment",
            Self::NotFound(_) => "The requested conversation or file does not exist",
            Self::Upstream(_) => "An external service failed. Try again shortly",
            Self::UnsupportedInput(_) => "This file or audio format is not supported",
            Self::Processing(_) => "The tutor could not answer this question. Try again",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_processing_wraps_cause() {
        let err = TutorError::Upstream("HTTP 502".to_string()).into_processing();
        match err {
            TutorError::Processing(msg) => assert!(msg.contains("HTTP 502")),
            other => panic!("Expected Processing, got {:?}", other),
        }
    }

    #[test]
    fn test_into_processing_is_idempotent() {
        let err = TutorError::Processing("boom".to_string()).into_processing();
        assert_eq!(err.to_string(), "Error processing request: boom");
    }

    #[test]
    fn test_recoverability() {
        assert!(!TutorError::Configuration("x".into()).is_recoverable());
        assert!(TutorError::NotFound("x".into()).is_recoverable());
        assert!(TutorError::Upstream("x".into()).is_recoverable());
    }

    #[test]
    fn test_not_found_message() {
        let err = TutorError::NotFound("Conversation conv_9".to_string());
        assert_eq!(err.to_string(), "Conversation conv_9 not found");
    }
}
