//! Result and error types for apicov.

use crate::pattern::PatternError;
use thiserror::Error;

/// Result type for apicov operations
pub type CoverageResult<T> = Result<T, CoverageError>;

/// Errors that can occur while building coverage inputs
///
/// Unmatched observations are never errors: they become
/// [`SkipRecord`](crate::SkipRecord)s on the report instead.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// A path template could not be compiled
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// HAR document could not be parsed
    #[error("HAR parse error: {message}")]
    Har {
        /// Error message
        message: String,
    },

    /// Contract document could not be adapted into a contract tree
    #[error("Contract error at {location}: {message}")]
    Contract {
        /// JSON pointer or key path of the offending node
        location: String,
        /// Error message
        message: String,
    },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoverageError {
    /// Create a contract adaptation error
    #[must_use]
    pub fn contract(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Contract {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a HAR parse error
    #[must_use]
    pub fn har(message: impl Into<String>) -> Self {
        Self::Har {
            message: message.into(),
        }
    }
}
