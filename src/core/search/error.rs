//! Search Error Types
//!
//! Error handling for the search-service client module.

use thiserror::Error;

/// Search operation errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Search service error ({status}): {reason}")]
    Service { status: u16, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl SearchError {
    /// The service reported a missing index (or none of a selector's indices exist).
    pub fn is_not_found(&self) -> bool {
        matches!(self, SearchError::IndexNotFound(_))
    }

    /// The caller gave up on the operation; these abort a whole request
    /// instead of degrading a single item.
    pub fn is_interruption(&self) -> bool {
        matches!(self, SearchError::Cancelled | SearchError::DeadlineExceeded)
    }
}

/// Result type alias for search operations
pub type Result<T> = std::result::Result<T, SearchError>;
