//! Dictionary Error Types

use thiserror::Error;

use crate::core::search::SearchError;

/// Errors surfaced by dictionary operations
#[derive(Error, Debug)]
pub enum DictionaryError {
    /// A required argument was empty
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl DictionaryError {
    /// The caller cancelled the request or its deadline passed.
    pub fn is_interruption(&self) -> bool {
        matches!(self, DictionaryError::Search(e) if e.is_interruption())
    }
}

impl From<serde_json::Error> for DictionaryError {
    fn from(e: serde_json::Error) -> Self {
        DictionaryError::Search(SearchError::Serialization(e))
    }
}

/// Result type alias for dictionary operations
pub type Result<T> = std::result::Result<T, DictionaryError>;

/// Reject an empty required list before touching the search service.
pub(crate) fn require_items<T>(items: &[T], name: &str) -> Result<()> {
    if items.is_empty() {
        return Err(DictionaryError::InvalidInput(format!("{} is empty", name)));
    }
    Ok(())
}
