//! Search Client Contract
//!
//! The operations the dictionary engine needs from an inverted-index search
//! service. Implementations must be safe to share between worker tasks;
//! connection pooling is their own concern.

use std::collections::HashSet;

use async_trait::async_trait;

use super::error::Result;
use super::models::{AnalyzedToken, BulkOp, BulkStats, CreateOutcome, Hit, IndexSpec, SearchQuery};

/// Backend for dictionary storage and candidate retrieval.
///
/// `selector` arguments accept a single index name, a comma-separated list
/// of names, or a wildcard pattern.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short identifier used in log lines
    fn name(&self) -> &'static str;

    /// Check the service is reachable
    async fn ping(&self) -> Result<bool>;

    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Create an index; an already existing index is reported, not an error.
    async fn create_index(&self, index: &str, spec: &IndexSpec) -> Result<CreateOutcome>;

    /// Delete an index. Returns `false` if it did not exist.
    async fn delete_index(&self, index: &str) -> Result<bool>;

    /// Names of existing indices matching `pattern`
    async fn list_indices(&self, pattern: &str) -> Result<Vec<String>>;

    /// Subset of `ids` that exist as document identifiers in `index`
    async fn existing_ids(&self, index: &str, ids: &[String]) -> Result<HashSet<String>>;

    /// Apply a batch of writes. Per-document failures are counted, not raised.
    async fn bulk(&self, ops: Vec<BulkOp>, refresh: bool) -> Result<BulkStats>;

    async fn search(&self, selector: &str, query: &SearchQuery) -> Result<Vec<Hit>>;

    /// Every document behind `selector`, however many there are
    async fn scan(&self, selector: &str) -> Result<Vec<Hit>>;

    /// Run `text` through the analyzer mapped to `field` in `index`
    async fn analyze(&self, index: &str, field: &str, text: &str) -> Result<Vec<AnalyzedToken>>;
}
