//! Search Service Module
//!
//! The contract the dictionary engine expects from an inverted-index search
//! service, plus two implementations:
//! - `elastic`: Elasticsearch over HTTP (production)
//! - `memory`: process-local store (tests, offline use)

pub mod client;
pub mod elastic;
pub mod error;
pub mod memory;
pub mod models;

pub use client::SearchBackend;
pub use elastic::ElasticClient;
pub use error::{Result, SearchError};
pub use memory::MemoryBackend;
pub use models::{
    AnalyzedToken, BulkOp, BulkStats, CreateOutcome, Hit, IndexSpec, QueryKind, SearchQuery,
};
