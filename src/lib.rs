//! dictag - Dictionary Tagging over a Search Service
//!
//! Core library storing per-language vocabulary dictionaries in an
//! Elasticsearch-compatible index and tagging free text against them.

pub mod config;
pub mod core;


pub use crate::core::context::CallContext;
pub use crate::core::dictionary::{Dictionary, MatchType, SearchDictionary, TagResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
