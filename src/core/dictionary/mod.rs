//! Dictionary Tagging Module
//!
//! Stores vocabulary per (dictionary, language) in a search service and tags
//! free text by replacing the vocabulary it contains with `[dictionary]`.
//!
//! ## Architecture
//!
//! ```text
//! tag(["orange hotel in chicago"], dics = [city, color], english)
//!        │
//!        ▼
//! ┌──────────────────────────────┐
//! │  1. Resolve indexes          │  → dictionary-city-english,
//! │     (namespace)              │    dictionary-color-english
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │  2. Per text (sequential or  │  order-preserving worker pool
//! │     parallel)                │
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │  3. Recall candidates        │  exact: match on voc
//! │     (search service)         │  broad: fuzzy on voc + ngrams
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │  4. Match + replace          │  "chicago" → [city]
//! │     (matcher, tagger)        │  "orange"  → [color]
//! └──────────────┬───────────────┘
//!                ▼
//!   "[color] hotel in [city]"   city: 1, color: 1
//! ```

pub mod engine;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod models;
pub mod namespace;
pub mod ngram;
pub mod normalize;
pub mod tagger;

// Re-export primary types
pub use engine::{Dictionary, EngineSettings, SearchDictionary};
pub use error::{DictionaryError, Result};
pub use matcher::{edit_budget, find_match, shares_prefix, MatchCandidate};
pub use models::{
    DicRemoval, MatchType, MatchedTerm, TagCount, TagResult, VocEntry, VocListing, NGRAMS_FIELD,
    VOC_FIELD,
};
pub use namespace::{canonical_name, canonical_names, IndexNamespace, IndexSelector};
pub use ngram::{ngrams, span_ngrams, stored_ngrams, TokenSpan};
pub use normalize::{normalize, tokenize};

/// Vocabulary write statistics (documents succeeded / failed)
pub use crate::core::search::BulkStats;
