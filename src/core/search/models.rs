//! Search Service Models
//!
//! Request and response shapes exchanged with the search service. None of
//! these types cross the dictionary engine's public boundary.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Index Administration
// ============================================================================

/// Settings and field mapping used when creating an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub shards: u32,
    pub replicas: u32,
    /// Text field name → analyzer name
    pub fields: IndexMap<String, String>,
}

impl IndexSpec {
    pub fn new(shards: u32, replicas: u32) -> Self {
        Self {
            shards,
            replicas,
            fields: IndexMap::new(),
        }
    }

    /// Map a text field to `analyzer`.
    pub fn field(mut self, name: &str, analyzer: &str) -> Self {
        self.fields.insert(name.to_string(), analyzer.to_string());
        self
    }

    /// Analyzer assigned to `field`, if the field is mapped.
    pub fn analyzer(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Outcome of an index creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// Someone else created it first; not an error.
    AlreadyExists,
}

// ============================================================================
// Documents & Bulk Operations
// ============================================================================

/// A single bulk write action.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOp {
    /// Upsert `source` under the explicit identifier `id`
    Index {
        index: String,
        id: String,
        source: serde_json::Value,
    },
    Delete {
        index: String,
        id: String,
    },
}

impl BulkOp {
    pub fn index_name(&self) -> &str {
        match self {
            BulkOp::Index { index, .. } | BulkOp::Delete { index, .. } => index,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            BulkOp::Index { id, .. } | BulkOp::Delete { id, .. } => id,
        }
    }
}

/// Success/failure counts reported by a bulk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkStats {
    pub success: usize,
    pub failed: usize,
}

impl BulkStats {
    pub fn new(success: usize, failed: usize) -> Self {
        Self { success, failed }
    }

    /// Every action of a batch failed (e.g. the whole request was rejected).
    pub fn all_failed(count: usize) -> Self {
        Self {
            success: 0,
            failed: count,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failed
    }
}

impl std::ops::Add for BulkStats {
    type Output = BulkStats;

    fn add(self, other: BulkStats) -> BulkStats {
        BulkStats {
            success: self.success + other.success,
            failed: self.failed + other.failed,
        }
    }
}

impl std::iter::Sum for BulkStats {
    fn sum<I: Iterator<Item = BulkStats>>(iter: I) -> Self {
        iter.fold(BulkStats::default(), |acc, s| acc + s)
    }
}

// ============================================================================
// Queries & Hits
// ============================================================================

/// Query kinds the dictionary engine issues.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    MatchAll,
    /// Analyzed match of `text` against a single field
    Match { field: String, text: String },
    /// Fuzzy match of `text` against several fields
    FuzzyMultiMatch {
        text: String,
        fields: Vec<String>,
        fuzziness: String,
        prefix_length: u32,
        max_expansions: u32,
    },
}

/// A query plus the number of hits wanted.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub kind: QueryKind,
    pub size: usize,
}

impl SearchQuery {
    pub fn match_all(size: usize) -> Self {
        Self {
            kind: QueryKind::MatchAll,
            size,
        }
    }

    pub fn matching(field: &str, text: &str, size: usize) -> Self {
        Self {
            kind: QueryKind::Match {
                field: field.to_string(),
                text: text.to_string(),
            },
            size,
        }
    }

    /// Fuzzy multi-field query with automatic fuzziness, a 3-character
    /// exact prefix and at most 5 term expansions.
    pub fn fuzzy(text: &str, fields: &[&str], size: usize) -> Self {
        Self {
            kind: QueryKind::FuzzyMultiMatch {
                text: text.to_string(),
                fields: fields.iter().map(|f| f.to_string()).collect(),
                fuzziness: "AUTO".to_string(),
                prefix_length: 3,
                max_expansions: 5,
            },
            size,
        }
    }

    /// Request body in the search service's query DSL.
    pub fn to_body(&self) -> serde_json::Value {
        let query = match &self.kind {
            QueryKind::MatchAll => serde_json::json!({ "match_all": {} }),
            QueryKind::Match { field, text } => serde_json::json!({
                "match": { field.as_str(): text }
            }),
            QueryKind::FuzzyMultiMatch {
                text,
                fields,
                fuzziness,
                prefix_length,
                max_expansions,
            } => serde_json::json!({
                "multi_match": {
                    "query": text,
                    "fields": fields,
                    "fuzziness": fuzziness,
                    "prefix_length": prefix_length,
                    "max_expansions": max_expansions,
                }
            }),
        };

        serde_json::json!({ "query": query, "size": self.size })
    }
}

/// A document returned by search or scan, tagged with its physical index.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub index: String,
    pub id: String,
    pub source: serde_json::Value,
}

/// One analyzer token. Offsets are byte positions in the analyzed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    pub term: String,
    pub start: usize,
    pub end: usize,
}
