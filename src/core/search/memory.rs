//! In-Memory Search Backend
//!
//! A process-local [`SearchBackend`] used by tests and the CLI's `--memory`
//! mode. It follows the service contract (selectors, upsert by id, bulk
//! counts, not-found errors) without trying to reproduce real relevance
//! scoring: analyzers lower-case and split on whitespace (`keyword` keeps the
//! whole text), and fuzzy queries recall any term sharing the query's exact
//! prefix. The engine's matcher does the precise filtering afterwards.

use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use indexmap::IndexMap;

use super::client::SearchBackend;
use super::error::{Result, SearchError};
use super::models::{
    AnalyzedToken, BulkOp, BulkStats, CreateOutcome, Hit, IndexSpec, QueryKind, SearchQuery,
};

/// Analyzer that keeps its whole input as a single token
const VERBATIM_ANALYZER: &str = "keyword";

#[derive(Debug, Clone)]
struct MemoryIndex {
    spec: IndexSpec,
    docs: IndexMap<String, serde_json::Value>,
}

impl MemoryIndex {
    fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            docs: IndexMap::new(),
        }
    }

    fn analyzer(&self, field: &str) -> &str {
        self.spec.analyzer(field).unwrap_or("standard")
    }

    /// Terms stored for `field` of `doc` (string or array of strings)
    fn field_terms(&self, doc: &serde_json::Value, field: &str) -> Vec<String> {
        let analyzer = self.analyzer(field);
        match doc.get(field) {
            Some(serde_json::Value::String(s)) => terms(analyze_with(analyzer, s)),
            Some(serde_json::Value::Array(values)) => values
                .iter()
                .filter_map(|v| v.as_str())
                .flat_map(|s| terms(analyze_with(analyzer, s)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    indices: RwLock<BTreeMap<String, MemoryIndex>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creation-time spec of an index, if it exists
    pub fn index_spec(&self, index: &str) -> Option<IndexSpec> {
        self.read().get(index).map(|i| i.spec.clone())
    }

    /// Number of documents stored in `index` (0 if absent)
    pub fn document_count(&self, index: &str) -> usize {
        self.read().get(index).map(|i| i.docs.len()).unwrap_or(0)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, MemoryIndex>> {
        self.indices.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, MemoryIndex>> {
        self.indices.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Expand a selector into concrete index names. Missing explicit names
    /// fail; wildcards that match nothing contribute nothing.
    fn resolve(
        indices: &BTreeMap<String, MemoryIndex>,
        selector: &str,
        strict: bool,
    ) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for part in selector.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part.contains('*') {
                for name in indices.keys().filter(|n| wildcard_match(part, n)) {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
            } else if indices.contains_key(part) {
                if !names.iter().any(|n| n == part) {
                    names.push(part.to_string());
                }
            } else if strict {
                return Err(SearchError::IndexNotFound(part.to_string()));
            }
        }
        Ok(names)
    }
}

/// Whitespace + lower-case analysis, or a single verbatim token.
fn analyze_with(analyzer: &str, text: &str) -> Vec<AnalyzedToken> {
    if analyzer == VERBATIM_ANALYZER {
        if text.is_empty() {
            return Vec::new();
        }
        return vec![AnalyzedToken {
            term: text.to_string(),
            start: 0,
            end: text.len(),
        }];
    }

    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (idx, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push(AnalyzedToken {
                    term: text[s..idx].to_lowercase(),
                    start: s,
                    end: idx,
                });
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(AnalyzedToken {
            term: text[s..].to_lowercase(),
            start: s,
            end: text.len(),
        });
    }
    tokens
}

fn terms(tokens: Vec<AnalyzedToken>) -> Vec<String> {
    tokens.into_iter().map(|t| t.term).collect()
}

fn shares_prefix(a: &str, b: &str, prefix_length: usize) -> bool {
    a.chars().take(prefix_length).eq(b.chars().take(prefix_length))
}

/// `*` matches any run of characters; everything else is literal.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }

    let mut rest = name;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<bool> {
        Ok(true)
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        Ok(self.read().contains_key(index))
    }

    async fn create_index(&self, index: &str, spec: &IndexSpec) -> Result<CreateOutcome> {
        let mut indices = self.write();
        if indices.contains_key(index) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        indices.insert(index.to_string(), MemoryIndex::new(spec.clone()));
        Ok(CreateOutcome::Created)
    }

    async fn delete_index(&self, index: &str) -> Result<bool> {
        Ok(self.write().remove(index).is_some())
    }

    async fn list_indices(&self, pattern: &str) -> Result<Vec<String>> {
        Self::resolve(&self.read(), pattern, false)
    }

    async fn existing_ids(&self, index: &str, ids: &[String]) -> Result<HashSet<String>> {
        let indices = self.read();
        let idx = indices
            .get(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;
        Ok(ids
            .iter()
            .filter(|id| idx.docs.contains_key(id.as_str()))
            .cloned()
            .collect())
    }

    async fn bulk(&self, ops: Vec<BulkOp>, _refresh: bool) -> Result<BulkStats> {
        let mut indices = self.write();
        let mut stats = BulkStats::default();

        for op in ops {
            match op {
                BulkOp::Index { index, id, source } => {
                    // The service auto-creates unknown indices on write
                    let idx = indices
                        .entry(index)
                        .or_insert_with(|| MemoryIndex::new(IndexSpec::new(1, 0)));
                    idx.docs.insert(id, source);
                    stats.success += 1;
                }
                BulkOp::Delete { index, id } => {
                    let removed = indices
                        .get_mut(&index)
                        .and_then(|idx| idx.docs.shift_remove(&id))
                        .is_some();
                    if removed {
                        stats.success += 1;
                    } else {
                        stats.failed += 1;
                    }
                }
            }
        }

        Ok(stats)
    }

    async fn search(&self, selector: &str, query: &SearchQuery) -> Result<Vec<Hit>> {
        let indices = self.read();
        let names = Self::resolve(&indices, selector, true)?;

        let mut scored: Vec<(usize, Hit)> = Vec::new();
        for name in &names {
            let Some(idx) = indices.get(name) else {
                continue;
            };
            for (id, doc) in &idx.docs {
                let score = match &query.kind {
                    QueryKind::MatchAll => 1,
                    QueryKind::Match { field, text } => {
                        let wanted = terms(analyze_with(idx.analyzer(field), text));
                        let stored = idx.field_terms(doc, field);
                        wanted.iter().filter(|t| stored.contains(t)).count()
                    }
                    QueryKind::FuzzyMultiMatch {
                        text,
                        fields,
                        prefix_length,
                        ..
                    } => fields
                        .iter()
                        .map(|field| {
                            let wanted = terms(analyze_with(idx.analyzer(field), text));
                            let stored = idx.field_terms(doc, field);
                            wanted
                                .iter()
                                .filter(|q| {
                                    stored
                                        .iter()
                                        .any(|t| shares_prefix(q, t, *prefix_length as usize))
                                })
                                .count()
                        })
                        .sum(),
                };

                if score > 0 {
                    scored.push((
                        score,
                        Hit {
                            index: name.clone(),
                            id: id.clone(),
                            source: doc.clone(),
                        },
                    ));
                }
            }
        }

        // Stable: equal scores keep index/insertion order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(query.size)
            .map(|(_, hit)| hit)
            .collect())
    }

    async fn scan(&self, selector: &str) -> Result<Vec<Hit>> {
        let indices = self.read();
        let names = Self::resolve(&indices, selector, true)?;

        Ok(names
            .iter()
            .filter_map(|name| indices.get(name).map(|idx| (name, idx)))
            .flat_map(|(name, idx)| {
                idx.docs.iter().map(move |(id, doc)| Hit {
                    index: name.clone(),
                    id: id.clone(),
                    source: doc.clone(),
                })
            })
            .collect())
    }

    async fn analyze(&self, index: &str, field: &str, text: &str) -> Result<Vec<AnalyzedToken>> {
        let indices = self.read();
        let idx = indices
            .get(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))?;
        Ok(analyze_with(idx.analyzer(field), text))
    }
}
