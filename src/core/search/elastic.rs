//! Elasticsearch REST Client
//!
//! [`SearchBackend`] over the Elasticsearch HTTP API. One `reqwest::Client`
//! is shared by all callers; clone the `ElasticClient` freely.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::client::SearchBackend;
use super::error::{Result, SearchError};
use super::models::{AnalyzedToken, BulkOp, BulkStats, CreateOutcome, Hit, IndexSpec, SearchQuery};

/// How long a scroll cursor stays alive between pages
const SCROLL_KEEP_ALIVE: &str = "1m";
/// Documents fetched per scroll page
const SCROLL_BATCH_SIZE: usize = 500;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    index: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatIndex {
    index: String,
}

#[derive(Debug, Deserialize)]
struct MgetResponse {
    #[serde(default)]
    docs: Vec<MgetDoc>,
}

#[derive(Debug, Deserialize)]
struct MgetDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<std::collections::HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    status: u16,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: serde_json::Value,
}

impl From<RawHit> for Hit {
    fn from(raw: RawHit) -> Self {
        Hit {
            index: raw.index,
            id: raw.id,
            source: raw.source,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    tokens: Vec<RawToken>,
}

#[derive(Debug, Deserialize)]
struct RawToken {
    token: String,
    start_offset: usize,
    end_offset: usize,
}

/// Failure details parsed from a non-success response.
struct Failure {
    status: u16,
    kind: String,
    reason: String,
    index: Option<String>,
}

impl Failure {
    async fn read(resp: Response) -> Self {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(ErrorEnvelope { error: Some(err) }) => Failure {
                status,
                kind: err.kind,
                reason: err.reason,
                index: err.index,
            },
            _ => Failure {
                status,
                kind: String::new(),
                reason: body,
                index: None,
            },
        }
    }

    fn into_error(self, target: &str) -> SearchError {
        if self.status == StatusCode::NOT_FOUND.as_u16() && self.kind == "index_not_found_exception" {
            SearchError::IndexNotFound(self.index.unwrap_or_else(|| target.to_string()))
        } else {
            SearchError::Service {
                status: self.status,
                reason: if self.kind.is_empty() {
                    self.reason
                } else {
                    format!("{}: {}", self.kind, self.reason)
                },
            }
        }
    }
}

/// Convert an offset counted in UTF-16 code units (as the service reports
/// them) into a byte offset into `text`.
pub(crate) fn utf16_to_byte_offset(text: &str, utf16_offset: usize) -> usize {
    let mut units = 0;
    for (byte_idx, ch) in text.char_indices() {
        if units >= utf16_offset {
            return byte_idx;
        }
        units += ch.len_utf16();
    }
    text.len()
}

// ============================================================================
// Client
// ============================================================================

#[derive(Clone)]
pub struct ElasticClient {
    http: Client,
    base_url: String,
}

impl ElasticClient {
    /// Create a client for the service at `base_url` (e.g. `http://localhost:9200`).
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn scroll_page(&self, scroll_id: &str) -> Result<SearchResponse> {
        let resp = self
            .http
            .post(self.url("_search/scroll"))
            .json(&json!({ "scroll": SCROLL_KEEP_ALIVE, "scroll_id": scroll_id }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Failure::read(resp).await.into_error("_search/scroll"));
        }
        Ok(resp.json().await?)
    }

    async fn clear_scroll(&self, scroll_id: &str) {
        let result = self
            .http
            .delete(self.url("_search/scroll"))
            .json(&json!({ "scroll_id": [scroll_id] }))
            .send()
            .await;

        if let Err(e) = result {
            log::debug!("Failed to clear scroll cursor: {}", e);
        }
    }

    fn bulk_body(ops: &[BulkOp]) -> Result<String> {
        let mut body = String::new();
        for op in ops {
            match op {
                BulkOp::Index { index, id, source } => {
                    body.push_str(&serde_json::to_string(
                        &json!({ "index": { "_index": index, "_id": id } }),
                    )?);
                    body.push('\n');
                    body.push_str(&serde_json::to_string(source)?);
                    body.push('\n');
                }
                BulkOp::Delete { index, id } => {
                    body.push_str(&serde_json::to_string(
                        &json!({ "delete": { "_index": index, "_id": id } }),
                    )?);
                    body.push('\n');
                }
            }
        }
        Ok(body)
    }
}

#[async_trait]
impl SearchBackend for ElasticClient {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn ping(&self) -> Result<bool> {
        let resp = self.http.get(self.url("")).send().await?;
        Ok(resp.status().is_success())
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        let resp = self.http.head(self.url(index)).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Failure::read(resp).await.into_error(index)),
        }
    }

    async fn create_index(&self, index: &str, spec: &IndexSpec) -> Result<CreateOutcome> {
        let properties: serde_json::Map<String, serde_json::Value> = spec
            .fields
            .iter()
            .map(|(field, analyzer)| {
                (
                    field.clone(),
                    json!({ "type": "text", "analyzer": analyzer }),
                )
            })
            .collect();

        let body = json!({
            "settings": {
                "number_of_shards": spec.shards,
                "number_of_replicas": spec.replicas,
            },
            "mappings": { "properties": properties },
        });

        let resp = self.http.put(self.url(index)).json(&body).send().await?;
        if resp.status().is_success() {
            return Ok(CreateOutcome::Created);
        }

        let failure = Failure::read(resp).await;
        if failure.kind == "resource_already_exists_exception" {
            Ok(CreateOutcome::AlreadyExists)
        } else {
            Err(failure.into_error(index))
        }
    }

    async fn delete_index(&self, index: &str) -> Result<bool> {
        let resp = self.http.delete(self.url(index)).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Failure::read(resp).await.into_error(index)),
        }
    }

    async fn list_indices(&self, pattern: &str) -> Result<Vec<String>> {
        let resp = self
            .http
            .get(self.url(&format!("_cat/indices/{}", pattern)))
            .query(&[("format", "json"), ("h", "index")])
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {
                let rows: Vec<CatIndex> = resp.json().await?;
                Ok(rows.into_iter().map(|r| r.index).collect())
            }
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            _ => Err(Failure::read(resp).await.into_error(pattern)),
        }
    }

    async fn existing_ids(&self, index: &str, ids: &[String]) -> Result<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let resp = self
            .http
            .post(self.url(&format!("{}/_mget", index)))
            .query(&[("_source", "false")])
            .json(&json!({ "ids": ids }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Failure::read(resp).await.into_error(index));
        }

        let parsed: MgetResponse = resp.json().await?;
        Ok(parsed
            .docs
            .into_iter()
            .filter(|d| d.found)
            .map(|d| d.id)
            .collect())
    }

    async fn bulk(&self, ops: Vec<BulkOp>, refresh: bool) -> Result<BulkStats> {
        if ops.is_empty() {
            return Ok(BulkStats::default());
        }

        let body = Self::bulk_body(&ops)?;
        let resp = self
            .http
            .post(self.url("_bulk"))
            .query(&[("refresh", if refresh { "true" } else { "false" })])
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Failure::read(resp).await.into_error("_bulk"));
        }

        let parsed: BulkResponse = resp.json().await?;
        let success = parsed
            .items
            .iter()
            .flat_map(|item| item.values())
            .filter(|result| (200..300).contains(&result.status))
            .count();
        // Items the service never reported on count as failures.
        Ok(BulkStats::new(success, ops.len().saturating_sub(success)))
    }

    async fn search(&self, selector: &str, query: &SearchQuery) -> Result<Vec<Hit>> {
        let resp = self
            .http
            .post(self.url(&format!("{}/_search", selector)))
            .json(&query.to_body())
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Failure::read(resp).await.into_error(selector));
        }

        let parsed: SearchResponse = resp.json().await?;
        Ok(parsed.hits.hits.into_iter().map(Hit::from).collect())
    }

    async fn scan(&self, selector: &str) -> Result<Vec<Hit>> {
        let resp = self
            .http
            .post(self.url(&format!("{}/_search", selector)))
            .query(&[("scroll", SCROLL_KEEP_ALIVE)])
            .json(&json!({
                "size": SCROLL_BATCH_SIZE,
                "sort": ["_doc"],
                "query": { "match_all": {} },
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Failure::read(resp).await.into_error(selector));
        }

        let mut page: SearchResponse = resp.json().await?;
        let mut hits = Vec::new();
        let mut last_scroll_id = None;

        loop {
            if page.hits.hits.is_empty() {
                break;
            }
            hits.extend(std::mem::take(&mut page.hits.hits).into_iter().map(Hit::from));

            let Some(scroll_id) = page.scroll_id.take() else {
                break;
            };
            page = match self.scroll_page(&scroll_id).await {
                Ok(next) => next,
                Err(e) => {
                    self.clear_scroll(&scroll_id).await;
                    return Err(e);
                }
            };
            last_scroll_id = Some(scroll_id);
        }

        if let Some(id) = page.scroll_id.or(last_scroll_id) {
            self.clear_scroll(&id).await;
        }

        log::debug!("Scanned {} documents from '{}'", hits.len(), selector);
        Ok(hits)
    }

    async fn analyze(&self, index: &str, field: &str, text: &str) -> Result<Vec<AnalyzedToken>> {
        let resp = self
            .http
            .post(self.url(&format!("{}/_analyze", index)))
            .json(&json!({ "field": field, "text": text }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Failure::read(resp).await.into_error(index));
        }

        let parsed: AnalyzeResponse = resp.json().await?;
        Ok(parsed
            .tokens
            .into_iter()
            .map(|t| AnalyzedToken {
                term: t.token,
                start: utf16_to_byte_offset(text, t.start_offset),
                end: utf16_to_byte_offset(text, t.end_offset),
            })
            .collect())
    }
}
