//! Vocabulary Loading
//!
//! Writes and deletes vocabulary documents. Each entry is stored under its
//! normalized text as document id, so re-adding is an upsert and the
//! existence check before a write is a plain id lookup.

use std::collections::HashSet;

use futures::future::join_all;
use indexmap::{IndexMap, IndexSet};
use tracing::instrument;

use crate::core::context::CallContext;
use crate::core::search::{self, BulkOp, BulkStats};

use super::engine::SearchDictionary;
use super::error::Result;
use super::models::{DicRemoval, VocDocument, VocEntry, VocListing};
use super::normalize::normalize;

/// Normalized, distinct, non-empty phrases in input order.
fn normalized_set(vocs: &[String]) -> IndexSet<String> {
    vocs.iter()
        .map(|v| normalize(v))
        .filter(|v| !v.is_empty())
        .collect()
}

impl SearchDictionary {
    #[instrument(skip(self, ctx, vocs), fields(count = vocs.len()))]
    pub(crate) async fn load_vocabulary(
        &self,
        ctx: &CallContext,
        vocs: &[String],
        dic: &str,
        lang: &str,
    ) -> Result<BulkStats> {
        let index = self.namespace.index_name_for(dic, lang);
        log::info!("Adding {} vocabularies to '{}'", vocs.len(), index);

        let created = self.ensure_index(ctx, dic, lang).await?;
        let mut phrases = normalized_set(vocs);

        // A fresh index holds nothing to compare against
        if !created && !phrases.is_empty() {
            let ids: Vec<String> = phrases.iter().cloned().collect();
            let existing = match ctx.run(self.backend.existing_ids(&index, &ids)).await {
                Ok(existing) => existing,
                Err(e) if e.is_not_found() => HashSet::new(),
                Err(e) => return Err(e.into()),
            };
            phrases.retain(|p| !existing.contains(p));
        }

        if phrases.is_empty() {
            log::info!("Nothing new to add to '{}'", index);
            return Ok(BulkStats::default());
        }

        let ops = phrases
            .into_iter()
            .map(|voc| VocEntry::new(voc, dic, lang).index_op(&index))
            .collect::<Result<Vec<BulkOp>>>()?;

        let stats = self.bulk_write(ctx, ops).await?;
        log::info!(
            "Index '{}' Success/Fail: {}/{}",
            index,
            stats.success,
            stats.failed
        );
        Ok(stats)
    }

    pub(crate) async fn unload_vocabulary(
        &self,
        ctx: &CallContext,
        dic: &str,
        vocs: &[String],
        lang: &str,
    ) -> Result<BulkStats> {
        let index = self.namespace.index_name_for(dic, lang);
        let phrases = normalized_set(vocs);
        if phrases.is_empty() {
            return Ok(BulkStats::default());
        }

        let ids: Vec<String> = phrases.iter().cloned().collect();
        let existing = match ctx.run(self.backend.existing_ids(&index, &ids)).await {
            Ok(existing) => existing,
            Err(e) if e.is_not_found() => {
                log::info!("Index '{}' does not exist; nothing to remove", index);
                return Ok(BulkStats::default());
            }
            Err(e) => return Err(e.into()),
        };

        let ops: Vec<BulkOp> = phrases
            .into_iter()
            .filter(|p| existing.contains(p))
            .map(|id| BulkOp::Delete {
                index: index.clone(),
                id,
            })
            .collect();
        if ops.is_empty() {
            return Ok(BulkStats::default());
        }

        let stats = self.bulk_write(ctx, ops).await?;
        log::info!(
            "Delete from '{}' Success/Fail: {}/{}",
            index,
            stats.success,
            stats.failed
        );
        Ok(stats)
    }

    pub(crate) async fn drop_dictionaries(
        &self,
        ctx: &CallContext,
        dics: &[String],
        lang: &str,
    ) -> Result<Vec<DicRemoval>> {
        let mut outcomes = Vec::with_capacity(dics.len());

        for dic in dics {
            let index = self.namespace.index_name_for(dic, lang);
            let (error, message) = match ctx.run(self.backend.delete_index(&index)).await {
                Ok(true) => {
                    log::info!("Deleted index '{}'", index);
                    (false, format!("dictionary '{}' ({}) removed", dic, lang))
                }
                Ok(false) => (
                    true,
                    format!("dictionary '{}' does not exist for language '{}'", dic, lang),
                ),
                Err(e) if e.is_interruption() => return Err(e.into()),
                Err(e) => {
                    log::warn!("Failed to delete index '{}': {}", index, e);
                    (true, format!("failed to remove dictionary '{}': {}", dic, e))
                }
            };
            outcomes.push(DicRemoval {
                dic: dic.clone(),
                error,
                message,
            });
        }
        Ok(outcomes)
    }

    pub(crate) async fn list_vocabulary(
        &self,
        ctx: &CallContext,
        dics: &[String],
        lang: &str,
    ) -> Result<Vec<VocListing>> {
        let selector = self.resolve_indices(ctx, dics, lang).await?;
        if selector.is_empty() {
            return Ok(Vec::new());
        }

        let hits = match ctx.run(self.backend.scan(&selector.to_string())).await {
            Ok(hits) => hits,
            Err(e) if e.is_interruption() => return Err(e.into()),
            Err(e) => {
                log::warn!("Failed to scan '{}': {}", selector, e);
                return Ok(Vec::new());
            }
        };

        let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
        for hit in hits {
            let Some(dic) = self.namespace.dictionary_of(&hit.index, lang) else {
                log::debug!("Skipping document from foreign index '{}'", hit.index);
                continue;
            };
            let voc = serde_json::from_value::<VocDocument>(hit.source)
                .map(|doc| doc.voc)
                .unwrap_or(hit.id);
            grouped.entry(dic).or_default().push(voc);
        }

        Ok(grouped
            .into_iter()
            .map(|(dic, vocs)| VocListing {
                dic,
                num_voc: vocs.len(),
                vocs,
            })
            .collect())
    }

    /// Send `ops` in chunks of at most `bulk_chunk_size`, concurrently.
    async fn bulk_write(&self, ctx: &CallContext, ops: Vec<BulkOp>) -> Result<BulkStats> {
        let chunk_size = self.settings.bulk_chunk_size.max(1);
        if ops.len() <= chunk_size {
            return Ok(self.write_chunk(ctx, ops).await?);
        }

        let chunks: Vec<Vec<BulkOp>> = ops.chunks(chunk_size).map(<[BulkOp]>::to_vec).collect();
        log::info!("Writing {} documents in {} chunks", ops.len(), chunks.len());

        let results = join_all(chunks.into_iter().map(|chunk| self.write_chunk(ctx, chunk))).await;
        let stats: BulkStats = results
            .into_iter()
            .collect::<search::Result<Vec<BulkStats>>>()?
            .into_iter()
            .sum();
        Ok(stats)
    }

    /// One bulk request. A failed request counts every op in it as failed.
    async fn write_chunk(&self, ctx: &CallContext, chunk: Vec<BulkOp>) -> search::Result<BulkStats> {
        let count = chunk.len();
        match ctx.run(self.backend.bulk(chunk, true)).await {
            Ok(stats) => Ok(stats),
            Err(e) if e.is_interruption() => Err(e),
            Err(e) => {
                log::warn!("Bulk request of {} documents failed: {}", count, e);
                Ok(BulkStats::all_failed(count))
            }
        }
    }
}
