//! Dictionary Engine
//!
//! The [`Dictionary`] trait is the whole public surface: load and unload
//! vocabulary, list it, drop dictionaries, and tag texts. [`SearchDictionary`]
//! implements it over any [`SearchBackend`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::core::context::CallContext;
use crate::core::parallel;
use crate::core::search::{BulkStats, SearchBackend};

use super::error::{require_items, Result};
use super::models::{DicRemoval, MatchType, TagResult, VocListing};
use super::namespace::{canonical_name, canonical_names, IndexNamespace};

/// Operations on per-language vocabulary dictionaries.
///
/// Every call carries a [`CallContext`]; cancelling it or letting its
/// deadline pass aborts the call with an interruption error.
#[async_trait]
pub trait Dictionary: Send + Sync {
    /// Add vocabulary to `dic`, creating the dictionary if needed. Entries
    /// already present are skipped.
    async fn add_voc(
        &self,
        ctx: &CallContext,
        vocs: &[String],
        dic: &str,
        lang: &str,
    ) -> Result<BulkStats>;

    /// Vocabulary of the given dictionaries, or of all dictionaries of
    /// `lang` when `dics` is empty.
    async fn get_voc(&self, ctx: &CallContext, dics: &[String], lang: &str)
        -> Result<Vec<VocListing>>;

    /// Drop whole dictionaries. One outcome per requested name.
    async fn remove_dic(
        &self,
        ctx: &CallContext,
        dics: &[String],
        lang: &str,
    ) -> Result<Vec<DicRemoval>>;

    /// Delete individual entries from `dic`. Absent entries are ignored.
    async fn remove_voc(
        &self,
        ctx: &CallContext,
        dic: &str,
        vocs: &[String],
        lang: &str,
    ) -> Result<BulkStats>;

    /// Replace vocabulary occurring in each text with `[dic]` and count the
    /// replacements. Output order follows `texts`.
    async fn tag(
        &self,
        ctx: &CallContext,
        texts: &[String],
        dics: &[String],
        lang: &str,
        match_type: MatchType,
    ) -> Result<Vec<TagResult>>;
}

/// Tunables of the engine, usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub candidate_limit: usize,
    pub parallel_threshold: usize,
    pub workers: usize,
    pub bulk_chunk_size: usize,
    pub settle_delay: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            candidate_limit: config.tagging.candidate_limit,
            parallel_threshold: config.tagging.parallel_threshold,
            workers: config
                .tagging
                .workers
                .unwrap_or_else(parallel::default_workers),
            bulk_chunk_size: config.loader.bulk_chunk_size,
            settle_delay: config.search.settle_delay(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// [`Dictionary`] backed by a search service. Cheap to clone; clones share
/// the backend.
#[derive(Clone)]
pub struct SearchDictionary {
    pub(crate) backend: Arc<dyn SearchBackend>,
    pub(crate) namespace: Arc<IndexNamespace>,
    pub(crate) settings: Arc<EngineSettings>,
}

impl SearchDictionary {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        namespace: IndexNamespace,
        settings: EngineSettings,
    ) -> Self {
        Self {
            backend,
            namespace: Arc::new(namespace),
            settings: Arc::new(settings),
        }
    }

    pub fn from_config(backend: Arc<dyn SearchBackend>, config: &AppConfig) -> Self {
        Self::new(
            backend,
            IndexNamespace::from_config(config),
            EngineSettings::from_config(config),
        )
    }

    pub fn namespace(&self) -> &IndexNamespace {
        &self.namespace
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Languages with a dedicated analyzer. Others still work, with the
    /// fallback analyzer.
    pub fn supported_languages(&self) -> Vec<String> {
        self.namespace.supported_languages()
    }

    /// Whether the search service answers.
    pub async fn health(&self, ctx: &CallContext) -> bool {
        match ctx.run(self.backend.ping()).await {
            Ok(up) => up,
            Err(e) => {
                log::warn!("{} health check failed: {}", self.backend.name(), e);
                false
            }
        }
    }
}

// Names are canonicalized here so that every operation addresses the same
// index for the same dictionary, whatever case the caller used.
#[async_trait]
impl Dictionary for SearchDictionary {
    async fn add_voc(
        &self,
        ctx: &CallContext,
        vocs: &[String],
        dic: &str,
        lang: &str,
    ) -> Result<BulkStats> {
        let dic = canonical_name(dic, "dic")?;
        let lang = canonical_name(lang, "lang")?;
        require_items(vocs, "vocs")?;
        self.load_vocabulary(ctx, vocs, &dic, &lang).await
    }

    async fn get_voc(
        &self,
        ctx: &CallContext,
        dics: &[String],
        lang: &str,
    ) -> Result<Vec<VocListing>> {
        let lang = canonical_name(lang, "lang")?;
        let dics = canonical_names(dics, "dic")?;
        self.list_vocabulary(ctx, &dics, &lang).await
    }

    async fn remove_dic(
        &self,
        ctx: &CallContext,
        dics: &[String],
        lang: &str,
    ) -> Result<Vec<DicRemoval>> {
        let lang = canonical_name(lang, "lang")?;
        require_items(dics, "dics")?;
        let dics = canonical_names(dics, "dic")?;
        self.drop_dictionaries(ctx, &dics, &lang).await
    }

    async fn remove_voc(
        &self,
        ctx: &CallContext,
        dic: &str,
        vocs: &[String],
        lang: &str,
    ) -> Result<BulkStats> {
        let dic = canonical_name(dic, "dic")?;
        let lang = canonical_name(lang, "lang")?;
        require_items(vocs, "vocs")?;
        self.unload_vocabulary(ctx, &dic, vocs, &lang).await
    }

    async fn tag(
        &self,
        ctx: &CallContext,
        texts: &[String],
        dics: &[String],
        lang: &str,
        match_type: MatchType,
    ) -> Result<Vec<TagResult>> {
        let lang = canonical_name(lang, "lang")?;
        require_items(texts, "texts")?;
        let dics = canonical_names(dics, "dic")?;
        self.tag_texts(ctx, texts, &dics, &lang, match_type).await
    }
}
