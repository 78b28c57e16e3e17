//! Index Naming
//!
//! Each (dictionary, language) pair lives in its own index named
//! `{prefix}-{dic}-{lang}`. This module owns that convention, the field
//! layout of a new index, and turning a request's dictionary list into an
//! index selector.

use std::fmt;

use indexmap::IndexSet;

use crate::config::AppConfig;
use crate::core::context::CallContext;
use crate::core::search::{CreateOutcome, IndexSpec};

use super::engine::SearchDictionary;
use super::error::{DictionaryError, Result};
use super::models::{NGRAMS_FIELD, VOC_FIELD};

/// Characters the search service refuses in index names.
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ':'];

/// A dictionary or language name as it appears inside index names: trimmed
/// and lower-cased. Names the search service cannot hold are rejected.
pub fn canonical_name(value: &str, what: &str) -> Result<String> {
    let name = value.trim().to_lowercase();
    if name.is_empty() {
        return Err(DictionaryError::InvalidInput(format!("{} is empty", what)));
    }
    if name.starts_with(['-', '_', '+'])
        || name.contains(FORBIDDEN_CHARS)
        || name.contains(char::is_whitespace)
    {
        return Err(DictionaryError::InvalidInput(format!(
            "{} '{}' cannot be used in an index name",
            what, value
        )));
    }
    Ok(name)
}

/// [`canonical_name`] over a list of dictionaries.
pub fn canonical_names(values: &[String], what: &str) -> Result<Vec<String>> {
    values.iter().map(|v| canonical_name(v, what)).collect()
}

/// Naming and layout rules for dictionary indexes.
#[derive(Debug, Clone)]
pub struct IndexNamespace {
    prefix: String,
    languages: IndexSet<String>,
    fallback_analyzer: String,
    verbatim_analyzer: String,
    shards: u32,
    replicas: u32,
}

impl IndexNamespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::from_config(&AppConfig::default()).with_prefix(prefix)
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            prefix: config.search.index_prefix.clone(),
            languages: config.languages.supported.iter().cloned().collect(),
            fallback_analyzer: config.languages.fallback_analyzer.clone(),
            verbatim_analyzer: config.languages.verbatim_analyzer.clone(),
            shards: config.search.shards,
            replicas: config.search.replicas,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn index_name_for(&self, dic: &str, lang: &str) -> String {
        format!("{}-{}-{}", self.prefix, dic, lang)
    }

    /// Pattern matching every dictionary of `lang`.
    pub fn wildcard_for(&self, lang: &str) -> String {
        format!("{}-*-{}", self.prefix, lang)
    }

    /// Recover the dictionary name from an index of `lang`.
    pub fn dictionary_of(&self, index: &str, lang: &str) -> Option<String> {
        let dic = index
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix('-')?
            .strip_suffix(lang)?
            .strip_suffix('-')?;
        if dic.is_empty() {
            return None;
        }
        Some(dic.to_string())
    }

    pub fn is_supported(&self, lang: &str) -> bool {
        self.languages.contains(lang)
    }

    pub fn supported_languages(&self) -> Vec<String> {
        self.languages.iter().cloned().collect()
    }

    /// Analyzer for the `voc` field: the language's own, or the fallback.
    pub fn analyzer_for(&self, lang: &str) -> &str {
        match self.languages.get(lang) {
            Some(lang) => lang.as_str(),
            None => self.fallback_analyzer.as_str(),
        }
    }

    /// Layout of a new dictionary index for `lang`.
    pub fn index_spec(&self, lang: &str) -> IndexSpec {
        IndexSpec::new(self.shards, self.replicas)
            .field(VOC_FIELD, self.analyzer_for(lang))
            .field(NGRAMS_FIELD, &self.verbatim_analyzer)
    }
}

/// Which indexes a request reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSelector {
    /// None of the requested dictionaries exist
    Empty,
    /// Explicit, existing indexes
    Indices(Vec<String>),
    /// Every dictionary of one language
    Wildcard(String),
}

impl IndexSelector {
    pub fn is_empty(&self) -> bool {
        match self {
            IndexSelector::Empty => true,
            IndexSelector::Indices(names) => names.is_empty(),
            IndexSelector::Wildcard(_) => false,
        }
    }

    /// The index, when the selector names exactly one.
    pub fn single_index(&self) -> Option<&str> {
        match self {
            IndexSelector::Indices(names) if names.len() == 1 => Some(names[0].as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for IndexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexSelector::Empty => Ok(()),
            IndexSelector::Indices(names) => f.write_str(&names.join(",")),
            IndexSelector::Wildcard(pattern) => f.write_str(pattern),
        }
    }
}

impl SearchDictionary {
    /// Map requested dictionaries to the indexes that exist for them. No
    /// dictionaries means all of them.
    pub(crate) async fn resolve_indices(
        &self,
        ctx: &CallContext,
        dics: &[String],
        lang: &str,
    ) -> Result<IndexSelector> {
        let wildcard = self.namespace.wildcard_for(lang);
        if dics.is_empty() {
            return Ok(IndexSelector::Wildcard(wildcard));
        }

        let existing: IndexSet<String> = ctx
            .run(self.backend.list_indices(&wildcard))
            .await?
            .into_iter()
            .collect();

        let requested: IndexSet<String> = dics
            .iter()
            .map(|dic| self.namespace.index_name_for(dic, lang))
            .collect();
        let found: Vec<String> = requested
            .into_iter()
            .filter(|index| existing.contains(index))
            .collect();

        if found.is_empty() {
            log::info!("No dictionaries exist for {:?} ({})", dics, lang);
            return Ok(IndexSelector::Empty);
        }
        log::debug!("Resolved {:?} ({}) to {:?}", dics, lang, found);
        Ok(IndexSelector::Indices(found))
    }

    /// Create the index for `dic`/`lang` if it is missing. Returns whether it
    /// was created by this call.
    pub(crate) async fn ensure_index(&self, ctx: &CallContext, dic: &str, lang: &str) -> Result<bool> {
        let index = self.namespace.index_name_for(dic, lang);
        if ctx.run(self.backend.index_exists(&index)).await? {
            return Ok(false);
        }

        if !self.namespace.is_supported(lang) {
            log::warn!(
                "Language '{}' has no dedicated analyzer; '{}' will use '{}'",
                lang,
                index,
                self.namespace.analyzer_for(lang)
            );
        }

        let spec = self.namespace.index_spec(lang);
        match ctx.run(self.backend.create_index(&index, &spec)).await? {
            CreateOutcome::Created => {
                log::info!("Created index '{}'", index);
                ctx.sleep(self.settings.settle_delay).await?;
                Ok(true)
            }
            CreateOutcome::AlreadyExists => {
                log::debug!("Index '{}' was created concurrently", index);
                Ok(false)
            }
        }
    }
}
