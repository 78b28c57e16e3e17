//! Dictionary Records
//!
//! Plain data passed in and out of the dictionary engine. Nothing here knows
//! about the search service's wire format.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::search::BulkOp;

use super::error::{DictionaryError, Result};
use super::namespace::IndexSelector;
use super::ngram::stored_ngrams;
use super::tagger::PhraseCache;

/// Field holding the vocabulary text
pub const VOC_FIELD: &str = "voc";
/// Field holding the vocabulary's sub-phrases
pub const NGRAMS_FIELD: &str = "ngrams";

/// How strictly a recalled vocabulary entry must match the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// The entry must equal some n-gram of the text
    Exact,
    /// Small edit distances are tolerated
    #[default]
    Broad,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Broad => "broad",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = DictionaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(MatchType::Exact),
            "broad" => Ok(MatchType::Broad),
            other => Err(DictionaryError::InvalidInput(format!(
                "unknown match type '{}' (expected 'exact' or 'broad')",
                other
            ))),
        }
    }
}

/// One vocabulary phrase belonging to one dictionary and language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocEntry {
    /// Normalized phrase; also the document id
    pub voc: String,
    pub dic: String,
    pub lang: String,
}

impl VocEntry {
    pub fn new(voc: impl Into<String>, dic: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            voc: voc.into(),
            dic: dic.into(),
            lang: lang.into(),
        }
    }

    pub(crate) fn document(&self) -> VocDocument {
        VocDocument {
            voc: self.voc.clone(),
            ngrams: stored_ngrams(&self.voc),
        }
    }

    pub(crate) fn index_op(&self, index: &str) -> Result<BulkOp> {
        Ok(BulkOp::Index {
            index: index.to_string(),
            id: self.voc.clone(),
            source: serde_json::to_value(self.document())?,
        })
    }
}

/// Stored shape of a vocabulary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct VocDocument {
    pub voc: String,
    #[serde(default)]
    pub ngrams: Vec<String>,
}

/// A replaced span and the vocabulary entry that claimed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchedTerm {
    /// Text as it appeared in the normalized input
    pub surface: String,
    pub vocabulary: String,
}

/// Per-dictionary tally for one tagged text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub count: usize,
    /// Distinct matches, in acceptance order
    pub matches: Vec<MatchedTerm>,
}

impl TagCount {
    pub(crate) fn record(&mut self, surface: &str, vocabulary: &str) {
        self.count += 1;
        let term = MatchedTerm {
            surface: surface.to_string(),
            vocabulary: vocabulary.to_string(),
        };
        if !self.matches.contains(&term) {
            self.matches.push(term);
        }
    }
}

/// Outcome of tagging one input text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagResult {
    /// Normalized text with every accepted span replaced by `[dic]`
    pub norm_text: String,
    pub tag: IndexMap<String, TagCount>,
}

impl TagResult {
    /// The text as-is, with a zero count for every requested dictionary.
    pub fn untagged(norm_text: String, dics: &[String]) -> Self {
        let tag = dics
            .iter()
            .map(|dic| (dic.clone(), TagCount::default()))
            .collect();
        Self { norm_text, tag }
    }

    /// Replacements made for `dic`, 0 if none.
    pub fn count(&self, dic: &str) -> usize {
        self.tag.get(dic).map_or(0, |t| t.count)
    }
}

/// Vocabulary currently stored in one dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocListing {
    pub dic: String,
    pub num_voc: usize,
    pub vocs: Vec<String>,
}

/// Outcome of removing one dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DicRemoval {
    pub dic: String,
    pub error: bool,
    pub message: String,
}

/// Everything a worker needs to tag one text independently.
#[derive(Debug, Clone)]
pub(crate) struct TagTask {
    pub text: String,
    pub lang: String,
    pub dics: Arc<Vec<String>>,
    pub selector: Arc<IndexSelector>,
    pub match_type: MatchType,
    /// Analyzed vocabulary phrases, shared by every text of one call
    pub phrases: Arc<PhraseCache>,
}
