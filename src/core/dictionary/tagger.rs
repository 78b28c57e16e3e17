//! Text Tagging
//!
//! For every input text:
//!
//! ```text
//!  text ──normalize──▶ norm ──search──▶ candidates (vocabulary hits)
//!                       │                    │
//!                       ▼                    ▼
//!                analyze + n-grams ──▶ matcher ──▶ replace span with [dic]
//! ```
//!
//! Candidates are folded over the normalized text one by one. A candidate is
//! only accepted while its span is still present in the text being
//! rewritten, so two overlapping vocabulary entries never both claim the
//! same words. Claimed spans hold opaque placeholders until the fold ends,
//! so a later entry cannot match the text of an earlier `[dic]` label.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use indexmap::{IndexMap, IndexSet};
use regex::{NoExpand, Regex};
use tracing::instrument;

use crate::core::context::CallContext;
use crate::core::parallel;
use crate::core::search::{self, Hit, SearchQuery};

use super::engine::SearchDictionary;
use super::error::Result;
use super::matcher;
use super::models::{
    MatchType, TagCount, TagResult, TagTask, VocDocument, NGRAMS_FIELD, VOC_FIELD,
};
use super::ngram::{span_ngrams, TokenSpan};
use super::normalize::normalize;

impl SearchDictionary {
    #[instrument(skip(self, ctx, texts), fields(count = texts.len()))]
    pub(crate) async fn tag_texts(
        &self,
        ctx: &CallContext,
        texts: &[String],
        dics: &[String],
        lang: &str,
        match_type: MatchType,
    ) -> Result<Vec<TagResult>> {
        let selector = self.resolve_indices(ctx, dics, lang).await?;
        if selector.is_empty() {
            return Ok(Vec::new());
        }

        let selector = Arc::new(selector);
        let dics = Arc::new(dics.to_vec());
        let phrases = Arc::new(PhraseCache::default());
        let tasks: Vec<TagTask> = texts
            .iter()
            .map(|text| TagTask {
                text: text.clone(),
                lang: lang.to_string(),
                dics: dics.clone(),
                selector: selector.clone(),
                match_type,
                phrases: phrases.clone(),
            })
            .collect();

        if tasks.len() < self.settings.parallel_threshold {
            let mut results = Vec::with_capacity(tasks.len());
            for task in tasks {
                results.push(self.tag_one(ctx, task).await?);
            }
            return Ok(results);
        }

        log::debug!(
            "Tagging {} texts with {} workers",
            tasks.len(),
            self.settings.workers
        );
        let engine = self.clone();
        let task_ctx = ctx.clone();
        let outcomes = parallel::ordered_map(tasks, self.settings.workers, move |task| {
            let engine = engine.clone();
            let ctx = task_ctx.clone();
            async move { engine.tag_one(&ctx, task).await }
        })
        .await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (outcome, text) in outcomes.into_iter().zip(texts) {
            match outcome {
                Ok(tagged) => results.push(tagged?),
                Err(e) => {
                    log::error!("Tagging task panicked for '{}': {}", text, e);
                    results.push(TagResult::untagged(normalize(text), &dics));
                }
            }
        }
        Ok(results)
    }

    /// Tag one text. Only interruptions are returned as errors; any other
    /// failure leaves the text untagged.
    async fn tag_one(&self, ctx: &CallContext, task: TagTask) -> search::Result<TagResult> {
        let norm = normalize(&task.text);
        if norm.is_empty() {
            return Ok(TagResult::untagged(norm, &task.dics));
        }

        let hits = match self.fetch_candidates(ctx, &task, &norm).await {
            Ok(hits) => hits,
            Err(e) if e.is_interruption() => return Err(e),
            Err(e) => {
                log::warn!("Candidate search failed for '{}': {}", norm, e);
                Vec::new()
            }
        };

        let mut tagged = LabelledText::new(norm.clone());
        let mut tags: IndexMap<String, TagCount> = IndexMap::new();
        let mut text_spans: Option<Vec<TokenSpan>> = None;

        for hit in hits {
            let Some(dic) = self.namespace.dictionary_of(&hit.index, &task.lang) else {
                log::debug!("Ignoring hit from foreign index '{}'", hit.index);
                continue;
            };
            let doc: VocDocument = match serde_json::from_value(hit.source.clone()) {
                Ok(doc) => doc,
                Err(e) => {
                    log::debug!("Malformed document '{}' in '{}': {}", hit.id, hit.index, e);
                    continue;
                }
            };

            if text_spans.is_none() {
                let index = task.selector.single_index().unwrap_or(&hit.index);
                match self.analyzed_ngrams(ctx, index, &norm).await {
                    Ok(spans) => text_spans = Some(spans),
                    Err(e) if e.is_interruption() => return Err(e),
                    Err(e) => {
                        log::warn!("Failed to analyze '{}' with '{}': {}", norm, index, e);
                        break;
                    }
                }
            }
            let spans = text_spans.as_deref().unwrap_or_default();

            let analyzed = self
                .analyzed_phrase(ctx, &task.phrases, &hit, &doc.voc)
                .await;
            let vocabulary = match analyzed {
                Ok(phrase) => phrase,
                Err(e) if e.is_interruption() => return Err(e),
                Err(e) => {
                    log::debug!("Failed to analyze '{}': {}", doc.voc, e);
                    continue;
                }
            };

            let Some(candidate) = matcher::find_match(&vocabulary, spans, task.match_type) else {
                continue;
            };
            let surface = candidate.span.surface(&norm);
            if !tagged.claim(surface, &dic) {
                // Already claimed by an earlier candidate
                continue;
            }
            tags.entry(dic).or_default().record(surface, &doc.voc);
        }

        for dic in task.dics.iter() {
            tags.entry(dic.clone()).or_default();
        }
        Ok(TagResult {
            norm_text: tagged.render(),
            tag: tags,
        })
    }

    async fn fetch_candidates(
        &self,
        ctx: &CallContext,
        task: &TagTask,
        norm: &str,
    ) -> search::Result<Vec<Hit>> {
        let limit = self.settings.candidate_limit;
        let query = match task.match_type {
            MatchType::Exact => SearchQuery::matching(VOC_FIELD, norm, limit),
            MatchType::Broad => SearchQuery::fuzzy(norm, &[VOC_FIELD, NGRAMS_FIELD], limit),
        };
        ctx.run(self.backend.search(&task.selector.to_string(), &query))
            .await
    }

    /// Every n-gram of `text` as the index's `voc` analyzer sees it.
    async fn analyzed_ngrams(
        &self,
        ctx: &CallContext,
        index: &str,
        text: &str,
    ) -> search::Result<Vec<TokenSpan>> {
        let tokens = ctx
            .run(self.backend.analyze(index, VOC_FIELD, text))
            .await?;
        Ok(span_ngrams(&tokens, tokens.len(), 1))
    }

    /// A stored vocabulary entry as the analyzer of its own index sees it.
    async fn analyzed_phrase(
        &self,
        ctx: &CallContext,
        cache: &PhraseCache,
        hit: &Hit,
        voc: &str,
    ) -> search::Result<String> {
        if let Some(phrase) = cache.get(&hit.index, voc) {
            return Ok(phrase);
        }
        let tokens = ctx
            .run(self.backend.analyze(&hit.index, VOC_FIELD, voc))
            .await?;
        let phrase = if tokens.is_empty() {
            voc.to_string()
        } else {
            tokens
                .iter()
                .map(|t| t.term.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        };
        cache.insert(&hit.index, voc, &phrase);
        Ok(phrase)
    }
}

/// Analyzed form of stored phrases, keyed by (index, phrase).
#[derive(Debug, Default)]
pub(crate) struct PhraseCache {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl PhraseCache {
    fn get(&self, index: &str, voc: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(&(index.to_string(), voc.to_string())).cloned()
    }

    fn insert(&self, index: &str, voc: &str, phrase: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert((index.to_string(), voc.to_string()), phrase.to_string());
        }
    }
}

const LABEL_OPEN: char = '\u{E000}';
const LABEL_CLOSE: char = '\u{E001}';
const LABEL_DIGITS: [char; 10] = [
    '\u{E010}', '\u{E011}', '\u{E012}', '\u{E013}', '\u{E014}',
    '\u{E015}', '\u{E016}', '\u{E017}', '\u{E018}', '\u{E019}',
];

/// Stand-in for the label in `slot`. Built from private-use characters only,
/// none of which are word characters.
fn placeholder(slot: usize) -> String {
    let mut out = String::new();
    out.push(LABEL_OPEN);
    for digit in slot.to_string().bytes() {
        out.push(LABEL_DIGITS[usize::from(digit - b'0')]);
    }
    out.push(LABEL_CLOSE);
    out
}

/// The text being rewritten during one fold.
struct LabelledText {
    text: String,
    labels: IndexSet<String>,
}

impl LabelledText {
    fn new(text: String) -> Self {
        Self {
            text,
            labels: IndexSet::new(),
        }
    }

    /// Replace `surface` with the label of `dic`. False when `surface` no
    /// longer occurs outside earlier labels.
    fn claim(&mut self, surface: &str, dic: &str) -> bool {
        let slot = self.labels.get_index_of(dic).unwrap_or(self.labels.len());
        let Some(rewritten) = replace_span(&self.text, surface, &placeholder(slot)) else {
            return false;
        };
        self.labels.insert(dic.to_string());
        self.text = rewritten;
        true
    }

    fn render(self) -> String {
        let mut text = self.text;
        for (slot, dic) in self.labels.iter().enumerate() {
            text = text.replace(&placeholder(slot), &format!("[{}]", dic));
        }
        text
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case-insensitive pattern for `surface`, anchored at word boundaries on
/// whichever ends are word characters.
fn span_pattern(surface: &str) -> Option<Regex> {
    let first = surface.chars().next()?;
    let last = surface.chars().last()?;
    let pattern = format!(
        "(?i){}{}{}",
        if is_word_char(first) { r"\b" } else { "" },
        regex::escape(surface),
        if is_word_char(last) { r"\b" } else { "" },
    );
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::debug!("Cannot build pattern for '{}': {}", surface, e);
            None
        }
    }
}

/// Replace every occurrence of `surface` in `text` with `replacement`, taken
/// literally. `None` when `surface` no longer occurs.
pub(crate) fn replace_span(text: &str, surface: &str, replacement: &str) -> Option<String> {
    let re = span_pattern(surface)?;
    if !re.is_match(text) {
        return None;
    }
    Some(re.replace_all(text, NoExpand(replacement)).into_owned())
}
