//! N-gram Generation
//!
//! Contiguous token windows of a phrase. Used twice: the sub-phrases
//! (length >= 2) stored next to each vocabulary entry for fuzzy recall, and
//! every sub-phrase of an input text as the pool a candidate must match.

use indexmap::IndexSet;

use crate::core::search::AnalyzedToken;

use super::normalize::tokenize;

/// Shortest n-gram stored alongside a vocabulary entry
pub const STORED_MIN_LEN: usize = 2;

/// Every window of `min_len..=max_len` consecutive tokens, joined with a
/// single space. Shorter windows come first, then by offset; duplicates
/// keep their first position.
pub fn ngrams<S: AsRef<str>>(tokens: &[S], max_len: usize, min_len: usize) -> IndexSet<String> {
    let mut out = IndexSet::new();
    let upper = max_len.min(tokens.len());
    for len in min_len.max(1)..=upper {
        for window in tokens.windows(len) {
            let phrase = window
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(" ");
            out.insert(phrase);
        }
    }
    out
}

/// Sub-phrases stored with a vocabulary entry for multi-field fuzzy recall.
pub fn stored_ngrams(phrase: &str) -> Vec<String> {
    let tokens = tokenize(phrase);
    ngrams(&tokens, tokens.len(), STORED_MIN_LEN)
        .into_iter()
        .collect()
}

/// An n-gram of analyzed tokens that remembers where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpan {
    /// Analyzed terms joined with a single space
    pub phrase: String,
    /// Byte range in the analyzed text
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    /// The original text covered by this span. Falls back to the phrase if
    /// the offsets don't fit `text`.
    pub fn surface<'a>(&'a self, text: &'a str) -> &'a str {
        text.get(self.start..self.end).unwrap_or(&self.phrase)
    }
}

/// Same windows as [`ngrams`], over analyzer tokens, keeping the text span
/// of each. Repeated phrases keep their first occurrence.
pub fn span_ngrams(tokens: &[AnalyzedToken], max_len: usize, min_len: usize) -> Vec<TokenSpan> {
    let mut seen: IndexSet<String> = IndexSet::new();
    let mut spans = Vec::new();
    let upper = max_len.min(tokens.len());

    for len in min_len.max(1)..=upper {
        for window in tokens.windows(len) {
            let phrase = window
                .iter()
                .map(|t| t.term.as_str())
                .collect::<Vec<&str>>()
                .join(" ");
            if !seen.insert(phrase.clone()) {
                continue;
            }
            spans.push(TokenSpan {
                phrase,
                start: window[0].start,
                end: window[len - 1].end,
            });
        }
    }
    spans
}
