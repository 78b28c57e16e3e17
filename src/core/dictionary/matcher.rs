//! Candidate Matching
//!
//! Decides whether a vocabulary entry recalled by the search service really
//! occurs in the text, and which n-gram of the text it occurs as.
//!
//! Broad matching tolerates edits scaled by the entry's length:
//!
//! ```text
//! chars   edits
//! 0..=3   0
//! 4..=5   1
//! 6..     2
//! ```
//!
//! and never considers an n-gram whose first two characters differ from the
//! entry's.

use super::models::MatchType;
use super::ngram::TokenSpan;

/// Leading characters an n-gram must share with a broad candidate
pub const PREFIX_CHARS: usize = 2;

/// Edits tolerated for a broad candidate of `char_len` characters.
pub fn edit_budget(char_len: usize) -> usize {
    match char_len {
        0..=3 => 0,
        4..=5 => 1,
        _ => 2,
    }
}

/// Whether the first [`PREFIX_CHARS`] characters of `a` and `b` agree.
pub fn shares_prefix(a: &str, b: &str) -> bool {
    a.chars().take(PREFIX_CHARS).eq(b.chars().take(PREFIX_CHARS))
}

/// The n-gram a vocabulary entry was accepted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate<'a> {
    pub span: &'a TokenSpan,
    pub distance: usize,
}

/// Find the n-gram `vocabulary` matches under `match_type`.
///
/// Broad matching picks the smallest distance; ties go to the earliest
/// n-gram.
pub fn find_match<'a>(
    vocabulary: &str,
    ngrams: &'a [TokenSpan],
    match_type: MatchType,
) -> Option<MatchCandidate<'a>> {
    if vocabulary.is_empty() {
        return None;
    }
    match match_type {
        MatchType::Exact => ngrams
            .iter()
            .find(|span| span.phrase == vocabulary)
            .map(|span| MatchCandidate { span, distance: 0 }),
        MatchType::Broad => find_broad(vocabulary, ngrams),
    }
}

fn find_broad<'a>(vocabulary: &str, ngrams: &'a [TokenSpan]) -> Option<MatchCandidate<'a>> {
    let budget = edit_budget(vocabulary.chars().count());
    let mut best: Option<MatchCandidate<'a>> = None;

    for span in ngrams {
        if !shares_prefix(vocabulary, &span.phrase) {
            continue;
        }
        let distance = if budget == 0 {
            if span.phrase != vocabulary {
                continue;
            }
            0
        } else {
            strsim::levenshtein(vocabulary, &span.phrase)
        };
        if distance > budget {
            continue;
        }
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(MatchCandidate { span, distance });
            if distance == 0 {
                break;
            }
        }
    }
    best
}
