//! Text Normalization
//!
//! Vocabulary and input texts are compared only in normalized form: runs of
//! whitespace collapsed to one space, trimmed, lower-cased.

/// Canonical form of `text`. Idempotent.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalized tokens of `text`, in order. Never yields empty tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
