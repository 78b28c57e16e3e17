//! Property-based tests for n-gram generation

use proptest::prelude::*;

use crate::core::dictionary::{ngrams, span_ngrams};
use crate::core::search::AnalyzedToken;

/// Tokens with byte offsets as a whitespace analyzer would report them.
fn analyzed(words: &[String]) -> (String, Vec<AnalyzedToken>) {
    let text = words.join(" ");
    let mut tokens = Vec::new();
    let mut offset = 0;
    for word in words {
        tokens.push(AnalyzedToken {
            term: word.clone(),
            start: offset,
            end: offset + word.len(),
        });
        offset += word.len() + 1;
    }
    (text, tokens)
}

proptest! {
    #[test]
    fn prop_distinct_tokens_give_all_windows(n in 0usize..8) {
        let tokens: Vec<String> = (0..n).map(|i| format!("t{}", i)).collect();
        let grams = ngrams(&tokens, n, 1);
        prop_assert_eq!(grams.len(), n * (n + 1) / 2);
    }

    #[test]
    fn prop_ngrams_occur_in_text(words in prop::collection::vec("[a-c]{1,3}", 0..8)) {
        let text = format!(" {} ", words.join(" "));
        for gram in ngrams(&words, words.len(), 1) {
            let needle = format!(" {} ", gram);
            prop_assert!(text.contains(&needle));
        }
    }

    #[test]
    fn prop_min_len_is_respected(
        words in prop::collection::vec("[a-z]{1,4}", 0..8),
        min_len in 1usize..4,
    ) {
        for gram in ngrams(&words, words.len(), min_len) {
            prop_assert!(gram.split(' ').count() >= min_len);
        }
    }

    #[test]
    fn prop_span_surface_equals_phrase(words in prop::collection::vec("[a-z]{1,5}", 1..7)) {
        let (text, tokens) = analyzed(&words);
        let spans = span_ngrams(&tokens, tokens.len(), 1);
        let expected: Vec<String> = ngrams(&words, words.len(), 1).into_iter().collect();

        prop_assert_eq!(spans.len(), expected.len());
        for (span, phrase) in spans.iter().zip(expected.iter()) {
            prop_assert_eq!(&span.phrase, phrase);
            prop_assert_eq!(span.surface(&text), phrase.as_str());
        }
    }
}
