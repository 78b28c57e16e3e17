//! Property-based tests for text normalization

use proptest::prelude::*;

use crate::core::dictionary::{normalize, tokenize};

fn messy_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            "[a-zA-Z]{1,8}",
            Just(" ".to_string()),
            Just("\t".to_string()),
            Just("\n".to_string()),
            Just("  ".to_string()),
        ],
        0..20,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn prop_normalize_is_idempotent(text in messy_text()) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn prop_normalized_whitespace_is_single_spaces(text in messy_text()) {
        let norm = normalize(&text);
        prop_assert!(!norm.starts_with(' '));
        prop_assert!(!norm.ends_with(' '));
        prop_assert!(!norm.contains("  "));
        prop_assert!(!norm.contains('\t'));
        prop_assert!(!norm.contains('\n'));
    }

    #[test]
    fn prop_tokens_rejoin_to_normalized(text in messy_text()) {
        let tokens = tokenize(&text);
        prop_assert!(tokens.iter().all(|t| !t.is_empty()));
        prop_assert_eq!(tokens.join(" "), normalize(&text));
    }

    #[test]
    fn prop_normalize_is_case_insensitive(text in "[a-zA-Z ]{0,40}") {
        prop_assert_eq!(normalize(&text.to_uppercase()), normalize(&text));
    }
}
