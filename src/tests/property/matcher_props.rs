//! Property-based tests for candidate matching

use proptest::prelude::*;

use crate::core::dictionary::{edit_budget, find_match, shares_prefix, MatchType, TokenSpan};

fn span(phrase: &str) -> TokenSpan {
    TokenSpan {
        phrase: phrase.to_string(),
        start: 0,
        end: phrase.len(),
    }
}

proptest! {
    #[test]
    fn prop_phrase_matches_itself(voc in "[a-z]{1,6}( [a-z]{1,6}){0,2}") {
        let grams = vec![span(&voc)];
        for policy in [MatchType::Exact, MatchType::Broad] {
            let hit = find_match(&voc, &grams, policy);
            prop_assert!(hit.is_some());
            prop_assert_eq!(hit.unwrap().distance, 0);
        }
    }

    #[test]
    fn prop_exact_implies_broad(
        voc in "[a-d]{1,8}",
        phrases in prop::collection::vec("[a-d]{1,8}", 0..10),
    ) {
        let grams: Vec<TokenSpan> = phrases.iter().map(|p| span(p)).collect();
        if find_match(&voc, &grams, MatchType::Exact).is_some() {
            prop_assert!(find_match(&voc, &grams, MatchType::Broad).is_some());
        }
    }

    #[test]
    fn prop_broad_stays_within_budget(
        voc in "[a-c]{1,9}",
        phrases in prop::collection::vec("[a-c]{1,9}", 0..12),
    ) {
        let grams: Vec<TokenSpan> = phrases.iter().map(|p| span(p)).collect();
        if let Some(hit) = find_match(&voc, &grams, MatchType::Broad) {
            prop_assert!(hit.distance <= edit_budget(voc.chars().count()));
            prop_assert!(shares_prefix(&voc, &hit.span.phrase));
            prop_assert_eq!(hit.distance, strsim::levenshtein(&voc, &hit.span.phrase));
        }
    }

    #[test]
    fn prop_budget_is_monotonic(len in 0usize..64) {
        prop_assert!(edit_budget(len) <= edit_budget(len + 1));
        prop_assert!(edit_budget(len) <= 2);
    }
}
