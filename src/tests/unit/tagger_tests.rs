//! Tagging Tests
//!
//! tag() end to end over the in-memory store: both match policies, span
//! consumption, zero-filled counts, parallel order, worker failure and
//! cancellation.

use std::sync::Arc;

use crate::core::context::CallContext;
use crate::core::dictionary::{Dictionary, DictionaryError, MatchType, MatchedTerm};
use crate::tests::common::{engine_with, memory_engine, seed_city_and_color, strings};
use crate::tests::mocks::{MockSearchBackend, PanickingBackend, PANIC_MARKER};

#[tokio::test]
async fn test_exact_tagging() {
    let (_, engine) = memory_engine();
    seed_city_and_color(&engine).await;
    let ctx = CallContext::background();

    let texts = strings(&[
        "orange hotel in chicago",
        "a beautiful blue sky green",
        "blue sky in beijing",
    ]);
    let results = engine
        .tag(&ctx, &texts, &strings(&["city", "color"]), "english", MatchType::Exact)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].norm_text, "[color] hotel in [city]");
    assert_eq!(results[0].count("city"), 1);
    assert_eq!(results[0].count("color"), 1);

    assert_eq!(results[1].norm_text, "a beautiful [color] sky [color]");
    assert_eq!(results[1].count("city"), 0);
    assert_eq!(results[1].count("color"), 2);

    assert_eq!(results[2].norm_text, "[color] sky in [city]");
    assert_eq!(results[2].count("city"), 1);
    assert_eq!(results[2].count("color"), 1);
}

#[tokio::test]
async fn test_text_is_normalized_before_tagging() {
    let (_, engine) = memory_engine();
    seed_city_and_color(&engine).await;
    let ctx = CallContext::background();

    let results = engine
        .tag(
            &ctx,
            &strings(&["  Hotel   in NEW   York "]),
            &strings(&["city"]),
            "english",
            MatchType::Exact,
        )
        .await
        .unwrap();

    assert_eq!(results[0].norm_text, "hotel in [city]");
    assert_eq!(
        results[0].tag["city"].matches,
        vec![MatchedTerm {
            surface: "new york".to_string(),
            vocabulary: "new york".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_broad_tolerates_misspelling() {
    let (_, engine) = memory_engine();
    seed_city_and_color(&engine).await;
    let ctx = CallContext::background();
    let texts = strings(&["hotel in newyork", "hotel in neu york", "hotel in newyoork"]);

    let broad = engine
        .tag(&ctx, &texts, &strings(&["city"]), "english", MatchType::Broad)
        .await
        .unwrap();
    for result in &broad {
        assert_eq!(result.norm_text, "hotel in [city]");
        assert_eq!(result.count("city"), 1);
    }
    assert_eq!(broad[0].tag["city"].matches[0].surface, "newyork");
    assert_eq!(broad[0].tag["city"].matches[0].vocabulary, "new york");

    let exact = engine
        .tag(&ctx, &texts[..1], &strings(&["city"]), "english", MatchType::Exact)
        .await
        .unwrap();
    assert_eq!(exact[0].norm_text, "hotel in newyork");
    assert_eq!(exact[0].count("city"), 0);
}

#[tokio::test]
async fn test_broad_respects_length_tiers() {
    let (_, engine) = memory_engine();
    let ctx = CallContext::background();
    engine
        .add_voc(&ctx, &strings(&["red", "blue", "chicago"]), "thing", "english")
        .await
        .unwrap();

    let texts = strings(&[
        "rex car",       // 3 chars: no edits allowed
        "blux car",      // 4 chars: one edit
        "bluxx car",     // 4 chars: two edits is too many
        "chicaxx car",   // 7 chars: two edits
        "chicxxx car",   // 7 chars: three edits is too many
    ]);
    let results = engine
        .tag(&ctx, &texts, &strings(&["thing"]), "english", MatchType::Broad)
        .await
        .unwrap();

    let counts: Vec<usize> = results.iter().map(|r| r.count("thing")).collect();
    assert_eq!(counts, vec![0, 1, 0, 1, 0]);
    assert_eq!(results[1].norm_text, "[thing] car");
    assert_eq!(results[3].norm_text, "[thing] car");
}

#[tokio::test]
async fn test_consumed_span_is_not_claimed_twice() {
    let (_, engine) = memory_engine();
    let ctx = CallContext::background();
    engine
        .add_voc(&ctx, &strings(&["new york"]), "city", "english")
        .await
        .unwrap();
    engine
        .add_voc(&ctx, &strings(&["york"]), "place", "english")
        .await
        .unwrap();

    let results = engine
        .tag(
            &ctx,
            &strings(&["hotel in new york"]),
            &strings(&["city", "place"]),
            "english",
            MatchType::Exact,
        )
        .await
        .unwrap();

    // "new york" shares two terms with the text and is recalled first
    assert_eq!(results[0].norm_text, "hotel in [city]");
    assert_eq!(results[0].count("city"), 1);
    assert_eq!(results[0].count("place"), 0);
}

#[tokio::test]
async fn test_labels_are_not_tagged_again() {
    let (_, engine) = memory_engine();
    let ctx = CallContext::background();
    engine
        .add_voc(&ctx, &strings(&["blue"]), "color", "english")
        .await
        .unwrap();
    // An entry spelled like another dictionary's name
    engine
        .add_voc(&ctx, &strings(&["color"]), "tone", "english")
        .await
        .unwrap();

    let results = engine
        .tag(
            &ctx,
            &strings(&["blue color"]),
            &strings(&["color", "tone"]),
            "english",
            MatchType::Exact,
        )
        .await
        .unwrap();

    assert_eq!(results[0].norm_text, "[color] [tone]");
    assert_eq!(results[0].count("color"), 1);
    assert_eq!(results[0].count("tone"), 1);
}

#[tokio::test]
async fn test_all_dictionaries_when_none_requested() {
    let (_, engine) = memory_engine();
    seed_city_and_color(&engine).await;
    let ctx = CallContext::background();

    let results = engine
        .tag(&ctx, &strings(&["green chicago"]), &[], "english", MatchType::Exact)
        .await
        .unwrap();

    assert_eq!(results[0].norm_text, "[color] [city]");
    assert_eq!(results[0].tag.len(), 2);
}

#[tokio::test]
async fn test_requested_dictionaries_are_zero_filled() {
    let (_, engine) = memory_engine();
    seed_city_and_color(&engine).await;
    let ctx = CallContext::background();

    let results = engine
        .tag(
            &ctx,
            &strings(&["nothing to see"]),
            &strings(&["city", "color"]),
            "english",
            MatchType::Broad,
        )
        .await
        .unwrap();

    assert_eq!(results[0].norm_text, "nothing to see");
    assert_eq!(results[0].count("city"), 0);
    assert_eq!(results[0].count("color"), 0);
    assert_eq!(results[0].tag.len(), 2);
}

#[tokio::test]
async fn test_unknown_dictionaries_yield_empty_output() {
    let (_, engine) = memory_engine();
    seed_city_and_color(&engine).await;
    let ctx = CallContext::background();

    let results = engine
        .tag(&ctx, &strings(&["blue sky"]), &strings(&["planet"]), "english", MatchType::Exact)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_empty_texts_are_rejected() {
    // No backend expectations: validation must fail before any call
    let engine = engine_with(Arc::new(MockSearchBackend::new()));
    let ctx = CallContext::background();

    let result = engine
        .tag(&ctx, &[], &strings(&["color"]), "english", MatchType::Exact)
        .await;
    assert!(matches!(result, Err(DictionaryError::InvalidInput(_))));
}

#[tokio::test]
async fn test_dictionary_names_match_case_insensitively() {
    let (_, engine) = memory_engine();
    seed_city_and_color(&engine).await;
    let ctx = CallContext::background();

    let results = engine
        .tag(
            &ctx,
            &strings(&["blue sky"]),
            &strings(&["Color", "CITY"]),
            "English",
            MatchType::Exact,
        )
        .await
        .unwrap();

    assert_eq!(results[0].norm_text, "[color] sky");
    assert_eq!(results[0].count("color"), 1);
    assert_eq!(results[0].count("city"), 0);
}

#[tokio::test]
async fn test_parallel_batch_preserves_order() {
    let (_, engine) = memory_engine();
    seed_city_and_color(&engine).await;
    let ctx = CallContext::background();

    let texts: Vec<String> = (0..40)
        .map(|i| match i % 3 {
            0 => format!("item {} blue", i),
            1 => format!("item {} in chicago", i),
            _ => format!("item {} plain", i),
        })
        .collect();

    let results = engine
        .tag(&ctx, &texts, &strings(&["city", "color"]), "english", MatchType::Exact)
        .await
        .unwrap();

    assert_eq!(results.len(), texts.len());
    for (i, result) in results.iter().enumerate() {
        let expected = match i % 3 {
            0 => format!("item {} [color]", i),
            1 => format!("item {} in [city]", i),
            _ => format!("item {} plain", i),
        };
        assert_eq!(result.norm_text, expected);
    }
}

#[tokio::test]
async fn test_panicking_worker_leaves_text_untagged() {
    let backend = Arc::new(PanickingBackend::default());
    let engine = engine_with(backend.clone());
    seed_city_and_color(&engine).await;
    let ctx = CallContext::background();

    let mut texts: Vec<String> = (0..12).map(|i| format!("blue {}", i)).collect();
    texts[5] = format!("{} in chicago", PANIC_MARKER);

    let results = engine
        .tag(&ctx, &texts, &strings(&["city", "color"]), "english", MatchType::Exact)
        .await
        .unwrap();

    assert_eq!(results.len(), 12);
    assert_eq!(results[5].norm_text, "boom in chicago");
    assert_eq!(results[5].count("city"), 0);
    assert_eq!(results[4].norm_text, "[color] 4");
    assert_eq!(results[6].norm_text, "[color] 6");
}

#[tokio::test]
async fn test_cancelled_request_fails_whole_batch() {
    let (_, engine) = memory_engine();
    seed_city_and_color(&engine).await;

    let (ctx, handle) = CallContext::background().with_cancel();
    handle.cancel();

    let result = engine
        .tag(&ctx, &strings(&["blue sky"]), &strings(&["color"]), "english", MatchType::Exact)
        .await;
    assert!(result.unwrap_err().is_interruption());
}
