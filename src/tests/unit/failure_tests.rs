//! Failure Handling Tests
//!
//! Backend errors injected through mockall: per-item failures degrade,
//! interruptions abort.

use std::collections::HashSet;
use std::sync::Arc;

use mockall::predicate::eq;

use crate::core::context::CallContext;
use crate::core::dictionary::{Dictionary, MatchType};
use crate::core::search::{BulkStats, CreateOutcome, SearchError};
use crate::tests::common::{engine_with, strings};
use crate::tests::mocks::{
    backend_with_city, voc_hit, whitespace_tokens, MockSearchBackend, CITY_INDEX,
};

fn service_error() -> SearchError {
    SearchError::Service {
        status: 500,
        reason: "shard failure".to_string(),
    }
}

#[tokio::test]
async fn test_search_failure_leaves_text_untagged() {
    let mut mock = backend_with_city();
    mock.expect_search().returning(|_, query| {
        let body = query.to_body().to_string();
        if body.contains("broken") {
            Err(service_error())
        } else {
            Ok(vec![voc_hit(CITY_INDEX, "chicago")])
        }
    });
    let engine = engine_with(Arc::new(mock));
    let ctx = CallContext::background();

    let results = engine
        .tag(
            &ctx,
            &strings(&["broken chicago", "hotel in chicago"]),
            &strings(&["city"]),
            "english",
            MatchType::Exact,
        )
        .await
        .unwrap();

    assert_eq!(results[0].norm_text, "broken chicago");
    assert_eq!(results[0].count("city"), 0);
    assert_eq!(results[1].norm_text, "hotel in [city]");
    assert_eq!(results[1].count("city"), 1);
}

#[tokio::test]
async fn test_recalled_phrase_is_analyzed_once_per_call() {
    let mut mock = MockSearchBackend::new();
    mock.expect_name().returning(|| "mock");
    mock.expect_list_indices()
        .returning(|_| Ok(vec![CITY_INDEX.to_string()]));
    mock.expect_search()
        .returning(|_, _| Ok(vec![voc_hit(CITY_INDEX, "chicago")]));
    mock.expect_analyze()
        .withf(|_, _, text| text == "chicago")
        .times(1)
        .returning(|_, _, text| Ok(whitespace_tokens(text)));
    mock.expect_analyze()
        .withf(|_, _, text| text != "chicago")
        .times(2)
        .returning(|_, _, text| Ok(whitespace_tokens(text)));
    let engine = engine_with(Arc::new(mock));
    let ctx = CallContext::background();

    let results = engine
        .tag(
            &ctx,
            &strings(&["hotel in chicago", "chicago bound"]),
            &strings(&["city"]),
            "english",
            MatchType::Exact,
        )
        .await
        .unwrap();

    assert_eq!(results[0].norm_text, "hotel in [city]");
    assert_eq!(results[1].norm_text, "[city] bound");
}

#[tokio::test]
async fn test_search_interruption_aborts_batch() {
    let mut mock = backend_with_city();
    mock.expect_search()
        .returning(|_, _| Err(SearchError::DeadlineExceeded));
    let engine = engine_with(Arc::new(mock));
    let ctx = CallContext::background();

    let result = engine
        .tag(
            &ctx,
            &strings(&["hotel in chicago"]),
            &strings(&["city"]),
            "english",
            MatchType::Broad,
        )
        .await;
    assert!(result.unwrap_err().is_interruption());
}

#[tokio::test]
async fn test_single_index_query_targets_that_index() {
    let mut mock = backend_with_city();
    mock.expect_search()
        .withf(|selector, _| selector == CITY_INDEX)
        .times(1)
        .returning(|_, _| Ok(vec![]));
    let engine = engine_with(Arc::new(mock));
    let ctx = CallContext::background();

    engine
        .tag(
            &ctx,
            &strings(&["hotel"]),
            &strings(&["city", "city"]),
            "english",
            MatchType::Exact,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_bulk_failure_counts_whole_chunk() {
    let mut mock = MockSearchBackend::new();
    mock.expect_index_exists().returning(|_| Ok(true));
    mock.expect_existing_ids()
        .returning(|_, _| Ok(HashSet::new()));
    mock.expect_bulk().returning(|_, _| Err(service_error()));
    let engine = engine_with(Arc::new(mock));
    let ctx = CallContext::background();

    let stats = engine
        .add_voc(&ctx, &strings(&["a", "b", "c"]), "letters", "english")
        .await
        .unwrap();
    assert_eq!(stats, BulkStats::all_failed(3));
}

#[tokio::test]
async fn test_concurrent_creation_is_benign() {
    let mut mock = MockSearchBackend::new();
    mock.expect_index_exists().returning(|_| Ok(false));
    mock.expect_create_index()
        .returning(|_, _| Ok(CreateOutcome::AlreadyExists));
    // Someone else's index may already hold entries
    mock.expect_existing_ids()
        .times(1)
        .returning(|_, _| Ok(HashSet::from(["chicago".to_string()])));
    mock.expect_bulk()
        .withf(|ops, refresh| ops.len() == 1 && ops[0].id() == "beijing" && *refresh)
        .returning(|ops, _| Ok(BulkStats::new(ops.len(), 0)));
    let engine = engine_with(Arc::new(mock));
    let ctx = CallContext::background();

    let stats = engine
        .add_voc(&ctx, &strings(&["chicago", "beijing"]), "city", "english")
        .await
        .unwrap();
    assert_eq!(stats, BulkStats::new(1, 0));
}

#[tokio::test]
async fn test_fresh_index_skips_existence_check() {
    let mut mock = MockSearchBackend::new();
    mock.expect_index_exists().returning(|_| Ok(false));
    mock.expect_create_index()
        .returning(|_, _| Ok(CreateOutcome::Created));
    mock.expect_existing_ids().never();
    mock.expect_bulk()
        .returning(|ops, _| Ok(BulkStats::new(ops.len(), 0)));
    let engine = engine_with(Arc::new(mock));
    let ctx = CallContext::background();

    let stats = engine
        .add_voc(&ctx, &strings(&["chicago"]), "city", "english")
        .await
        .unwrap();
    assert_eq!(stats, BulkStats::new(1, 0));
}

#[tokio::test]
async fn test_remove_dic_service_error_is_reported() {
    let mut mock = MockSearchBackend::new();
    mock.expect_delete_index()
        .with(eq("dictionary-city-english"))
        .returning(|_| Err(service_error()));
    mock.expect_delete_index()
        .with(eq("dictionary-color-english"))
        .returning(|_| Ok(true));
    let engine = engine_with(Arc::new(mock));
    let ctx = CallContext::background();

    let outcomes = engine
        .remove_dic(&ctx, &strings(&["city", "color"]), "english")
        .await
        .unwrap();
    assert!(outcomes[0].error);
    assert!(outcomes[0].message.contains("shard failure"));
    assert!(!outcomes[1].error);
}

#[tokio::test]
async fn test_scan_failure_yields_empty_listing() {
    let mut mock = MockSearchBackend::new();
    mock.expect_scan().returning(|_| Err(service_error()));
    let engine = engine_with(Arc::new(mock));
    let ctx = CallContext::background();

    let listing = engine.get_voc(&ctx, &[], "english").await.unwrap();
    assert!(listing.is_empty());
}

#[tokio::test]
async fn test_health_reflects_ping() {
    let mut mock = MockSearchBackend::new();
    mock.expect_name().returning(|| "mock");
    mock.expect_ping().returning(|| Err(service_error()));
    let engine = engine_with(Arc::new(mock));
    assert!(!engine.health(&CallContext::background()).await);

    let mut mock = MockSearchBackend::new();
    mock.expect_ping().returning(|| Ok(true));
    let engine = engine_with(Arc::new(mock));
    assert!(engine.health(&CallContext::background()).await);
}
