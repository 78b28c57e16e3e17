//! Common Test Utilities
//!
//! Engines wired to the in-memory backend with test-friendly settings.

use std::sync::Arc;
use std::time::Duration;

use crate::core::context::CallContext;
use crate::core::dictionary::{Dictionary, EngineSettings, IndexNamespace, SearchDictionary};
use crate::core::search::{MemoryBackend, SearchBackend};

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Settings with no settle delay and a small worker pool.
pub fn test_settings() -> EngineSettings {
    EngineSettings {
        settle_delay: Duration::ZERO,
        workers: 4,
        ..EngineSettings::default()
    }
}

pub fn engine_with(backend: Arc<dyn SearchBackend>) -> SearchDictionary {
    SearchDictionary::new(backend, IndexNamespace::new("dictionary"), test_settings())
}

/// A fresh in-memory engine and a handle on its store.
pub fn memory_engine() -> (Arc<MemoryBackend>, SearchDictionary) {
    let backend = Arc::new(MemoryBackend::new());
    let engine = engine_with(backend.clone());
    (backend, engine)
}

/// The city/color dictionaries used throughout the tagging tests.
pub async fn seed_city_and_color(engine: &SearchDictionary) {
    let ctx = CallContext::background();
    engine
        .add_voc(&ctx, &strings(&["New York", "Chicago", "Beijing"]), "city", "english")
        .await
        .unwrap();
    engine
        .add_voc(&ctx, &strings(&["blue", "green", "orange"]), "color", "english")
        .await
        .unwrap();
}
