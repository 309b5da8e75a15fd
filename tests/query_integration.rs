//! Hybrid query engine integration tests
//!
//! Drives the engine against a call-counting stub backend: caller-error
//! rejection before any backend call, fusion ordering, deterministic
//! tie-breaking, the empty-query and vector-only degenerate paths, and
//! request timeouts.

mod common;

use common::{hit, StubBackend, StubEncoder};
use prodex::backend::QueryResponse;
use prodex::config::QueryConfig;
use prodex::encoder::EncoderRegistry;
use prodex::error::ProdexError;
use prodex::query::{HybridQueryEngine, QueryMode, QueryRequest};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn stub_registry() -> Arc<EncoderRegistry> {
    let mut registry = EncoderRegistry::new();
    registry.insert("stub", Arc::new(StubEncoder::new(4)));
    Arc::new(registry)
}

fn engine_with(backend: Arc<StubBackend>, config: &QueryConfig) -> HybridQueryEngine {
    HybridQueryEngine::new(stub_registry(), backend, ["shop".to_string()], config).unwrap()
}

#[tokio::test]
async fn unknown_model_is_rejected_before_any_backend_call() {
    let backend = Arc::new(StubBackend::new());
    let engine = engine_with(backend.clone(), &QueryConfig::default());

    let err = engine
        .search(&QueryRequest::new("lamp", "nope", "shop", 10))
        .await
        .unwrap_err();

    assert!(matches!(err, ProdexError::UnknownModel { key } if key == "nope"));
    assert_eq!(backend.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_dataset_is_rejected_before_any_backend_call() {
    let backend = Arc::new(StubBackend::new());
    let engine = engine_with(backend.clone(), &QueryConfig::default());

    let err = engine
        .search(&QueryRequest::new("lamp", "stub", "nowhere", 10))
        .await
        .unwrap_err();

    assert!(matches!(err, ProdexError::UnknownDataset { key } if key == "nowhere"));
    assert_eq!(backend.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dominating_candidate_ranks_first() {
    // Candidate 1 beats candidate 2 in both raw sub-scores
    let backend = Arc::new(StubBackend::with_response(QueryResponse {
        hits: vec![hit(2, 2.0, 0.1), hit(1, 5.0, 0.5)],
        total: 2,
    }));
    let engine = engine_with(backend, &QueryConfig::default());

    let hits = engine
        .search(&QueryRequest::new("lamp", "stub", "shop", 10))
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, 1);
    assert!(hits[0].fused_score > hits[1].fused_score);
}

#[tokio::test]
async fn fused_score_blends_the_normalized_signals() {
    // cosine 0 remaps to 0.5; lexical 0 stays 0; defaults weight 0.7/0.3
    let backend = Arc::new(StubBackend::with_response(QueryResponse {
        hits: vec![hit(1, 0.0, 0.0)],
        total: 1,
    }));
    let engine = engine_with(backend, &QueryConfig::default());

    let hits = engine
        .search(&QueryRequest::new("lamp", "stub", "shop", 10))
        .await
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert!((hits[0].fused_score - 0.35).abs() < 1e-6);
    assert_eq!(hits[0].lexical_score_raw, 0.0);
    assert_eq!(hits[0].vector_score_raw, 0.0);
}

#[tokio::test]
async fn lexical_scores_above_the_cap_saturate() {
    // Raw lexical 25 and 10 both normalize to 1.0 under the default cap,
    // so the vector signal decides the order
    let backend = Arc::new(StubBackend::with_response(QueryResponse {
        hits: vec![hit(1, 25.0, 0.2), hit(2, 10.0, 0.9)],
        total: 2,
    }));
    let engine = engine_with(backend, &QueryConfig::default());

    let hits = engine
        .search(&QueryRequest::new("lamp", "stub", "shop", 10))
        .await
        .unwrap();

    assert_eq!(hits[0].id, 2);
}

#[tokio::test]
async fn ties_break_by_document_id_ascending() {
    let backend = Arc::new(StubBackend::with_response(QueryResponse {
        hits: vec![hit(7, 3.0, 0.4), hit(3, 3.0, 0.4), hit(5, 3.0, 0.4)],
        total: 3,
    }));
    let engine = engine_with(backend, &QueryConfig::default());

    let hits = engine
        .search(&QueryRequest::new("lamp", "stub", "shop", 10))
        .await
        .unwrap();

    let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![3, 5, 7]);
}

#[tokio::test]
async fn results_truncate_to_top_k() {
    let backend = Arc::new(StubBackend::with_response(QueryResponse {
        hits: (1..=5).map(|id| hit(id, id as f32, 0.0)).collect(),
        total: 5,
    }));
    let engine = engine_with(backend.clone(), &QueryConfig::default());

    let hits = engine
        .search(&QueryRequest::new("lamp", "stub", "shop", 2))
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);

    // The backend was asked for an over-fetched candidate pool
    let spec = backend.last_spec.lock().unwrap().clone().unwrap();
    assert_eq!(spec.limit, 2 * QueryConfig::default().search_multiplier);
}

#[tokio::test]
async fn empty_query_is_valid_and_vector_driven() {
    let backend = Arc::new(StubBackend::with_response(QueryResponse {
        hits: vec![hit(1, 0.0, 0.9), hit(2, 0.0, 0.3)],
        total: 2,
    }));
    let engine = engine_with(backend.clone(), &QueryConfig::default());

    let hits = engine
        .search(&QueryRequest::new("", "stub", "shop", 10))
        .await
        .unwrap();

    // No lexical clause was sent; ranking comes from the vector side
    let spec = backend.last_spec.lock().unwrap().clone().unwrap();
    assert!(spec.lexical.is_none());
    assert_eq!(hits[0].id, 1);
    assert_eq!(hits[0].lexical_score_raw, 0.0);
}

#[tokio::test]
async fn hybrid_mode_sends_the_tokenized_lexical_clause() {
    let backend = Arc::new(StubBackend::new());
    let engine = engine_with(backend.clone(), &QueryConfig::default());

    engine
        .search(&QueryRequest::new("red desk lamp", "stub", "shop", 5))
        .await
        .unwrap();

    let spec = backend.last_spec.lock().unwrap().clone().unwrap();
    let clause = spec.lexical.expect("hybrid mode must carry a lexical clause");
    assert_eq!(clause.terms, vec!["red", "desk", "lamp"]);
    assert_eq!(clause.fields.len(), 4);
}

#[tokio::test]
async fn vector_only_mode_omits_the_lexical_clause() {
    let backend = Arc::new(StubBackend::new());
    let engine = engine_with(backend.clone(), &QueryConfig::default());

    let mut request = QueryRequest::new("red desk lamp", "stub", "shop", 5);
    request.mode = QueryMode::Vector;
    engine.search(&request).await.unwrap();

    let spec = backend.last_spec.lock().unwrap().clone().unwrap();
    assert!(spec.lexical.is_none());
}

#[tokio::test]
async fn query_vector_matches_the_encoder_dimension() {
    let backend = Arc::new(StubBackend::new());
    let engine = engine_with(backend.clone(), &QueryConfig::default());

    engine
        .search(&QueryRequest::new("lamp", "stub", "shop", 5))
        .await
        .unwrap();

    let spec = backend.last_spec.lock().unwrap().clone().unwrap();
    assert_eq!(spec.vector.len(), 4);
}

#[tokio::test]
async fn slow_backend_surfaces_as_unavailable_not_a_hang() {
    let backend = Arc::new(StubBackend::with_query_delay(Duration::from_secs(3)));
    let config = QueryConfig {
        timeout_secs: 1,
        ..QueryConfig::default()
    };
    let engine = engine_with(backend, &config);

    let err = engine
        .search(&QueryRequest::new("lamp", "stub", "shop", 5))
        .await
        .unwrap_err();

    assert!(matches!(err, ProdexError::BackendUnavailable { .. }));
}
