//! Shared test doubles: deterministic encoders and a call-counting backend
#![allow(dead_code)]

use prodex::backend::{
    BackendHit, BulkItem, BulkItemOutcome, BulkReport, CreateOutcome, IndexedDocument,
    QueryResponse, QuerySpec, SearchBackend,
};
use prodex::catalog::CanonicalProduct;
use prodex::encoder::{EncodeError, Encoder};
use prodex::error::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Deterministic encoder: the output vector is a pure function of the
/// input text, so runs are reproducible without model downloads
pub struct StubEncoder {
    pub dimension: usize,
}

impl StubEncoder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        for byte in text.bytes() {
            state = state.wrapping_mul(31).wrapping_add(byte as u64);
        }

        let mut vector = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            vector.push(((state >> 33) as f32) / (u32::MAX as f32) - 0.5);
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude == 0.0 {
            vector[0] = 1.0;
        } else {
            for value in &mut vector {
                *value /= magnitude;
            }
        }
        vector
    }
}

impl Encoder for StubEncoder {
    fn encode(&self, text: &str) -> std::result::Result<Vec<f32>, EncodeError> {
        Ok(self.vector_for(text))
    }

    fn encode_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EncodeError> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

/// Encoder that maps every text to the same unit vector; with identical
/// vector scores the fused ranking is decided by the lexical signal alone
pub struct ConstantEncoder {
    pub dimension: usize,
}

impl ConstantEncoder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector(&self) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        vector[0] = 1.0;
        vector
    }
}

impl Encoder for ConstantEncoder {
    fn encode(&self, _text: &str) -> std::result::Result<Vec<f32>, EncodeError> {
        Ok(self.vector())
    }

    fn encode_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EncodeError> {
        Ok(texts.iter().map(|_| self.vector()).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "constant"
    }
}

/// In-memory backend double with per-method call counters
#[derive(Default)]
pub struct StubBackend {
    pub exists_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub bulk_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    /// collection name -> vector dimension
    pub collections: Mutex<HashMap<String, usize>>,
    /// every successfully written item, in write order
    pub written: Mutex<Vec<BulkItem>>,
    /// document ids whose bulk writes report per-item failure
    pub fail_ids: Vec<u64>,
    /// canned query response; empty response when unset
    pub response: Mutex<Option<QueryResponse>>,
    /// spec captured from the most recent query call
    pub last_spec: Mutex<Option<QuerySpec>>,
    /// artificial latency applied to query calls
    pub query_delay: Option<Duration>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_ids(ids: Vec<u64>) -> Self {
        Self {
            fail_ids: ids,
            ..Self::default()
        }
    }

    pub fn with_response(response: QueryResponse) -> Self {
        Self {
            response: Mutex::new(Some(response)),
            ..Self::default()
        }
    }

    pub fn with_query_delay(delay: Duration) -> Self {
        Self {
            query_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn written_ids(&self) -> Vec<u64> {
        self.written.lock().unwrap().iter().map(|i| i.id).collect()
    }
}

impl SearchBackend for StubBackend {
    fn exists(&self, collection: &str) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.collections.lock().unwrap().contains_key(collection))
    }

    fn create(
        &self,
        collection: &str,
        _vector_field: &str,
        dimension: usize,
    ) -> Result<CreateOutcome> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(collection) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        collections.insert(collection.to_string(), dimension);
        Ok(CreateOutcome::Created)
    }

    fn bulk_write(&self, items: Vec<BulkItem>) -> Result<BulkReport> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);

        let mut outcomes = Vec::with_capacity(items.len());
        let mut has_errors = false;
        for item in items {
            if self.fail_ids.contains(&item.id) {
                has_errors = true;
                outcomes.push(BulkItemOutcome {
                    id: item.id,
                    error: Some("simulated item failure".to_string()),
                });
            } else {
                outcomes.push(BulkItemOutcome {
                    id: item.id,
                    error: None,
                });
                self.written.lock().unwrap().push(item);
            }
        }

        Ok(BulkReport {
            has_errors,
            items: outcomes,
        })
    }

    fn query(&self, _collection: &str, spec: &QuerySpec) -> Result<QueryResponse> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_spec.lock().unwrap() = Some(spec.clone());

        if let Some(delay) = self.query_delay {
            std::thread::sleep(delay);
        }

        Ok(self
            .response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(QueryResponse {
                hits: Vec::new(),
                total: 0,
            }))
    }
}

/// A backend hit with the given raw sub-scores
pub fn hit(id: u64, lexical_score: f32, vector_score: f32) -> BackendHit {
    BackendHit {
        id,
        document: IndexedDocument {
            product: CanonicalProduct {
                id: format!("p{id}"),
                name: format!("product {id}"),
                brand: String::new(),
                description: String::new(),
                categories: String::new(),
                params_text: String::new(),
                picture: None,
            },
            embedding: vec![0.0; 4],
        },
        lexical_score,
        vector_score,
    }
}
