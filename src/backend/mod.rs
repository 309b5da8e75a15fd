//! Search backend capability
//!
//! The engine talks to its document store through the [`SearchBackend`]
//! trait: idempotent collection creation, bulk writes with per-item
//! outcomes, and candidate retrieval carrying both raw lexical and raw
//! vector sub-scores. [`EmbeddedBackend`] is the in-process reference
//! implementation (tantivy for lexical scoring, HNSW for nearest-neighbor,
//! SQLite as the document store); a remote backend can replace it without
//! touching the pipeline or the query engine.

mod embedded;
mod lexical;
mod vectors;

pub use embedded::EmbeddedBackend;
pub use lexical::{LexicalIndex, LexicalIndexError};
pub use vectors::{cosine_similarity, VectorIndex, VectorIndexError};

use crate::catalog::CanonicalProduct;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Document shape owned by the backend once written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    #[serde(flatten)]
    pub product: CanonicalProduct,
    pub embedding: Vec<f32>,
}

/// One pending upsert in a bulk write
#[derive(Debug, Clone)]
pub struct BulkItem {
    pub collection: String,
    pub id: u64,
    pub document: IndexedDocument,
}

/// Per-item outcome of a bulk write
#[derive(Debug, Clone)]
pub struct BulkItemOutcome {
    pub id: u64,
    pub error: Option<String>,
}

/// Aggregate result of one bulk write call.
///
/// A failed item never fails the call; callers inspect `has_errors` and
/// the per-item outcomes.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub has_errors: bool,
    pub items: Vec<BulkItemOutcome>,
}

impl BulkReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.error.is_none()).count()
    }

    pub fn failed_ids(&self) -> Vec<u64> {
        self.items
            .iter()
            .filter(|item| item.error.is_some())
            .map(|item| item.id)
            .collect()
    }
}

/// Outcome of a create call; racing creators both succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Lexical part of a query: terms OR'd together, each term matched across
/// weighted fields with most-fields semantics (a document matching more
/// terms across more fields scores higher).
#[derive(Debug, Clone)]
pub struct LexicalClause {
    pub terms: Vec<String>,
    /// (field name, boost) pairs
    pub fields: Vec<(String, f32)>,
}

/// One retrieval request against a collection
#[derive(Debug, Clone)]
pub struct QuerySpec {
    /// Lexical base retrieval; `None` selects pure nearest-neighbor
    /// retrieval by vector alone
    pub lexical: Option<LexicalClause>,
    pub vector: Vec<f32>,
    /// Candidate pool size
    pub limit: usize,
}

/// One candidate returned by the backend, carrying both raw sub-scores
#[derive(Debug, Clone)]
pub struct BackendHit {
    pub id: u64,
    pub document: IndexedDocument,
    /// Raw lexical relevance (BM25-class, unbounded above)
    pub lexical_score: f32,
    /// Raw cosine similarity in [-1, 1]
    pub vector_score: f32,
}

/// Result of one query call
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub hits: Vec<BackendHit>,
    pub total: usize,
}

/// Opaque index/document-store capability
pub trait SearchBackend: Send + Sync {
    fn exists(&self, collection: &str) -> Result<bool>;

    /// Create a collection with a vector field of the given dimension.
    /// Must be idempotent: concurrent creators racing on the same
    /// collection must not error each other out.
    fn create(&self, collection: &str, vector_field: &str, dimension: usize)
        -> Result<CreateOutcome>;

    /// Write many documents in one call, returning per-item outcomes
    fn bulk_write(&self, items: Vec<BulkItem>) -> Result<BulkReport>;

    /// Retrieve scored candidates from one collection
    fn query(&self, collection: &str, spec: &QuerySpec) -> Result<QueryResponse>;
}
