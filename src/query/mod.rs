//! Hybrid query engine
//!
//! Stateless request/response path: encode the raw query text, retrieve a
//! lexical candidate pool (or pure nearest neighbors), normalize both
//! sub-scores into [0, 1], fuse with configured weights, rank.

mod builder;
mod engine;
mod fusion;

pub use builder::{build_lexical_clause, LEXICAL_FIELD_BOOSTS};
pub use engine::HybridQueryEngine;
pub use fusion::{fused_score, normalize_lexical, remap_cosine, FusionError, ScoreWeights};

use crate::catalog::CanonicalProduct;
use serde::{Deserialize, Serialize};

/// Retrieval mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Lexical base retrieval blended with vector similarity
    #[default]
    Hybrid,
    /// Nearest-neighbor retrieval by vector alone
    Vector,
}

/// One search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    pub model_key: String,
    pub dataset_key: String,
    pub top_k: usize,
    #[serde(default)]
    pub mode: QueryMode,
}

impl QueryRequest {
    pub fn new(
        text: impl Into<String>,
        model_key: impl Into<String>,
        dataset_key: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            text: text.into(),
            model_key: model_key.into(),
            dataset_key: dataset_key.into(),
            top_k,
            mode: QueryMode::Hybrid,
        }
    }
}

/// One ranked result
#[derive(Debug, Clone, Serialize)]
pub struct ScoredHit {
    pub id: u64,
    pub document: CanonicalProduct,
    /// Raw lexical relevance before normalization
    pub lexical_score_raw: f32,
    /// Raw cosine similarity in [-1, 1]
    pub vector_score_raw: f32,
    pub fused_score: f32,
}
