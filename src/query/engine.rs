//! Hybrid search execution

use super::{
    build_lexical_clause, fused_score, normalize_lexical, remap_cosine, QueryMode, QueryRequest,
    ScoreWeights, ScoredHit,
};
use crate::backend::{QuerySpec, SearchBackend};
use crate::config::QueryConfig;
use crate::encoder::EncoderRegistry;
use crate::error::{ProdexError, Result};
use crate::indexer::collection_name;
use ahash::AHashSet;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Stateless hybrid query engine.
///
/// Shares only the read-only encoder registry and the backend handle, so
/// any number of concurrent requests can run without locking.
pub struct HybridQueryEngine {
    registry: Arc<EncoderRegistry>,
    backend: Arc<dyn SearchBackend>,
    datasets: AHashSet<String>,
    weights: ScoreWeights,
    max_score_cap: f32,
    search_multiplier: usize,
    query_timeout: Duration,
}

impl HybridQueryEngine {
    pub fn new(
        registry: Arc<EncoderRegistry>,
        backend: Arc<dyn SearchBackend>,
        dataset_keys: impl IntoIterator<Item = String>,
        config: &QueryConfig,
    ) -> Result<Self> {
        let weights = ScoreWeights::new(config.vector_weight, config.text_weight)
            .map_err(|e| ProdexError::Config(e.to_string()))?;

        Ok(Self {
            registry,
            backend,
            datasets: dataset_keys.into_iter().collect(),
            weights,
            max_score_cap: config.max_score_cap,
            search_multiplier: config.search_multiplier.max(1),
            query_timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    /// Execute one request and return hits ranked by fused score
    /// descending, ties broken by document id ascending.
    pub async fn search(&self, request: &QueryRequest) -> Result<Vec<ScoredHit>> {
        // Caller errors are rejected before any backend call
        if !self.registry.contains(&request.model_key) {
            return Err(ProdexError::UnknownModel {
                key: request.model_key.clone(),
            });
        }
        if !self.datasets.contains(&request.dataset_key) {
            return Err(ProdexError::UnknownDataset {
                key: request.dataset_key.clone(),
            });
        }
        if request.top_k == 0 {
            return Ok(Vec::new());
        }

        // The raw query text is encoded as-is, never routed through the
        // indexing-side field concatenation
        let vector = self
            .registry
            .encode(&request.model_key, &request.text)
            .map_err(|e| match e {
                ProdexError::Encoding(message) => ProdexError::BackendUnavailable {
                    message: format!("query encoding failed: {message}"),
                },
                other => other,
            })?;

        // An empty query is valid: with no lexical clause the candidate
        // pool comes from the vector side and the text score is zero
        let lexical = match request.mode {
            QueryMode::Vector => None,
            QueryMode::Hybrid => build_lexical_clause(&request.text),
        };

        let spec = QuerySpec {
            lexical,
            vector,
            limit: request.top_k * self.search_multiplier,
        };

        let collection = collection_name(&request.dataset_key, &request.model_key);
        let backend = self.backend.clone();
        let task = {
            let collection = collection.clone();
            tokio::task::spawn_blocking(move || backend.query(&collection, &spec))
        };

        let response = tokio::time::timeout(self.query_timeout, task)
            .await
            .map_err(|_| ProdexError::BackendUnavailable {
                message: format!(
                    "query against '{}' timed out after {:?}",
                    collection, self.query_timeout
                ),
            })?
            .map_err(|e| ProdexError::Other(anyhow::anyhow!("query task panicked: {e}")))??;

        let mut hits: Vec<ScoredHit> = response
            .hits
            .into_iter()
            .map(|hit| {
                let vector_score = remap_cosine(hit.vector_score);
                let text_score = normalize_lexical(hit.lexical_score, self.max_score_cap);
                ScoredHit {
                    id: hit.id,
                    document: hit.document.product,
                    lexical_score_raw: hit.lexical_score,
                    vector_score_raw: hit.vector_score,
                    fused_score: fused_score(&self.weights, vector_score, text_score),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.fused_score
                .partial_cmp(&a.fused_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(request.top_k);

        Ok(hits)
    }
}
