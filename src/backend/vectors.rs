//! In-memory HNSW vector index for nearest-neighbor retrieval

use hnsw_rs::prelude::*;
use std::sync::RwLock;
use thiserror::Error;

/// Capacity hint handed to HNSW at construction
const DEFAULT_CAPACITY: usize = 100_000;
const MAX_LAYER: usize = 16;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },
}

/// Approximate nearest-neighbor index over one collection's embeddings.
///
/// Held in memory and rebuilt from the document store when a collection is
/// reopened; cosine distance on the stored vectors.
pub struct VectorIndex {
    index: RwLock<Hnsw<'static, f32, DistCosine>>,
    dimension: usize,
    count: RwLock<u64>,
}

impl VectorIndex {
    pub fn new(dimension: usize, m: usize, ef_construction: usize) -> Self {
        let index = Hnsw::<f32, DistCosine>::new(
            m,
            DEFAULT_CAPACITY,
            MAX_LAYER,
            ef_construction,
            DistCosine,
        );

        Self {
            index: RwLock::new(index),
            dimension,
            count: RwLock::new(0),
        }
    }

    /// Insert one vector under `id`
    pub fn insert(&self, id: u64, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let data = vector.to_vec();
        let index = self.index.write().unwrap();
        index.insert((&data, id as usize));

        let mut count = self.count.write().unwrap();
        *count += 1;

        Ok(())
    }

    pub fn insert_batch(&self, items: &[(u64, Vec<f32>)]) -> Result<(), VectorIndexError> {
        for (id, vector) in items {
            self.insert(*id, vector)?;
        }
        Ok(())
    }

    /// K nearest neighbors as (id, cosine similarity) pairs, most similar
    /// first
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<(u64, f32)>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.len() == 0 {
            return Ok(Vec::new());
        }

        let index = self.index.read().unwrap();
        let neighbours = index.search(query, k, ef_search);

        // DistCosine reports distance = 1 - cosine
        Ok(neighbours
            .into_iter()
            .map(|n| (n.d_id as u64, 1.0 - n.distance))
            .collect())
    }

    pub fn len(&self) -> u64 {
        *self.count.read().unwrap()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Cosine similarity between two equal-length vectors; 0.0 when either
/// has zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}
