//! Encoder trait and FastEmbed implementation

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Model initialization failed: {0}")]
    Initialization(String),

    #[error("Embedding generation failed: {0}")]
    Generation(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Text-to-vector capability with a fixed output dimension.
///
/// Implementations must be deterministic for identical input and must
/// never return a vector of the wrong length; a failing model call is an
/// error, not a silent zero vector.
pub trait Encoder: Send + Sync {
    /// Encode a single text
    fn encode(&self, text: &str) -> Result<Vec<f32>, EncodeError>;

    /// Encode multiple texts in one model call
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EncodeError>;

    /// Output vector length
    fn dimension(&self) -> usize;

    /// Underlying model name
    fn model_name(&self) -> &str;
}

/// FastEmbed-backed encoder for local embedding generation.
///
/// Models download on demand to the local huggingface cache on first use.
pub struct FastEmbedEncoder {
    model: Arc<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedEncoder {
    pub fn new(model_name: &str) -> Result<Self, EncodeError> {
        let embedding_model = match model_name {
            "all-MiniLM-L6-v2" | "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            "paraphrase-multilingual-mpnet-base-v2" => EmbeddingModel::ParaphraseMLMpnetBaseV2,
            "multilingual-e5-small" => EmbeddingModel::MultilingualE5Small,
            _ => {
                return Err(EncodeError::Initialization(format!(
                    "Unsupported model: {}. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, \
                     bge-base-en-v1.5, paraphrase-multilingual-mpnet-base-v2, multilingual-e5-small",
                    model_name
                )));
            }
        };

        let dimension = match embedding_model {
            EmbeddingModel::AllMiniLML6V2 => 384,
            EmbeddingModel::BGESmallENV15 => 384,
            EmbeddingModel::BGEBaseENV15 => 768,
            EmbeddingModel::ParaphraseMLMpnetBaseV2 => 768,
            EmbeddingModel::MultilingualE5Small => 384,
            _ => 384,
        };

        tracing::info!(
            "Initializing embedding model: {} ({}D, downloaded if not cached)",
            model_name,
            dimension
        );

        let init_options = InitOptions::new(embedding_model).with_show_download_progress(true);

        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| EncodeError::Initialization(e.to_string()))?;

        Ok(Self {
            model: Arc::new(model),
            model_name: model_name.to_string(),
            dimension,
        })
    }
}

impl Encoder for FastEmbedEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, EncodeError> {
        let embeddings = self
            .model
            .embed(vec![text.to_string()], None)
            .map_err(|e| EncodeError::Generation(e.to_string()))?;

        let embedding = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EncodeError::Generation("no embedding produced".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(EncodeError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EncodeError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| EncodeError::Generation(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(EncodeError::Generation(format!(
                "embedding count mismatch: expected {}, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(EncodeError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_model_is_rejected() {
        let result = FastEmbedEncoder::new("definitely-not-a-model");
        assert!(matches!(result, Err(EncodeError::Initialization(_))));
    }

    #[test]
    #[ignore] // Requires model download - run with: cargo test -- --ignored
    fn encode_produces_declared_dimension() {
        let encoder = FastEmbedEncoder::new("all-MiniLM-L6-v2").unwrap();
        assert_eq!(encoder.dimension(), 384);

        let embedding = encoder.encode("A red desk lamp with an E27 socket").unwrap();
        assert_eq!(embedding.len(), 384);
    }

    #[test]
    #[ignore] // Requires model download - run with: cargo test -- --ignored
    fn encode_batch_matches_input_count() {
        let encoder = FastEmbedEncoder::new("all-MiniLM-L6-v2").unwrap();
        let texts = vec![
            "First product".to_string(),
            "Second product".to_string(),
            "Third product".to_string(),
        ];

        let embeddings = encoder.encode_batch(&texts).unwrap();
        assert_eq!(embeddings.len(), 3);
        for embedding in embeddings {
            assert_eq!(embedding.len(), 384);
        }
    }
}
