//! Registry of named encoders

use super::{Encoder, FastEmbedEncoder};
use crate::error::{ProdexError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Named encoders, keyed by model key.
///
/// Built once at process start from the configuration's encoder table and
/// shared read-only afterwards; the registry itself holds no mutable state
/// beyond the model handles.
pub struct EncoderRegistry {
    encoders: HashMap<String, Arc<dyn Encoder>>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self {
            encoders: HashMap::new(),
        }
    }

    /// Build every encoder declared in the configuration table
    /// (model key -> model name).
    pub fn from_config(table: &HashMap<String, String>) -> Result<Self> {
        let keys: Vec<String> = table.keys().cloned().collect();
        Self::from_config_subset(table, &keys)
    }

    /// Build only the listed encoder keys; the full table still defines
    /// which keys are known, so an unlisted key fails as `UnknownModel`
    /// before any model is loaded.
    pub fn from_config_subset(table: &HashMap<String, String>, keys: &[String]) -> Result<Self> {
        let mut registry = Self::new();
        for key in keys {
            let model_name = table.get(key).ok_or_else(|| ProdexError::UnknownModel {
                key: key.clone(),
            })?;
            let encoder = FastEmbedEncoder::new(model_name)
                .map_err(|e| ProdexError::Encoding(e.to_string()))?;
            registry.insert(key, Arc::new(encoder));
        }
        Ok(registry)
    }

    pub fn insert(&mut self, key: &str, encoder: Arc<dyn Encoder>) {
        self.encoders.insert(key.to_string(), encoder);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.encoders.contains_key(key)
    }

    /// Registered model keys, sorted for deterministic iteration order
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.encoders.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Result<&Arc<dyn Encoder>> {
        self.encoders
            .get(key)
            .ok_or_else(|| ProdexError::UnknownModel {
                key: key.to_string(),
            })
    }

    /// Output dimension of the encoder registered under `key`
    pub fn dimension(&self, key: &str) -> Result<usize> {
        Ok(self.get(key)?.dimension())
    }

    /// Encode one text with the encoder registered under `key`
    pub fn encode(&self, key: &str, text: &str) -> Result<Vec<f32>> {
        self.get(key)?
            .encode(text)
            .map_err(|e| ProdexError::Encoding(e.to_string()))
    }

    /// Encode a batch of texts with the encoder registered under `key`
    pub fn encode_batch(&self, key: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.get(key)?
            .encode_batch(texts)
            .map_err(|e| ProdexError::Encoding(e.to_string()))
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
