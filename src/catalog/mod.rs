//! Canonical product model and per-dataset schema normalization
//!
//! Every source dataset ships records in its own shape. A declarative
//! [`DatasetSchema`] maps each shape onto one [`CanonicalProduct`] so the
//! rest of the engine never sees dataset-specific field names.

mod normalizer;
mod schema;

pub use normalizer::{fallback_id, normalize};
pub use schema::DatasetSchema;

use serde::{Deserialize, Serialize};

/// Dataset-independent product record consumed by encoding and indexing.
///
/// All textual fields default to the empty string when absent in the
/// source, never null, so downstream text concatenation is total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: String,
    #[serde(default)]
    pub params_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl CanonicalProduct {
    /// Embedding input text: fixed field order, single-space separated.
    ///
    /// This order is the contract shared by every write to a collection;
    /// query text is deliberately NOT routed through it.
    pub fn embedding_text(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.name, self.brand, self.description, self.categories, self.params_text
        )
    }
}
