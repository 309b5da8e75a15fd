//! Declarative per-dataset field-mapping tables

use serde::{Deserialize, Serialize};

/// Field mapping from one source dataset shape onto [`super::CanonicalProduct`].
///
/// Each entry names the source key that feeds a canonical field; absent
/// source keys fall back to the empty string at normalization time. The
/// `encoders` list restricts which registered models index this dataset;
/// an empty list means all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Source key holding the record-identifying value
    pub id: String,
    pub name: String,
    pub brand: String,
    pub description: String,
    pub categories: String,
    pub params: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Applicable encoder keys; empty means every registered encoder
    #[serde(default)]
    pub encoders: Vec<String>,
}

impl DatasetSchema {
    /// Schema for the primary catalog shape (Amazon-style export)
    pub fn amazon() -> Self {
        Self {
            id: "uniq_id".to_string(),
            name: "product_name".to_string(),
            brand: "manufacturer".to_string(),
            description: "description".to_string(),
            categories: "amazon_category_and_sub_category".to_string(),
            params: "product_information".to_string(),
            picture: Some("image".to_string()),
            encoders: Vec::new(),
        }
    }

    /// Schema for the secondary catalog shape (Wildberries-style export),
    /// indexed only through the multilingual model
    pub fn wildberries() -> Self {
        Self {
            id: "id".to_string(),
            name: "name".to_string(),
            brand: "brand".to_string(),
            description: "description".to_string(),
            categories: "category".to_string(),
            params: "characteristics".to_string(),
            picture: Some("image".to_string()),
            encoders: vec!["multilingual".to_string()],
        }
    }
}
