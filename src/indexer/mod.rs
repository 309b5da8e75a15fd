//! Indexing pipeline
//!
//! Normalize -> encode (per applicable model) -> batch -> bulk write.
//! One parameterized pipeline driven by the dataset-schema table and the
//! encoder-applicability lists; per-record failures never abort a run.

mod collections;
mod pipeline;

pub use collections::CollectionManager;
pub use pipeline::{IndexReport, IndexingPipeline};

/// Persisted collection naming convention. Fixed: changing it requires a
/// migration step for every dependent query path.
pub fn collection_name(dataset: &str, model: &str) -> String {
    format!("products_{}_{}", dataset, model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_convention_is_stable() {
        assert_eq!(
            collection_name("amazon", "minilm"),
            "products_amazon_minilm"
        );
    }
}
