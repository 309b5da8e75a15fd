//! Batched multi-model indexing

use super::CollectionManager;
use crate::backend::{BulkItem, IndexedDocument, SearchBackend};
use crate::catalog::{normalize, CanonicalProduct, DatasetSchema};
use crate::config::PipelineConfig;
use crate::encoder::EncoderRegistry;
use crate::error::{ProdexError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Aggregate result of indexing one dataset source
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Documents confirmed written by the backend
    pub indexed: usize,
    /// Records dropped before write (malformed or unencodable)
    pub skipped: usize,
    /// Document ids the backend reported as failed
    pub failed_ids: Vec<u64>,
    pub duration_ms: u64,
}

/// Multi-model indexing pipeline.
///
/// Document ids come from one process-wide counter shared across all
/// datasets and models, so every id written in a run is unique across
/// collections and bulk outcomes correlate with log lines unambiguously.
pub struct IndexingPipeline {
    registry: Arc<EncoderRegistry>,
    backend: Arc<dyn SearchBackend>,
    collections: CollectionManager,
    schemas: HashMap<String, DatasetSchema>,
    options: PipelineConfig,
    next_id: AtomicU64,
    buffer: Mutex<Vec<BulkItem>>,
}

impl IndexingPipeline {
    pub fn new(
        registry: Arc<EncoderRegistry>,
        backend: Arc<dyn SearchBackend>,
        schemas: HashMap<String, DatasetSchema>,
        options: PipelineConfig,
    ) -> Self {
        let collections = CollectionManager::new(
            backend.clone(),
            registry.clone(),
            Duration::from_secs(options.create_timeout_secs),
        );

        Self {
            registry,
            backend,
            collections,
            schemas,
            options,
            next_id: AtomicU64::new(1),
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Index one dataset source end to end.
    ///
    /// Per-record failures are logged and skipped; bulk write failures are
    /// reported per item. Neither aborts the run.
    pub async fn run_dataset(&self, dataset: &str, records: &[Value]) -> Result<IndexReport> {
        let start = std::time::Instant::now();

        let schema = self
            .schemas
            .get(dataset)
            .ok_or_else(|| ProdexError::UnknownDataset {
                key: dataset.to_string(),
            })?;

        let mut report = IndexReport::default();

        let products = self.normalize_records(dataset, records, schema, &mut report);
        info!(
            "Dataset '{}': {} records normalized, {} skipped",
            dataset,
            products.len(),
            report.skipped
        );

        let encoder_keys = if schema.encoders.is_empty() {
            self.registry.keys()
        } else {
            schema.encoders.clone()
        };

        for model in &encoder_keys {
            self.index_with_model(dataset, model, &products, &mut report)
                .await?;
        }

        // Final partial batch must not be dropped
        self.flush_into(&mut report).await;

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Dataset '{}' done: {} indexed, {} skipped, {} failed, {}ms",
            dataset,
            report.indexed,
            report.skipped,
            report.failed_ids.len(),
            report.duration_ms
        );

        Ok(report)
    }

    fn normalize_records(
        &self,
        dataset: &str,
        records: &[Value],
        schema: &DatasetSchema,
        report: &mut IndexReport,
    ) -> Vec<CanonicalProduct> {
        let mut products = Vec::with_capacity(records.len());
        for (ordinal, record) in records.iter().enumerate() {
            match normalize(dataset, ordinal, record, schema) {
                Ok(product) => products.push(product),
                Err(e) => {
                    report.skipped += 1;
                    warn!("Skipping record {} in '{}': {}", ordinal, dataset, e);
                }
            }
        }
        products
    }

    /// Encode and buffer every product for one (dataset, model) pair
    async fn index_with_model(
        &self,
        dataset: &str,
        model: &str,
        products: &[CanonicalProduct],
        report: &mut IndexReport,
    ) -> Result<()> {
        if products.is_empty() {
            return Ok(());
        }

        let collection = self.collections.ensure_collection(dataset, model).await?;

        let texts: Vec<String> = products.iter().map(|p| p.embedding_text()).collect();
        let ranges: Vec<Range<usize>> = (0..texts.len())
            .step_by(self.options.encode_batch_size)
            .map(|start| start..(start + self.options.encode_batch_size).min(texts.len()))
            .collect();

        // Encode chunks in bounded waves; results are consumed in
        // submission order so flushed batch contents stay deterministic
        for wave in ranges.chunks(self.options.max_concurrent) {
            let mut handles = Vec::with_capacity(wave.len());
            for range in wave {
                let registry = self.registry.clone();
                let model = model.to_string();
                let chunk: Vec<String> = texts[range.clone()].to_vec();
                handles.push((
                    range.clone(),
                    tokio::task::spawn_blocking(move || encode_chunk(&registry, &model, &chunk)),
                ));
            }

            for (range, handle) in handles {
                let embeddings = handle.await.map_err(|e| {
                    ProdexError::Other(anyhow::anyhow!("encode task panicked: {e}"))
                })?;

                for (product, embedding) in products[range].iter().zip(embeddings) {
                    match embedding {
                        Some(embedding) => {
                            self.buffer_document(&collection, product.clone(), embedding);
                        }
                        None => report.skipped += 1,
                    }
                }

                if self.buffer_len() >= self.options.batch_size {
                    self.flush_into(report).await;
                }
            }
        }

        Ok(())
    }

    fn buffer_document(&self, collection: &str, product: CanonicalProduct, embedding: Vec<f32>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let item = BulkItem {
            collection: collection.to_string(),
            id,
            document: IndexedDocument { product, embedding },
        };
        self.buffer.lock().unwrap().push(item);
    }

    fn buffer_len(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    async fn flush_into(&self, report: &mut IndexReport) {
        let (written, failed) = self.flush().await;
        report.indexed += written;
        report.failed_ids.extend(failed);
    }

    /// Submit the buffered batch as one bulk write and clear the buffer.
    ///
    /// Returns (documents confirmed written, ids reported failed). A
    /// failing or timed-out bulk call marks the whole batch failed and the
    /// run continues.
    async fn flush(&self) -> (usize, Vec<u64>) {
        let items = {
            let mut buffer = self.buffer.lock().unwrap();
            std::mem::take(&mut *buffer)
        };
        if items.is_empty() {
            return (0, Vec::new());
        }

        let batch_ids: Vec<u64> = items.iter().map(|item| item.id).collect();
        debug!("Flushing bulk batch of {} documents", items.len());

        let backend = self.backend.clone();
        let task = tokio::task::spawn_blocking(move || backend.bulk_write(items));
        let timeout = Duration::from_secs(self.options.bulk_timeout_secs);

        let report = match tokio::time::timeout(timeout, task).await {
            Err(_) => {
                error!("Bulk write timed out after {:?}; batch marked failed", timeout);
                return (0, batch_ids);
            }
            Ok(Err(join_err)) => {
                error!("Bulk write task panicked: {}", join_err);
                return (0, batch_ids);
            }
            Ok(Ok(Err(e))) => {
                error!("Bulk write failed: {}", e);
                return (0, batch_ids);
            }
            Ok(Ok(Ok(report))) => report,
        };

        if report.has_errors {
            warn!(
                "Bulk write reported {} failed items: {:?}",
                report.failed_ids().len(),
                report.failed_ids()
            );
        }

        (report.succeeded(), report.failed_ids())
    }
}

/// Encode one chunk; a failing batch call falls back to per-record
/// encoding so only genuinely failing records are lost
fn encode_chunk(
    registry: &EncoderRegistry,
    model: &str,
    texts: &[String],
) -> Vec<Option<Vec<f32>>> {
    match registry.encode_batch(model, texts) {
        Ok(embeddings) => embeddings.into_iter().map(Some).collect(),
        Err(e) => {
            warn!(
                "Batch encode failed for model '{}', retrying per record: {}",
                model, e
            );
            texts
                .iter()
                .map(|text| match registry.encode(model, text) {
                    Ok(embedding) => Some(embedding),
                    Err(e) => {
                        warn!("Skipping record: encode failed: {}", e);
                        None
                    }
                })
                .collect()
        }
    }
}
