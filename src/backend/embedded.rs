//! In-process reference backend
//!
//! Composes the SQLite document store with a per-collection tantivy
//! lexical index and an in-memory HNSW vector index. Collections live
//! under `<root>/collections/<name>/`; vector indexes are rebuilt from the
//! store when a collection is first touched after open.

use super::{
    cosine_similarity, BackendHit, BulkItem, BulkItemOutcome, BulkReport, CreateOutcome,
    IndexedDocument, LexicalIndex, QueryResponse, QuerySpec, SearchBackend, VectorIndex,
};
use crate::catalog::CanonicalProduct;
use crate::config::IndexConfig;
use crate::error::{ProdexError, Result};
use crate::storage::Database;
use ahash::{AHashMap, AHashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub struct EmbeddedBackend {
    root: PathBuf,
    db: Database,
    hnsw: IndexConfig,
    lexical: RwLock<AHashMap<String, Arc<RwLock<LexicalIndex>>>>,
    vectors: RwLock<AHashMap<String, Arc<VectorIndex>>>,
}

impl EmbeddedBackend {
    /// Open (or initialize) a backend rooted at `root`
    pub fn new(root: &Path, hnsw: IndexConfig) -> Result<Self> {
        std::fs::create_dir_all(root).map_err(|e| ProdexError::Io {
            source: e,
            context: format!("Failed to create backend directory: {:?}", root),
        })?;

        let db = Database::new(&root.join("documents.db"))?;

        Ok(Self {
            root: root.to_path_buf(),
            db,
            hnsw,
            lexical: RwLock::new(AHashMap::new()),
            vectors: RwLock::new(AHashMap::new()),
        })
    }

    fn lexical_dir(&self, collection: &str) -> PathBuf {
        self.root.join("collections").join(collection).join("lexical")
    }

    fn lexical_for(&self, collection: &str) -> Result<Arc<RwLock<LexicalIndex>>> {
        if let Some(index) = self.lexical.read().unwrap().get(collection) {
            return Ok(index.clone());
        }

        let mut map = self.lexical.write().unwrap();
        if let Some(index) = map.get(collection) {
            return Ok(index.clone());
        }

        let index = LexicalIndex::new(self.lexical_dir(collection))
            .map_err(|e| backend_error(500, e.to_string()))?;
        let index = Arc::new(RwLock::new(index));
        map.insert(collection.to_string(), index.clone());
        Ok(index)
    }

    /// Vector index for a collection, rebuilt from the document store on
    /// first access
    fn vectors_for(&self, collection: &str, dimension: usize) -> Result<Arc<VectorIndex>> {
        if let Some(index) = self.vectors.read().unwrap().get(collection) {
            return Ok(index.clone());
        }

        let mut map = self.vectors.write().unwrap();
        if let Some(index) = map.get(collection) {
            return Ok(index.clone());
        }

        let index = VectorIndex::new(dimension, self.hnsw.hnsw_m, self.hnsw.hnsw_ef_construction);
        let existing = self.db.scan_embeddings(collection)?;
        if !existing.is_empty() {
            tracing::debug!(
                "Rebuilding vector index for '{}' from {} stored documents",
                collection,
                existing.len()
            );
            index
                .insert_batch(&existing)
                .map_err(|e| backend_error(500, e.to_string()))?;
        }

        let index = Arc::new(index);
        map.insert(collection.to_string(), index.clone());
        Ok(index)
    }

    fn write_item(&self, item: &BulkItem) -> std::result::Result<(), String> {
        let dimension = self
            .db
            .collection_dimension(&item.collection)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("collection does not exist: {}", item.collection))?;

        if item.document.embedding.len() != dimension {
            return Err(format!(
                "embedding dimension mismatch: expected {}, got {}",
                dimension,
                item.document.embedding.len()
            ));
        }

        let body = serde_json::to_string(&item.document.product).map_err(|e| e.to_string())?;
        self.db
            .upsert_document(&item.collection, item.id, &body, &item.document.embedding)
            .map_err(|e| e.to_string())?;

        let lexical = self.lexical_for(&item.collection).map_err(|e| e.to_string())?;
        lexical
            .write()
            .unwrap()
            .insert(item.id, &item.document.product)
            .map_err(|e| e.to_string())?;

        let vectors = self
            .vectors_for(&item.collection, dimension)
            .map_err(|e| e.to_string())?;
        vectors
            .insert(item.id, &item.document.embedding)
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    fn hydrate_hits(
        &self,
        collection: &str,
        scored_ids: Vec<(u64, f32)>,
        query_vector: &[f32],
        lexical_scored: bool,
    ) -> Result<Vec<BackendHit>> {
        let ids: Vec<u64> = scored_ids.iter().map(|(id, _)| *id).collect();
        let score_map: AHashMap<u64, f32> = scored_ids.into_iter().collect();

        let records = self.db.get_documents(collection, &ids)?;

        let mut hits = Vec::with_capacity(records.len());
        for record in records {
            let product: CanonicalProduct =
                serde_json::from_str(&record.body).map_err(|e| ProdexError::Json {
                    source: e,
                    context: format!("document {} in '{}'", record.id, collection),
                })?;

            let lexical_score = if lexical_scored {
                score_map.get(&record.id).copied().unwrap_or(0.0)
            } else {
                0.0
            };
            let vector_score = cosine_similarity(query_vector, &record.embedding);

            hits.push(BackendHit {
                id: record.id,
                document: IndexedDocument {
                    product,
                    embedding: record.embedding,
                },
                lexical_score,
                vector_score,
            });
        }

        Ok(hits)
    }

    /// Raw paginated listing of one collection, bypassing scoring.
    /// Returns the page of products and the collection's total count.
    pub fn list(
        &self,
        collection: &str,
        page: usize,
        size: usize,
    ) -> Result<(Vec<CanonicalProduct>, u64)> {
        if !self.db.collection_exists(collection)? {
            return Err(backend_error(404, format!("no such collection: {collection}")));
        }

        let records = self.db.list_documents(collection, page, size)?;
        let mut products = Vec::with_capacity(records.len());
        for record in records {
            let product = serde_json::from_str(&record.body).map_err(|e| ProdexError::Json {
                source: e,
                context: format!("document {} in '{}'", record.id, collection),
            })?;
            products.push(product);
        }

        let total = self.db.count_documents(collection)?;
        Ok((products, total))
    }

    pub fn collections(&self) -> Result<Vec<String>> {
        self.db.list_collections()
    }
}

impl SearchBackend for EmbeddedBackend {
    fn exists(&self, collection: &str) -> Result<bool> {
        self.db.collection_exists(collection)
    }

    fn create(
        &self,
        collection: &str,
        vector_field: &str,
        dimension: usize,
    ) -> Result<CreateOutcome> {
        if dimension == 0 {
            return Err(backend_error(
                400,
                format!("vector dimension must be positive for '{collection}'"),
            ));
        }

        let created = self.db.create_collection(collection, vector_field, dimension)?;

        if !created {
            // Racing creators both succeed, but a dimension conflict is a
            // real error
            let existing = self.db.collection_dimension(collection)?;
            if existing != Some(dimension) {
                return Err(backend_error(
                    400,
                    format!(
                        "collection '{}' already exists with dimension {:?}, requested {}",
                        collection, existing, dimension
                    ),
                ));
            }
            return Ok(CreateOutcome::AlreadyExists);
        }

        // Materialize the on-disk lexical index and the in-memory vector
        // index eagerly so the first bulk write pays no setup cost
        self.lexical_for(collection)?;
        self.vectors_for(collection, dimension)?;

        Ok(CreateOutcome::Created)
    }

    fn bulk_write(&self, items: Vec<BulkItem>) -> Result<BulkReport> {
        let mut outcomes = Vec::with_capacity(items.len());
        let mut touched: AHashSet<String> = AHashSet::new();
        let mut has_errors = false;

        for item in &items {
            match self.write_item(item) {
                Ok(()) => {
                    touched.insert(item.collection.clone());
                    outcomes.push(BulkItemOutcome {
                        id: item.id,
                        error: None,
                    });
                }
                Err(reason) => {
                    has_errors = true;
                    outcomes.push(BulkItemOutcome {
                        id: item.id,
                        error: Some(reason),
                    });
                }
            }
        }

        for collection in &touched {
            let lexical = self.lexical_for(collection)?;
            let mut lexical = lexical.write().unwrap();
            lexical
                .commit()
                .map_err(|e| backend_error(500, format!("commit failed for '{collection}': {e}")))?;
        }

        Ok(BulkReport {
            has_errors,
            items: outcomes,
        })
    }

    fn query(&self, collection: &str, spec: &QuerySpec) -> Result<QueryResponse> {
        let dimension = self
            .db
            .collection_dimension(collection)?
            .ok_or_else(|| backend_error(404, format!("no such collection: {collection}")))?;

        if spec.vector.len() != dimension {
            return Err(backend_error(
                400,
                format!(
                    "query vector dimension mismatch: expected {}, got {}",
                    dimension,
                    spec.vector.len()
                ),
            ));
        }

        let hits = match &spec.lexical {
            Some(clause) if !clause.terms.is_empty() => {
                let lexical = self.lexical_for(collection)?;
                let candidates = lexical
                    .read()
                    .unwrap()
                    .search(clause, spec.limit)
                    .map_err(|e| backend_error(500, e.to_string()))?;
                self.hydrate_hits(collection, candidates, &spec.vector, true)?
            }
            _ => {
                let vectors = self.vectors_for(collection, dimension)?;
                let neighbours = vectors
                    .search(&spec.vector, spec.limit, self.hnsw.hnsw_ef_search)
                    .map_err(|e| backend_error(400, e.to_string()))?;
                self.hydrate_hits(collection, neighbours, &spec.vector, false)?
            }
        };

        let total = hits.len();
        Ok(QueryResponse { hits, total })
    }
}

fn backend_error(status: u16, message: String) -> ProdexError {
    ProdexError::Backend { status, message }
}
