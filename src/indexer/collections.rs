//! Lazy, idempotent collection creation

use super::collection_name;
use crate::backend::{CreateOutcome, SearchBackend};
use crate::encoder::EncoderRegistry;
use crate::error::{ProdexError, Result};
use ahash::AHashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ensures target collections exist before the first write to each
/// (dataset, model) pair.
///
/// The vector field is sized to the producing encoder's dimension at
/// creation time. Ensured pairs are memoized so repeated writes skip the
/// backend exists-check; creation races are resolved by backend-side
/// idempotency, not locks.
pub struct CollectionManager {
    backend: Arc<dyn SearchBackend>,
    registry: Arc<EncoderRegistry>,
    ensured: Mutex<AHashSet<String>>,
    create_timeout: Duration,
}

impl CollectionManager {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        registry: Arc<EncoderRegistry>,
        create_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            registry,
            ensured: Mutex::new(AHashSet::new()),
            create_timeout,
        }
    }

    /// Ensure `products_{dataset}_{model}` exists; returns the collection
    /// name. Idempotent: "already exists" is success, not failure.
    pub async fn ensure_collection(&self, dataset: &str, model: &str) -> Result<String> {
        let name = collection_name(dataset, model);

        if self.ensured.lock().unwrap().contains(&name) {
            return Ok(name);
        }

        let dimension = self.registry.dimension(model)?;

        let backend = self.backend.clone();
        let target = name.clone();
        let task = tokio::task::spawn_blocking(move || -> Result<CreateOutcome> {
            if backend.exists(&target)? {
                return Ok(CreateOutcome::AlreadyExists);
            }
            backend.create(&target, "embedding", dimension)
        });

        let outcome = tokio::time::timeout(self.create_timeout, task)
            .await
            .map_err(|_| ProdexError::BackendUnavailable {
                message: format!(
                    "collection create for '{}' timed out after {:?}",
                    name, self.create_timeout
                ),
            })?
            .map_err(|e| ProdexError::Other(anyhow::anyhow!("create task panicked: {e}")))??;

        match outcome {
            CreateOutcome::Created => {
                tracing::info!("Created collection '{}' ({}D vector field)", name, dimension);
            }
            CreateOutcome::AlreadyExists => {
                tracing::debug!("Collection '{}' already exists", name);
            }
        }

        self.ensured.lock().unwrap().insert(name.clone());
        Ok(name)
    }
}
