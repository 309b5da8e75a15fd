//! Configuration management for Prodex
//!
//! One TOML file drives the whole engine: the encoder table, the
//! per-dataset schema-mapping tables, pipeline tuning, and query tuning.
//! Everything is validated once at startup, not inline per record.

use crate::catalog::DatasetSchema;
use crate::error::{ProdexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    /// Encoder table: model key -> embedding model name
    pub encoders: HashMap<String, String>,
    /// Dataset schema table: dataset key -> field mapping
    pub datasets: HashMap<String, DatasetSchema>,
    pub pipeline: PipelineConfig,
    pub index: IndexConfig,
    pub query: QueryConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the embedded backend (document store plus
    /// per-collection lexical indexes)
    pub data_dir: PathBuf,
}

/// Indexing pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bulk flush threshold in documents
    pub batch_size: usize,
    /// Texts per embedding model call
    pub encode_batch_size: usize,
    /// Concurrent encode chunks in flight
    pub max_concurrent: usize,
    /// Timeout for one bulk write call
    pub bulk_timeout_secs: u64,
    /// Timeout for collection creation (infrequent, may allocate heavily
    /// backend-side)
    pub create_timeout_secs: u64,
}

/// HNSW parameters for the embedded backend's vector indexes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub hnsw_ef_search: usize,
}

/// Query-time scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Weight of the normalized vector score
    pub vector_weight: f32,
    /// Weight of the normalized lexical score
    pub text_weight: f32,
    /// Raw lexical scores are clamped to this cap before normalization.
    /// Empirically calibrated; retune for new corpora.
    pub max_score_cap: f32,
    /// Candidate pool over-fetch factor (top_k x multiplier)
    pub search_multiplier: usize,
    /// Timeout for one backend query call
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ProdexError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ProdexError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ProdexError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: PRODEX_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("PRODEX_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__DATA_DIR" => {
                self.storage.data_dir = PathBuf::from(value);
            }
            "PIPELINE__BATCH_SIZE" => {
                self.pipeline.batch_size = parse_env(path, value)?;
            }
            "QUERY__VECTOR_WEIGHT" => {
                self.query.vector_weight = parse_env(path, value)?;
            }
            "QUERY__TEXT_WEIGHT" => {
                self.query.text_weight = parse_env(path, value)?;
            }
            "QUERY__MAX_SCORE_CAP" => {
                self.query.max_score_cap = parse_env(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ProdexError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("prodex").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| ProdexError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".prodex"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| ProdexError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        let mut encoders = HashMap::new();
        encoders.insert("minilm".to_string(), "all-MiniLM-L6-v2".to_string());
        encoders.insert("bge-small".to_string(), "bge-small-en-v1.5".to_string());
        encoders.insert("bge-base".to_string(), "bge-base-en-v1.5".to_string());
        encoders.insert(
            "multilingual".to_string(),
            "paraphrase-multilingual-mpnet-base-v2".to_string(),
        );

        let mut datasets = HashMap::new();
        datasets.insert("amazon".to_string(), DatasetSchema::amazon());
        datasets.insert("wildberries".to_string(), DatasetSchema::wildberries());

        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("~/.prodex"),
            },
            encoders,
            datasets,
            pipeline: PipelineConfig::default(),
            index: IndexConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 400,
            encode_batch_size: 32,
            max_concurrent: 4,
            bulk_timeout_secs: 60,
            create_timeout_secs: 60,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 50,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.7,
            text_weight: 0.3,
            max_score_cap: 10.0,
            search_multiplier: 4,
            timeout_secs: 30,
        }
    }
}
