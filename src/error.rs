use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Prodex
#[derive(Error, Debug)]
pub enum ProdexError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// A source record whose identity cannot be derived at all.
    /// Recoverable: the pipeline logs and skips the record.
    #[error("Malformed record {ordinal} in dataset '{dataset}': {reason}")]
    MalformedRecord {
        dataset: String,
        ordinal: usize,
        reason: String,
    },

    /// Requested embedding model key is not registered
    #[error("Unknown embedding model: {key}")]
    UnknownModel { key: String },

    /// Requested dataset key has no configured schema
    #[error("Unknown dataset: {key}")]
    UnknownDataset { key: String },

    /// Embedding generation failed
    #[error("Encoding failure: {0}")]
    Encoding(String),

    /// Backend rejected or failed a call; status and message are
    /// propagated verbatim
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Backend could not be reached or did not answer in time
    #[error("Backend unavailable: {message}")]
    BackendUnavailable { message: String },

    /// Document store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Prodex operations
pub type Result<T> = std::result::Result<T, ProdexError>;
