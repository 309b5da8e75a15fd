//! Embedding encoders
//!
//! An [`Encoder`] maps text to a fixed-length vector. The
//! [`EncoderRegistry`] holds one named encoder per configured model key and
//! is built once at startup, then shared read-only across the indexing
//! pipeline and the query engine.

mod provider;
mod registry;

pub use provider::{EncodeError, Encoder, FastEmbedEncoder};
pub use registry::EncoderRegistry;
