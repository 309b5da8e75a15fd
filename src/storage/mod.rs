//! Embedded document store
//!
//! SQLite-backed storage for collections and their documents. The backend
//! owns documents once written; lexical and vector indexes are derived
//! views over this store.

mod database;

pub use database::{Database, DbStats, DocumentRecord};
