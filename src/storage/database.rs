//! SQLite database management with migrations
//!
//! Provides structured storage for collections and indexed documents

use crate::error::{ProdexError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// One stored document row
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: u64,
    /// Canonical product serialized as JSON
    pub body: String,
    pub embedding: Vec<f32>,
}

/// Database manager with migration support
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the database at `db_path`
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProdexError::Io {
                source: e,
                context: format!("Failed to create database directory: {:?}", parent),
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path);

        let pool = Pool::builder()
            .max_size(16)
            .build(manager)
            .map_err(|e| ProdexError::Storage(format!("Failed to create connection pool: {}", e)))?;

        {
            let conn = pool
                .get()
                .map_err(|e| ProdexError::Storage(format!("Failed to get connection: {}", e)))?;

            // WAL keeps the pipeline's writes from blocking query readers
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
        }

        let db = Self { pool };
        db.migrate()?;

        Ok(db)
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| ProdexError::Storage(format!("Failed to get connection: {}", e)))
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);
                conn.execute_batch(migration)?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Register a collection. Returns `true` if the row was inserted,
    /// `false` if the collection already existed (concurrent creators both
    /// succeed).
    pub fn create_collection(&self, name: &str, vector_field: &str, dimension: usize) -> Result<bool> {
        let conn = self.get_conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO collections (name, vector_field, dimension, created_at)
             VALUES (?1, ?2, ?3, datetime('now'))",
            params![name, vector_field, dimension as i64],
        )?;
        Ok(inserted == 1)
    }

    pub fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collection_dimension(name)?.is_some())
    }

    /// Vector dimension recorded for a collection, if it exists
    pub fn collection_dimension(&self, name: &str) -> Result<Option<usize>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT dimension FROM collections WHERE name = ?1")?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => {
                let dimension: i64 = row.get(0)?;
                Ok(Some(dimension as usize))
            }
            None => Ok(None),
        }
    }

    /// Collection names, sorted
    pub fn list_collections(&self) -> Result<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for name in rows {
            names.push(name?);
        }
        Ok(names)
    }

    /// Insert or replace one document
    pub fn upsert_document(
        &self,
        collection: &str,
        id: u64,
        body: &str,
        embedding: &[f32],
    ) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO documents (collection, id, body, embedding)
             VALUES (?1, ?2, ?3, ?4)",
            params![collection, id as i64, body, embedding_to_bytes(embedding)],
        )?;
        Ok(())
    }

    /// Fetch documents by id; missing ids are silently absent from the result
    pub fn get_documents(&self, collection: &str, ids: &[u64]) -> Result<Vec<DocumentRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, body, embedding FROM documents WHERE collection = ?1 AND id = ?2",
        )?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let mut rows = stmt.query(params![collection, *id as i64])?;
            if let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
        }
        Ok(records)
    }

    /// All (id, embedding) pairs of a collection, for vector-index rebuilds
    pub fn scan_embeddings(&self, collection: &str) -> Result<Vec<(u64, Vec<f32>)>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT id, embedding FROM documents WHERE collection = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![collection], |row| {
            let id: i64 = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok((id as u64, blob))
        })?;

        let mut pairs = Vec::new();
        for row in rows {
            let (id, blob) = row?;
            pairs.push((id, bytes_to_embedding(&blob)));
        }
        Ok(pairs)
    }

    /// Raw paginated listing, ordered by id ascending, bypassing scoring
    pub fn list_documents(
        &self,
        collection: &str,
        page: usize,
        size: usize,
    ) -> Result<Vec<DocumentRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, body, embedding FROM documents
             WHERE collection = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
        )?;
        let mut rows = stmt.query(params![collection, size as i64, (page * size) as i64])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(row_to_record(row)?);
        }
        Ok(records)
    }

    pub fn count_documents(&self, collection: &str) -> Result<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.get_conn()?;

        let collection_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM collections", [], |row| row.get(0))?;

        let document_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

        Ok(DbStats {
            collection_count: collection_count as usize,
            document_count: document_count as usize,
        })
    }
}

/// Database statistics
#[derive(Debug)]
pub struct DbStats {
    pub collection_count: usize,
    pub document_count: usize,
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<DocumentRecord> {
    let id: i64 = row.get(0)?;
    let body: String = row.get(1)?;
    let blob: Vec<u8> = row.get(2)?;
    Ok(DocumentRecord {
        id: id as u64,
        body,
        embedding: bytes_to_embedding(&blob),
    })
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Collections table: one row per (dataset, model) target collection
    CREATE TABLE collections (
        name TEXT PRIMARY KEY,
        vector_field TEXT NOT NULL,
        dimension INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );

    -- Documents table: canonical product JSON plus its embedding
    CREATE TABLE documents (
        collection TEXT NOT NULL REFERENCES collections(name),
        id INTEGER NOT NULL,
        body TEXT NOT NULL,
        embedding BLOB NOT NULL,
        PRIMARY KEY (collection, id)
    );

    CREATE INDEX idx_documents_collection ON documents(collection);
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_db() -> (Database, TempDir) {
        let temp = TempDir::new().unwrap();
        let db = Database::new(&temp.path().join("prodex.db")).unwrap();
        (db, temp)
    }

    #[test]
    fn create_collection_is_idempotent() {
        let (db, _temp) = open_db();

        assert!(db.create_collection("products_a_m", "embedding", 8).unwrap());
        assert!(!db.create_collection("products_a_m", "embedding", 8).unwrap());
        assert!(db.collection_exists("products_a_m").unwrap());
        assert_eq!(db.collection_dimension("products_a_m").unwrap(), Some(8));
        assert_eq!(db.collection_dimension("missing").unwrap(), None);
    }

    #[test]
    fn document_roundtrip_preserves_embedding() {
        let (db, _temp) = open_db();
        db.create_collection("c", "embedding", 3).unwrap();

        let embedding = vec![0.25_f32, -1.5, 3.75];
        db.upsert_document("c", 7, r#"{"id":"p7"}"#, &embedding).unwrap();

        let records = db.get_documents("c", &[7, 99]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 7);
        assert_eq!(records[0].body, r#"{"id":"p7"}"#);
        assert_eq!(records[0].embedding, embedding);
    }

    #[test]
    fn listing_is_paginated_and_ordered() {
        let (db, _temp) = open_db();
        db.create_collection("c", "embedding", 1).unwrap();

        for id in 1..=5u64 {
            db.upsert_document("c", id, &format!(r#"{{"id":"{id}"}}"#), &[id as f32])
                .unwrap();
        }

        let page0 = db.list_documents("c", 0, 2).unwrap();
        let page1 = db.list_documents("c", 1, 2).unwrap();
        let page2 = db.list_documents("c", 2, 2).unwrap();

        assert_eq!(page0.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(page1.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(page2.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5]);
        assert_eq!(db.count_documents("c").unwrap(), 5);
    }

    #[test]
    fn scan_embeddings_returns_all_pairs() {
        let (db, _temp) = open_db();
        db.create_collection("c", "embedding", 2).unwrap();

        db.upsert_document("c", 1, "{}", &[1.0, 0.0]).unwrap();
        db.upsert_document("c", 2, "{}", &[0.0, 1.0]).unwrap();

        let pairs = db.scan_embeddings("c").unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (1, vec![1.0, 0.0]));
        assert_eq!(pairs[1], (2, vec![0.0, 1.0]));
    }
}
