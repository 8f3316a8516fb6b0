//! redb-based local cache tier
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `documents` | `(collection, id)` | JSON bytes | Last known copy of remote documents |
//!
//! The remote store stays authoritative. This tier is written through on
//! every successful remote read/write and only read while the remote is
//! unreachable; nothing is ever merged back from here.
//!
//! Note: redb operations are synchronous; they are short and local.

use super::Document;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = (collection, id), value = JSON-serialized document
const DOCUMENTS_TABLE: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("documents");

/// Local cache errors
#[derive(Debug, Error)]
pub enum LocalCacheError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type LocalCacheResult<T> = Result<T, LocalCacheError>;

/// Durable local document cache backed by redb
#[derive(Clone)]
pub struct LocalCache {
    db: Arc<Database>,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache").field("db", &"<redb::Database>").finish()
    }
}

impl LocalCache {
    /// Open or create the cache file at the given path
    pub fn open(path: impl AsRef<Path>) -> LocalCacheResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory cache (tests, ephemeral nodes)
    pub fn open_in_memory() -> LocalCacheResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> LocalCacheResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DOCUMENTS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get_document(&self, collection: &str, id: &str) -> LocalCacheResult<Option<Document>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS_TABLE)?;
        match table.get((collection, id))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_documents(&self, collection: &str) -> LocalCacheResult<Vec<(String, Document)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS_TABLE)?;

        let mut docs = Vec::new();
        for result in table.range((collection, "")..)? {
            let (key, value) = result?;
            let (key_collection, id) = key.value();
            if key_collection != collection {
                break;
            }
            docs.push((id.to_string(), serde_json::from_slice(value.value())?));
        }
        Ok(docs)
    }

    pub fn put_document(&self, collection: &str, id: &str, doc: &Document) -> LocalCacheResult<()> {
        let bytes = serde_json::to_vec(doc)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(DOCUMENTS_TABLE)?;
            table.insert((collection, id), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Returns whether the document existed
    pub fn remove_document(&self, collection: &str, id: &str) -> LocalCacheResult<bool> {
        let txn = self.db.begin_write()?;
        let existed = {
            let mut table = txn.open_table(DOCUMENTS_TABLE)?;
            table.remove((collection, id))?.is_some()
        };
        txn.commit()?;
        Ok(existed)
    }

    /// Replace a whole collection with a fresh remote snapshot (single transaction)
    pub fn replace_collection(
        &self,
        collection: &str,
        docs: &[(String, Document)],
    ) -> LocalCacheResult<()> {
        let existing: Vec<String> = self
            .list_documents(collection)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(DOCUMENTS_TABLE)?;
            for id in &existing {
                table.remove((collection, id.as_str()))?;
            }
            for (id, doc) in docs {
                let bytes = serde_json::to_vec(doc)?;
                table.insert((collection, id.as_str()), bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }
}
