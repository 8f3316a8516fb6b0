//! Document Store Module
//!
//! The ledger's only interface to persistence: a collection/key document
//! store. Backends:
//!
//! | Backend | Purpose |
//! |---------|---------|
//! | [`MemoryStore`] | In-process store (tests, single-node dev) |
//! | [`HttpDocumentStore`] | Remote REST document store |
//! | [`LocalCache`] | Durable redb tier, write-through cache of the remote |
//!
//! [`StoreClient`] wraps a remote backend with an explicit lifecycle
//! (`connect` / `close`), per-call timeout and retry with backoff.

pub mod client;
pub mod http;
pub mod local;
pub mod memory;
pub mod retry;

pub use client::{StoreBackend, StoreClient, StoreConfig};
pub use http::HttpDocumentStore;
pub use local::{LocalCache, LocalCacheError};
pub use memory::MemoryStore;
pub use retry::{BackoffStrategy, RetryPolicy};

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Collections
// =============================================================================

pub const PRODUCTS: &str = "products";
pub const WAREHOUSES: &str = "warehouses";
pub const STORES: &str = "stores";
pub const TRANSFERS: &str = "transfers";
pub const PROFILES: &str = "profiles";
/// 旧版独立库存记录 (per product/location documents), read-only
pub const LEGACY_PRODUCT_STOCKS: &str = "productStocks";

/// A stored document (JSON object)
pub type Document = Value;

/// Document store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Worth retrying (outage or slow call, not a missing/bad document)
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Collection/key document store contract
///
/// `get`, `update` and `delete` fail with [`StoreError::NotFound`] when the
/// document does not exist. `update` is a shallow merge of top-level fields.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Document>;
    /// All documents of a collection as `(id, document)` pairs, ordered by id
    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Document)>>;
    async fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()>;
    async fn update(&self, collection: &str, id: &str, partial: Document) -> StoreResult<()>;
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}

/// Shallow-merge `partial` into `target` (top-level keys replace)
pub fn merge_document(target: &mut Document, partial: Document) -> StoreResult<()> {
    let Value::Object(fields) = partial else {
        return Err(StoreError::InvalidDocument(
            "partial update must be a JSON object".into(),
        ));
    };
    match target {
        Value::Object(existing) => {
            for (key, value) in fields {
                existing.insert(key, value);
            }
            Ok(())
        }
        _ => {
            *target = Value::Object(fields);
            Ok(())
        }
    }
}
