//! In-process document store
//!
//! Holds collections in memory. The availability switch and per-document
//! write failures simulate outages of a remote store.

use super::{Document, DocumentStore, StoreError, StoreResult, merge_document};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug)]
pub struct MemoryStore {
    /// collection -> (id -> document)
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    online: AtomicBool,
    /// Documents whose writes fail with `Unavailable`
    failing_writes: RwLock<HashSet<(String, String)>>,
    calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            online: AtomicBool::new(true),
            failing_writes: RwLock::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Toggle availability; offline calls fail with `Unavailable`
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Make every write to one document fail (reads still succeed)
    pub fn fail_writes_to(&self, collection: &str, id: &str) {
        self.failing_writes
            .write()
            .insert((collection.to_string(), id.to_string()));
    }

    pub fn clear_write_failures(&self) {
        self.failing_writes.write().clear();
    }

    /// Number of calls received (including failed ones)
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of documents in a collection (bypasses availability)
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Read a document directly (bypasses availability)
    pub fn peek(&self, collection: &str, id: &str) -> Option<Document> {
        self.collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    fn check_online(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.is_online() {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".into()))
        }
    }

    fn check_writable(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check_online()?;
        let key = (collection.to_string(), id.to_string());
        if self.failing_writes.read().contains(&key) {
            return Err(StoreError::Unavailable(format!(
                "write rejected for {collection}/{id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Document> {
        self.check_online()?;
        self.peek(collection, id)
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Document)>> {
        self.check_online()?;
        Ok(self
            .collections
            .read()
            .get(collection)
            .map(|docs| docs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        self.check_writable(collection, id)?;
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, partial: Document) -> StoreResult<()> {
        self.check_writable(collection, id)?;
        let mut collections = self.collections.write();
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        merge_document(doc, partial)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check_writable(collection, id)?;
        self.collections
            .write()
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, id))
    }
}
