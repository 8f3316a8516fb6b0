//! Store client - explicit connection lifecycle around a document store
//!
//! Every call goes through [`StoreClient::call`]: a per-call timeout, then
//! retry with backoff for transient failures. After [`StoreClient::close`]
//! every call fails with [`StoreError::Unavailable`].

use super::{
    Document, DocumentStore, HttpDocumentStore, MemoryStore, RetryPolicy, StoreError, StoreResult,
};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Which remote backend to connect to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store (dev / tests)
    Memory,
    /// REST document store
    Http { base_url: String },
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Http { .. } => "http",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Upper bound for a single store call
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

/// Shared handle to the authoritative store
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<dyn DocumentStore>,
    backend: &'static str,
    timeout: Duration,
    retry: RetryPolicy,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("backend", &self.backend)
            .field("timeout", &self.timeout)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl StoreClient {
    /// Connect to the configured backend
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let inner: Arc<dyn DocumentStore> = match &config.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Http { base_url } => {
                Arc::new(HttpDocumentStore::new(base_url.clone(), config.timeout)?)
            }
        };

        tracing::info!(
            backend = config.backend.name(),
            timeout_ms = config.timeout.as_millis() as u64,
            max_retries = config.retry.max_retries,
            "Document store connected"
        );

        Ok(Self {
            inner,
            backend: config.backend.name(),
            timeout: config.timeout,
            retry: config.retry.clone(),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Wrap an existing store (tests, embedding)
    pub fn from_store(store: Arc<dyn DocumentStore>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            inner: store,
            backend: "custom",
            timeout,
            retry,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Client over a shared [`MemoryStore`], single attempt per call
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        let mut client = Self::from_store(store, Duration::from_secs(5), RetryPolicy::none());
        client.backend = "memory";
        client
    }

    /// Close the connection; shared by all clones
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!(backend = self.backend, "Document store connection closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Run one store operation with timeout + retry
    async fn call<T, F, Fut>(&self, op: &'static str, collection: &str, f: F) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            if self.is_closed() {
                return Err(StoreError::Unavailable("store connection closed".into()));
            }

            let result = match tokio::time::timeout(self.timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(self.timeout)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(err) if self.retry.should_retry(&err, attempt) => {
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(
                        op,
                        collection,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Store call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn get(&self, collection: &str, id: &str) -> StoreResult<Document> {
        self.call("get", collection, || self.inner.get(collection, id))
            .await
    }

    /// `get` with `NotFound` mapped to `None`
    pub async fn get_optional(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        match self.get(collection, id).await {
            Ok(doc) => Ok(Some(doc)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Document)>> {
        self.call("list", collection, || self.inner.list(collection))
            .await
    }

    pub async fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        self.call("set", collection, || {
            self.inner.set(collection, id, doc.clone())
        })
        .await
    }

    pub async fn update(&self, collection: &str, id: &str, partial: Document) -> StoreResult<()> {
        self.call("update", collection, || {
            self.inner.update(collection, id, partial.clone())
        })
        .await
    }

    pub async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.call("delete", collection, || self.inner.delete(collection, id))
            .await
    }
}
