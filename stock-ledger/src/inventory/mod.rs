//! Inventory Store Adapter
//!
//! Loads and saves products against the remote document store.
//!
//! # 两级存储
//!
//! ```text
//! remote (authoritative) ──write-through──► LocalCache (redb)
//!        │ outage
//!        └──────────────── reads fall back ─┘
//! ```
//!
//! Writes never go to the local tier alone: a save during an outage fails
//! with `StoreUnavailable`. No version check is made; the last write wins.
//!
//! Every read-modify-write of a product runs under its [`ProductLocks`] entry.

pub mod locks;

pub use locks::{KeyedGuard, KeyedLocks, ProductLocks};

use crate::core::{StockError, StockResult};
use crate::location::LocationRegistry;
use crate::stock::codec::{LegacyStockRecord, StockSource, canonical_key, same_location, to_persisted_map};
use crate::stock::{coerce, recompute_total, validate_with};
use crate::store::{Document, LEGACY_PRODUCT_STOCKS, LocalCache, PRODUCTS, StoreClient, StoreError};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value, json};
use shared::models::{Product, StockEntry};
use shared::util::now_millis;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Actor recorded for writes without a user context
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Clone)]
pub struct InventoryStore {
    remote: StoreClient,
    local: Option<LocalCache>,
    registry: LocationRegistry,
    locks: Arc<ProductLocks>,
    /// Raw products written on first run when the remote is empty
    seed: Arc<Vec<Value>>,
}

impl std::fmt::Debug for InventoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryStore")
            .field("remote", &self.remote)
            .field("local", &self.local.is_some())
            .field("seed", &self.seed.len())
            .finish()
    }
}

impl InventoryStore {
    pub fn new(remote: StoreClient, registry: LocationRegistry) -> Self {
        Self {
            remote,
            local: None,
            registry,
            locks: Arc::new(ProductLocks::new()),
            seed: Arc::new(Vec::new()),
        }
    }

    pub fn with_local_cache(mut self, local: LocalCache) -> Self {
        self.local = Some(local);
        self
    }

    pub fn with_seed(mut self, seed: Vec<Value>) -> Self {
        self.seed = Arc::new(seed);
        self
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    pub fn locks(&self) -> &ProductLocks {
        &self.locks
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Load every product
    ///
    /// Empty remote: write the seed dataset and return it. Remote outage:
    /// serve the last copy from the local tier.
    pub async fn load(&self) -> StockResult<Vec<Product>> {
        let docs = match self.remote.list(PRODUCTS).await {
            Ok(docs) => docs,
            Err(err) if err.is_transient() => return self.load_from_local(&err),
            Err(err) => return Err(err.into()),
        };

        if docs.is_empty() && !self.seed.is_empty() {
            return self.seed_products().await;
        }

        if let Some(local) = &self.local
            && let Err(e) = local.replace_collection(PRODUCTS, &docs)
        {
            tracing::warn!(error = %e, "Failed to refresh local product cache");
        }

        let legacy = self.legacy_records().await;
        let products: Vec<Product> = docs
            .into_iter()
            .map(|(id, doc)| self.decode(&id, doc, &legacy))
            .collect();
        tracing::debug!(count = products.len(), "Products loaded from remote store");
        Ok(products)
    }

    fn load_from_local(&self, cause: &StoreError) -> StockResult<Vec<Product>> {
        let Some(local) = &self.local else {
            tracing::error!(error = %cause, "Remote store unavailable and no local cache configured");
            return Err(StockError::StoreUnavailable(cause.to_string()));
        };

        let docs = local.list_documents(PRODUCTS)?;
        tracing::warn!(
            error = %cause,
            count = docs.len(),
            "Remote store unavailable, serving products from local cache"
        );
        let no_legacy = HashMap::new();
        Ok(docs
            .into_iter()
            .map(|(id, doc)| self.decode(&id, doc, &no_legacy))
            .collect())
    }

    async fn seed_products(&self) -> StockResult<Vec<Product>> {
        tracing::info!(count = self.seed.len(), "Remote product collection empty, seeding");
        let mut products = Vec::with_capacity(self.seed.len());
        for raw in self.seed.iter() {
            let product = validate_with(raw, &self.registry);
            let _guard = self.locks.lock(&product.id).await;
            products.push(self.save_unlocked(product, SYSTEM_ACTOR).await?);
        }
        Ok(products)
    }

    /// Load one product (falls back to the local tier during an outage)
    pub async fn get(&self, product_id: &str) -> StockResult<Product> {
        match self.remote.get(PRODUCTS, product_id).await {
            Ok(doc) => {
                let legacy = if has_embedded_stock(&doc) {
                    HashMap::new()
                } else {
                    self.legacy_records().await
                };
                Ok(self.decode(product_id, doc, &legacy))
            }
            Err(err) if err.is_transient() => {
                let cached = match &self.local {
                    Some(local) => local.get_document(PRODUCTS, product_id)?,
                    None => None,
                };
                match cached {
                    Some(doc) => {
                        tracing::warn!(product_id, error = %err, "Serving product from local cache");
                        Ok(self.decode(product_id, doc, &HashMap::new()))
                    }
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Remote-only read used inside read-modify-write
    async fn get_authoritative(&self, product_id: &str) -> StockResult<Product> {
        let doc = self.remote.get(PRODUCTS, product_id).await?;
        let legacy = if has_embedded_stock(&doc) {
            HashMap::new()
        } else {
            self.legacy_records().await
        };
        Ok(self.decode(product_id, doc, &legacy))
    }

    fn decode(
        &self,
        id: &str,
        mut doc: Document,
        legacy: &HashMap<String, Vec<LegacyStockRecord>>,
    ) -> Product {
        if let Value::Object(fields) = &mut doc {
            fields.entry("id").or_insert_with(|| json!(id));
        }
        let embedded = has_embedded_stock(&doc);
        let mut product = validate_with(&doc, &self.registry);

        if !embedded && let Some(records) = legacy.get(&product.id) {
            self.apply_legacy(&mut product, records);
        }
        product
    }

    /// Legacy records only fill breakdowns the document itself lacks
    fn apply_legacy(&self, product: &mut Product, records: &[LegacyStockRecord]) {
        if product.has_variations {
            for variation in product.variations.iter_mut() {
                if !variation.stock_entries.is_empty() {
                    continue;
                }
                let own: Vec<LegacyStockRecord> = records
                    .iter()
                    .filter(|r| r.variation_id.as_deref() == Some(variation.id.as_str()))
                    .cloned()
                    .collect();
                variation.stock_entries = StockSource::Legacy(own).into_entries(&self.registry);
            }
        } else {
            let flat: Vec<LegacyStockRecord> = records
                .iter()
                .filter(|r| r.variation_id.is_none())
                .cloned()
                .collect();
            product.stock_entries = StockSource::Legacy(flat).into_entries(&self.registry);
        }
        recompute_total(product);
        tracing::debug!(product_id = %product.id, records = records.len(), "Decoded legacy stock records");
    }

    /// product id → legacy records; best effort
    async fn legacy_records(&self) -> HashMap<String, Vec<LegacyStockRecord>> {
        let docs = match self.remote.list(LEGACY_PRODUCT_STOCKS).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::debug!(error = %e, "Legacy stock records unavailable");
                return HashMap::new();
            }
        };
        let mut grouped: HashMap<String, Vec<LegacyStockRecord>> = HashMap::new();
        for (_, doc) in docs {
            if let Some(record) = LegacyStockRecord::from_document(&doc) {
                grouped.entry(record.product_id.clone()).or_default().push(record);
            }
        }
        grouped
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn save(&self, product: Product) -> StockResult<Product> {
        self.save_as(product, SYSTEM_ACTOR).await
    }

    /// Validate, recompute the total and write the product
    pub async fn save_as(&self, product: Product, actor: &str) -> StockResult<Product> {
        let _guard = self.locks.lock(&product.id).await;
        self.save_unlocked(product, actor).await
    }

    /// Locked read-modify-write of one product
    ///
    /// Nothing is written when `f` fails.
    pub async fn mutate<T, F>(&self, product_id: &str, actor: &str, f: F) -> StockResult<(Product, T)>
    where
        F: FnOnce(&mut Product) -> StockResult<T> + Send,
        T: Send,
    {
        let _guard = self.locks.lock(product_id).await;
        let mut product = self.get_authoritative(product_id).await?;
        let value = f(&mut product)?;
        let saved = self.save_unlocked(product, actor).await?;
        Ok((saved, value))
    }

    /// Caller holds the product lock
    async fn save_unlocked(&self, product: Product, actor: &str) -> StockResult<Product> {
        // 统一规范化入口
        let raw = serde_json::to_value(&product)?;
        let mut product = validate_with(&raw, &self.registry);
        recompute_total(&mut product);

        let now = now_millis();
        let existing = self.remote.get_optional(PRODUCTS, &product.id).await?;
        let is_new = existing.is_none();
        let created_at = existing
            .as_ref()
            .map(|doc| coerce::number(doc.get("createdAt")) as i64)
            .filter(|ts| *ts > 0)
            .unwrap_or(now);
        let mut doc = encode_product(&product, actor, created_at, now);

        match &existing {
            Some(current) => {
                clear_superseded(&mut doc, current);
                self.remote.update(PRODUCTS, &product.id, doc.clone()).await?
            }
            None => self.remote.set(PRODUCTS, &product.id, doc.clone()).await?,
        }

        let stored = self.verify_write(&product).await.unwrap_or_else(|| {
            let mut merged = existing.unwrap_or_else(|| json!({}));
            if let (Value::Object(target), Value::Object(fields)) = (&mut merged, doc) {
                target.extend(fields);
            }
            merged
        });

        if let Some(local) = &self.local
            && let Err(e) = local.put_document(PRODUCTS, &product.id, &stored)
        {
            tracing::warn!(product_id = %product.id, error = %e, "Local cache write-through failed");
        }

        tracing::debug!(
            product_id = %product.id,
            total = product.current_stock,
            created = is_new,
            "Product saved"
        );
        Ok(product)
    }

    /// Re-read after write; a mismatch is only logged
    async fn verify_write(&self, expected: &Product) -> Option<Document> {
        let doc = match self.remote.get(PRODUCTS, &expected.id).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(product_id = %expected.id, error = %e, "Save verification read failed");
                return None;
            }
        };

        let stored = validate_with(&doc, &self.registry);
        let stock_matches = stored.current_stock == expected.current_stock
            && to_persisted_map(&stored.stock_entries) == to_persisted_map(&expected.stock_entries);
        if !stock_matches {
            tracing::warn!(
                product_id = %expected.id,
                expected_total = expected.current_stock,
                stored_total = stored.current_stock,
                "Saved product differs from re-read document"
            );
        }
        Some(doc)
    }

    /// Remove a product; legacy per-location records are removed best effort
    pub async fn delete(&self, product_id: &str) -> StockResult<()> {
        let _guard = self.locks.lock(product_id).await;
        self.remote.delete(PRODUCTS, product_id).await?;

        if let Some(local) = &self.local
            && let Err(e) = local.remove_document(PRODUCTS, product_id)
        {
            tracing::warn!(product_id, error = %e, "Failed to evict product from local cache");
        }

        match self.remote.list(LEGACY_PRODUCT_STOCKS).await {
            Ok(docs) => {
                for (doc_id, doc) in docs {
                    let owned = LegacyStockRecord::from_document(&doc)
                        .is_some_and(|r| r.product_id == product_id);
                    if !owned {
                        continue;
                    }
                    if let Err(e) = self.remote.delete(LEGACY_PRODUCT_STOCKS, &doc_id).await {
                        tracing::warn!(product_id, record = %doc_id, error = %e, "Failed to delete legacy stock record");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(product_id, error = %e, "Legacy stock cleanup skipped");
            }
        }

        tracing::info!(product_id, "Product deleted");
        Ok(())
    }

    // =========================================================================
    // Locations
    // =========================================================================

    /// Ids of products holding stock (> 0) at the location
    pub async fn location_in_use(&self, location_id: &str) -> StockResult<Vec<String>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|p| held_at(p, location_id) > 0)
            .map(|p| p.id)
            .collect())
    }

    /// Remove every stock entry for a location; returns products changed
    pub async fn purge_stock(&self, location_id: &str, actor: &str) -> StockResult<usize> {
        let affected: Vec<String> = self
            .load()
            .await?
            .into_iter()
            .filter(|p| mentions(p, location_id))
            .map(|p| p.id)
            .collect();

        for product_id in &affected {
            let (_, removed) = self
                .mutate(product_id, actor, |product| {
                    let mut removed = remove_location(&mut product.stock_entries, location_id);
                    for variation in product.variations.iter_mut() {
                        removed += remove_location(&mut variation.stock_entries, location_id);
                    }
                    Ok(removed)
                })
                .await?;
            if removed > 0 {
                tracing::warn!(
                    product_id = %product_id,
                    location_id,
                    quantity = removed,
                    "Discarded residual stock at removed location"
                );
            }
        }
        Ok(affected.len())
    }

    /// Delete a location
    ///
    /// Refuses while products hold stock there unless `purge` is set, in
    /// which case the residual stock is discarded first.
    pub async fn retire_location(&self, location_id: &str, purge: bool, actor: &str) -> StockResult<()> {
        let holders = self.location_in_use(location_id).await?;
        if !holders.is_empty() {
            if !purge {
                return Err(StockError::LocationInUse {
                    location_id: location_id.to_string(),
                    products: holders.len(),
                });
            }
            tracing::warn!(location_id, products = holders.len(), "Retiring location with stock");
        }
        self.purge_stock(location_id, actor).await?;
        self.registry.delete(location_id).await?;
        Ok(())
    }
}

/// Normalized-shape fields the persisted shape replaces
const SUPERSEDED_FIELDS: [&str; 2] = ["stockEntries", "currentStock"];

fn has_embedded_stock(doc: &Document) -> bool {
    coerce::field(doc, &["warehouseStocks", "stockEntries"]).is_some()
}

/// Null out normalized fields an update would otherwise leave behind
fn clear_superseded(doc: &mut Document, current: &Document) {
    let Value::Object(fields) = doc else {
        return;
    };
    for key in SUPERSEDED_FIELDS {
        if current.get(key).is_some_and(|v| !v.is_null()) {
            fields.insert(key.to_string(), Value::Null);
        }
    }
}

fn held_at(product: &Product, location_id: &str) -> u64 {
    let sum_at = |entries: &[StockEntry]| -> u64 {
        entries
            .iter()
            .filter(|e| same_location(&e.location_id, location_id))
            .map(|e| u64::from(e.quantity))
            .sum()
    };
    sum_at(&product.stock_entries) + product.variations.iter().map(|v| sum_at(&v.stock_entries)).sum::<u64>()
}

fn mentions(product: &Product, location_id: &str) -> bool {
    let mentioned = |entries: &[StockEntry]| entries.iter().any(|e| same_location(&e.location_id, location_id));
    mentioned(&product.stock_entries) || product.variations.iter().any(|v| mentioned(&v.stock_entries))
}

/// Returns the quantity removed
fn remove_location(entries: &mut Vec<StockEntry>, location_id: &str) -> u64 {
    let mut removed = 0u64;
    entries.retain(|e| {
        let matches = same_location(&e.location_id, location_id);
        if matches {
            removed += u64::from(e.quantity);
        }
        !matches
    });
    removed
}

/// Persisted product document
fn encode_product(product: &Product, actor: &str, created_at: i64, updated_at: i64) -> Document {
    let variations: Map<String, Value> = product
        .variations
        .iter()
        .map(|v| {
            (
                v.id.clone(),
                json!({
                    "id": v.id,
                    "type": v.variation_type,
                    "value": v.value,
                    "sku": v.sku,
                    "price": money(v.price),
                    "cost": money(v.cost),
                    "warehouseStocks": to_persisted_map(&v.stock_entries),
                    "totalStock": v.total_stock(),
                }),
            )
        })
        .collect();

    json!({
        "id": product.id,
        "name": product.name,
        "sku": product.sku,
        "description": product.description,
        "price": money(product.price),
        "cost": money(product.cost),
        "category": product.category,
        "defaultLocationLabel": product.default_location_label,
        "imageUrl": product.image_url,
        "hasVariations": product.has_variations,
        "warehouseStocks": to_persisted_map(&product.stock_entries),
        "variations": variations,
        "totalStock": product.current_stock,
        "createdAt": created_at,
        "updatedAt": updated_at,
        "lastModifiedBy": actor,
    })
}

/// Monetary fields are persisted as JSON numbers
fn money(amount: Decimal) -> Value {
    json!(amount.to_f64().unwrap_or_default())
}

/// Stock per canonical location key across all products and variations
pub fn location_totals(products: &[Product]) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    let mut add = |entries: &[StockEntry]| {
        for entry in entries {
            *totals.entry(canonical_key(&entry.location_id)).or_insert(0) += u64::from(entry.quantity);
        }
    };
    for product in products {
        if product.has_variations {
            for variation in &product.variations {
                add(&variation.stock_entries);
            }
        } else {
            add(&product.stock_entries);
        }
    }
    totals
}

#[cfg(test)]
mod tests;
