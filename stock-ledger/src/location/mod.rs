//! Location Registry
//!
//! Warehouses and stores live in two collections. The registry keeps an
//! in-memory copy (refreshed explicitly) so name lookups during stock map
//! decoding never hit the store.

use crate::core::{StockError, StockResult};
use crate::stock::codec::{ResolveLocationName, same_location};
use crate::stock::coerce;
use crate::store::{Document, StoreClient};
use parking_lot::RwLock;
use serde_json::json;
use shared::models::{Location, LocationCreate, LocationType, LocationUpdate};
use shared::util::new_id;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct LocationRegistry {
    client: StoreClient,
    /// id -> location
    cache: Arc<RwLock<HashMap<String, Location>>>,
}

impl std::fmt::Debug for LocationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationRegistry")
            .field("locations", &self.cache.read().len())
            .finish()
    }
}

/// Lenient decode; type comes from the collection the document lives in
fn decode_location(id: &str, doc: &Document, location_type: LocationType) -> Location {
    let name = coerce::non_empty(doc.get("name")).unwrap_or_else(|| id.to_string());
    Location {
        id: coerce::non_empty(doc.get("id")).unwrap_or_else(|| id.to_string()),
        name,
        location_type,
        parent_store_id: coerce::non_empty(doc.get("parentStoreId")),
    }
}

impl LocationRegistry {
    pub fn new(client: StoreClient) -> Self {
        Self {
            client,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Reload both collections from the store
    pub async fn refresh(&self) -> StockResult<usize> {
        let mut fresh = HashMap::new();
        for location_type in LocationType::ALL {
            for (id, doc) in self.client.list(location_type.collection()).await? {
                let location = decode_location(&id, &doc, location_type);
                fresh.insert(location.id.clone(), location);
            }
        }

        let count = fresh.len();
        *self.cache.write() = fresh;
        tracing::debug!(count, "Location registry refreshed");
        Ok(count)
    }

    /// Cached locations, optionally filtered by type, ordered by name
    pub fn list(&self, location_type: Option<LocationType>) -> Vec<Location> {
        let mut locations: Vec<Location> = self
            .cache
            .read()
            .values()
            .filter(|l| location_type.is_none_or(|t| l.location_type == t))
            .cloned()
            .collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        locations
    }

    /// Lookup by raw or canonical id
    pub fn get(&self, id: &str) -> Option<Location> {
        let cache = self.cache.read();
        cache.get(id).cloned().or_else(|| {
            cache
                .values()
                .find(|l| same_location(&l.id, id))
                .cloned()
        })
    }

    /// Display name, or the id itself when the location is unknown
    pub fn resolve_name(&self, id: &str) -> String {
        self.get(id).map(|l| l.name).unwrap_or_else(|| id.to_string())
    }

    pub async fn create(&self, data: LocationCreate) -> StockResult<Location> {
        let name = data.name.trim().to_string();
        if name.is_empty() {
            return Err(StockError::validation("location name is required"));
        }

        let id = data
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(new_id);
        if self.get(&id).is_some() {
            return Err(StockError::validation(format!("location {id} already exists")));
        }
        self.check_parent(data.location_type, data.parent_store_id.as_deref())?;

        let location = Location {
            id,
            name,
            location_type: data.location_type,
            parent_store_id: data.parent_store_id,
        };
        self.client
            .set(
                location.location_type.collection(),
                &location.id,
                serde_json::to_value(&location)?,
            )
            .await?;

        self.cache
            .write()
            .insert(location.id.clone(), location.clone());
        tracing::info!(
            location_id = %location.id,
            location_type = %location.location_type,
            "Location created"
        );
        Ok(location)
    }

    pub async fn update(&self, id: &str, data: LocationUpdate) -> StockResult<Location> {
        let mut location = self
            .get(id)
            .ok_or_else(|| StockError::not_found("Location", id))?;

        if let Some(name) = data.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(StockError::validation("location name cannot be empty"));
            }
            location.name = name;
        }
        if let Some(parent) = data.parent_store_id {
            self.check_parent(location.location_type, Some(&parent))?;
            location.parent_store_id = Some(parent);
        }

        self.client
            .update(
                location.location_type.collection(),
                &location.id,
                json!({
                    "name": location.name,
                    "parentStoreId": location.parent_store_id,
                }),
            )
            .await?;

        self.cache
            .write()
            .insert(location.id.clone(), location.clone());
        Ok(location)
    }

    /// Remove the location document
    ///
    /// Residual stock held at the location is not touched here; see
    /// `InventoryStore::retire_location`.
    pub async fn delete(&self, id: &str) -> StockResult<Location> {
        let location = self
            .get(id)
            .ok_or_else(|| StockError::not_found("Location", id))?;

        self.client
            .delete(location.location_type.collection(), &location.id)
            .await?;
        self.cache.write().remove(&location.id);
        tracing::info!(location_id = %location.id, "Location deleted");
        Ok(location)
    }

    /// Only warehouses hang under a store, and the store must exist
    fn check_parent(&self, location_type: LocationType, parent: Option<&str>) -> StockResult<()> {
        let Some(parent) = parent else {
            return Ok(());
        };
        if location_type != LocationType::Warehouse {
            return Err(StockError::validation("only warehouses can have a parent store"));
        }
        match self.get(parent) {
            Some(l) if l.location_type == LocationType::Store => Ok(()),
            _ => Err(StockError::validation(format!("parent store {parent} not found"))),
        }
    }
}

impl ResolveLocationName for LocationRegistry {
    fn location_name(&self, key: &str) -> Option<String> {
        self.get(key).map(|l| l.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, STORES, WAREHOUSES};

    fn registry() -> (Arc<MemoryStore>, LocationRegistry) {
        let memory = Arc::new(MemoryStore::new());
        let registry = LocationRegistry::new(StoreClient::in_memory(memory.clone()));
        (memory, registry)
    }

    fn create(id: &str, name: &str, location_type: LocationType) -> LocationCreate {
        LocationCreate {
            id: Some(id.to_string()),
            name: name.to_string(),
            location_type,
            parent_store_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_list_resolve() {
        let (memory, registry) = registry();
        registry
            .create(create("main_warehouse", "Main Warehouse", LocationType::Warehouse))
            .await
            .unwrap();
        registry
            .create(create("store_1", "Downtown", LocationType::Store))
            .await
            .unwrap();

        assert_eq!(memory.len(WAREHOUSES), 1);
        assert_eq!(memory.len(STORES), 1);
        assert_eq!(registry.list(None).len(), 2);
        assert_eq!(registry.list(Some(LocationType::Store))[0].name, "Downtown");
        assert_eq!(registry.resolve_name("Main Warehouse"), "Main Warehouse");
        assert_eq!(registry.resolve_name("ghost"), "ghost");
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_bad_parent() {
        let (_, registry) = registry();
        registry
            .create(create("w1", "W1", LocationType::Warehouse))
            .await
            .unwrap();
        assert!(matches!(
            registry.create(create("w1", "Again", LocationType::Warehouse)).await,
            Err(StockError::Validation { .. })
        ));

        let mut orphan = create("w2", "W2", LocationType::Warehouse);
        orphan.parent_store_id = Some("missing".into());
        assert!(registry.create(orphan).await.is_err());

        assert!(registry.create(create("x", "  ", LocationType::Store)).await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_reads_both_collections() {
        let (memory, registry) = registry();
        use crate::store::DocumentStore;
        memory
            .set(WAREHOUSES, "w1", json!({"name": "North"}))
            .await
            .unwrap();
        memory
            .set(STORES, "s1", json!({"id": "s1", "name": "Shop", "type": "store"}))
            .await
            .unwrap();

        assert_eq!(registry.refresh().await.unwrap(), 2);
        let north = registry.get("w1").unwrap();
        assert_eq!(north.location_type, LocationType::Warehouse);
        assert_eq!(north.name, "North");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (memory, registry) = registry();
        registry
            .create(create("s1", "Shop", LocationType::Store))
            .await
            .unwrap();
        registry
            .create(create("w1", "Back room", LocationType::Warehouse))
            .await
            .unwrap();

        let updated = registry
            .update(
                "w1",
                LocationUpdate {
                    name: Some("Stockroom".into()),
                    parent_store_id: Some("s1".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.parent_store_id.as_deref(), Some("s1"));
        assert_eq!(memory.peek(WAREHOUSES, "w1").unwrap()["name"], "Stockroom");

        registry.delete("w1").await.unwrap();
        assert!(registry.get("w1").is_none());
        assert!(registry.delete("w1").await.unwrap_err().is_not_found());
    }
}
