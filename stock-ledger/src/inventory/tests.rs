use super::*;
use crate::store::{DocumentStore, MemoryStore};
use crate::stock::{quantity_at, validate};
use shared::models::{LocationCreate, LocationType};

struct Fixture {
    memory: Arc<MemoryStore>,
    local: LocalCache,
    inventory: InventoryStore,
}

fn fixture() -> Fixture {
    let memory = Arc::new(MemoryStore::new());
    let client = StoreClient::in_memory(memory.clone());
    let local = LocalCache::open_in_memory().unwrap();
    let inventory = InventoryStore::new(client.clone(), LocationRegistry::new(client))
        .with_local_cache(local.clone());
    Fixture {
        memory,
        local,
        inventory,
    }
}

fn beans(stock: Value) -> Product {
    validate(&json!({
        "id": "beans",
        "name": "Coffee Beans",
        "price": 12.5,
        "stockEntries": stock,
    }))
}

// ========================================================================
// load
// ========================================================================

#[tokio::test]
async fn test_load_seeds_empty_remote() {
    let f = fixture();
    let inventory = f.inventory.clone().with_seed(vec![
        json!({"id": "p1", "name": "Tea", "warehouseStocks": {"w1": 3}}),
        json!({"id": "p2", "name": "Milk", "stockEntries": [{"locationId": "w1", "quantity": 2}]}),
    ]);

    let products = inventory.load().await.unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(f.memory.len(PRODUCTS), 2);
    assert_eq!(f.local.list_documents(PRODUCTS).unwrap().len(), 2);
    assert_eq!(f.memory.peek(PRODUCTS, "p2").unwrap()["totalStock"], 2);

    // second load reads the seeded data instead of re-seeding
    let again = inventory.load().await.unwrap();
    assert_eq!(again.len(), 2);
}

#[tokio::test]
async fn test_load_empty_without_seed() {
    let f = fixture();
    assert!(f.inventory.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_load_falls_back_to_local_cache() {
    let f = fixture();
    f.inventory.save(beans(json!([{"locationId": "w1", "quantity": 4}]))).await.unwrap();
    f.inventory.load().await.unwrap();

    f.memory.set_online(false);
    let products = f.inventory.load().await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].current_stock, 4);

    let single = f.inventory.get("beans").await.unwrap();
    assert_eq!(single.name, "Coffee Beans");
}

#[tokio::test]
async fn test_load_outage_without_cache_is_unavailable() {
    let memory = Arc::new(MemoryStore::new());
    let client = StoreClient::in_memory(memory.clone());
    let inventory = InventoryStore::new(client.clone(), LocationRegistry::new(client));
    memory.set_online(false);

    assert!(matches!(
        inventory.load().await,
        Err(StockError::StoreUnavailable(_))
    ));
}

// ========================================================================
// save
// ========================================================================

#[tokio::test]
async fn test_save_creates_persisted_shape() {
    let f = fixture();
    let mut product = beans(json!([
        {"locationId": "Main Warehouse", "locationName": "Main Warehouse", "quantity": 6},
        {"locationId": "store_1", "quantity": 1}
    ]));
    product.current_stock = 999;

    let saved = f.inventory.save_as(product, "alice").await.unwrap();
    assert_eq!(saved.current_stock, 7);

    let doc = f.memory.peek(PRODUCTS, "beans").unwrap();
    assert_eq!(doc["warehouseStocks"], json!({"main_warehouse": 6, "store_1": 1}));
    assert_eq!(doc["totalStock"], 7);
    assert_eq!(doc["price"], 12.5);
    assert_eq!(doc["lastModifiedBy"], "alice");
    assert!(doc["createdAt"].as_i64().unwrap() > 0);
    assert_eq!(doc["createdAt"], doc["updatedAt"]);
    assert!(f.local.get_document(PRODUCTS, "beans").unwrap().is_some());
}

#[tokio::test]
async fn test_save_update_keeps_created_at_and_extra_fields() {
    let f = fixture();
    f.memory
        .set(PRODUCTS, "beans", json!({"id": "beans", "name": "Old", "createdAt": 42, "supplier": "ACME"}))
        .await
        .unwrap();

    f.inventory.save(beans(json!([{"locationId": "w1", "quantity": 2}]))).await.unwrap();

    let doc = f.memory.peek(PRODUCTS, "beans").unwrap();
    assert_eq!(doc["createdAt"], 42);
    assert_eq!(doc["supplier"], "ACME");
    assert_eq!(doc["name"], "Coffee Beans");
    assert_eq!(doc["totalStock"], 2);
}

#[tokio::test]
async fn test_update_replaces_normalized_stock_fields() {
    let f = fixture();
    f.memory
        .set(
            PRODUCTS,
            "beans",
            json!({
                "id": "beans",
                "name": "Coffee Beans",
                "currentStock": 10,
                "stockEntries": [{"locationId": "w1", "quantity": 10}]
            }),
        )
        .await
        .unwrap();

    let (saved, _) = f
        .inventory
        .mutate("beans", "alice", |product| {
            crate::stock::set_quantity(&mut product.stock_entries, "w1", "W1", 4);
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(saved.current_stock, 4);

    let doc = f.memory.peek(PRODUCTS, "beans").unwrap();
    assert!(doc["stockEntries"].is_null());
    assert!(doc["currentStock"].is_null());

    let reread = f.inventory.get("beans").await.unwrap();
    assert_eq!(quantity_at(&reread.stock_entries, "w1"), 4);
    assert_eq!(reread.current_stock, 4);
}

#[tokio::test]
async fn test_total_matches_breakdown_after_save() {
    let f = fixture();
    let product = validate(&json!({
        "id": "shirt",
        "name": "Shirt",
        "variations": [
            {"id": "s", "type": "size", "value": "S", "stockEntries": [{"locationId": "w1", "quantity": 3}]},
            {"id": "m", "type": "size", "value": "M", "stockEntries": [{"locationId": "w1", "quantity": 4}, {"locationId": "s1", "quantity": 1}]}
        ]
    }));
    f.inventory.save(product).await.unwrap();

    let reloaded = f.inventory.get("shirt").await.unwrap();
    assert!(reloaded.has_variations);
    assert_eq!(reloaded.current_stock, 8);
    assert_eq!(reloaded.current_stock, reloaded.breakdown_total());
    assert_eq!(reloaded.variation("m").unwrap().total_stock(), 5);

    let doc = f.memory.peek(PRODUCTS, "shirt").unwrap();
    assert_eq!(doc["variations"]["m"]["warehouseStocks"]["s1"], 1);
}

#[tokio::test]
async fn test_save_during_outage_fails_and_leaves_cache() {
    let f = fixture();
    f.memory.set_online(false);

    let err = f
        .inventory
        .save(beans(json!([{"locationId": "w1", "quantity": 2}])))
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::StoreUnavailable(_)));
    assert!(f.local.get_document(PRODUCTS, "beans").unwrap().is_none());
}

#[tokio::test]
async fn test_mutate_does_not_write_on_error() {
    let f = fixture();
    f.inventory.save(beans(json!([{"locationId": "w1", "quantity": 2}]))).await.unwrap();
    let before = f.memory.peek(PRODUCTS, "beans").unwrap();

    let result: StockResult<(Product, ())> = f
        .inventory
        .mutate("beans", "bob", |p| {
            p.name = "Changed".into();
            Err(StockError::validation("nope"))
        })
        .await;
    assert!(result.is_err());
    assert_eq!(f.memory.peek(PRODUCTS, "beans").unwrap(), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mutations_are_serialized() {
    let f = fixture();
    f.inventory.save(beans(json!([{"locationId": "w1", "quantity": 0}]))).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let inventory = f.inventory.clone();
        handles.push(tokio::spawn(async move {
            inventory
                .mutate("beans", "worker", |p| {
                    let current = quantity_at(&p.stock_entries, "w1");
                    crate::stock::set_quantity(&mut p.stock_entries, "w1", "W1", current + 1);
                    Ok(())
                })
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let product = f.inventory.get("beans").await.unwrap();
    assert_eq!(quantity_at(&product.stock_entries, "w1"), 20);
    assert_eq!(product.current_stock, 20);
}

// ========================================================================
// legacy + delete
// ========================================================================

#[tokio::test]
async fn test_legacy_records_decode_and_delete_cleanup() {
    let f = fixture();
    f.memory.set(PRODUCTS, "tea", json!({"id": "tea", "name": "Tea"})).await.unwrap();
    f.memory
        .set(LEGACY_PRODUCT_STOCKS, "tea_w1", json!({"productId": "tea", "warehouseId": "W1", "quantity": 5}))
        .await
        .unwrap();
    f.memory
        .set(LEGACY_PRODUCT_STOCKS, "tea_s1", json!({"productId": "tea", "locationId": "s1", "quantity": 2}))
        .await
        .unwrap();
    f.memory
        .set(LEGACY_PRODUCT_STOCKS, "milk_w1", json!({"productId": "milk", "locationId": "w1", "quantity": 9}))
        .await
        .unwrap();

    let tea = f.inventory.get("tea").await.unwrap();
    assert_eq!(tea.current_stock, 7);
    assert_eq!(quantity_at(&tea.stock_entries, "w1"), 5);

    f.inventory.delete("tea").await.unwrap();
    assert!(f.memory.peek(PRODUCTS, "tea").is_none());
    assert_eq!(f.memory.len(LEGACY_PRODUCT_STOCKS), 1);
    assert!(f.inventory.get("tea").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_delete_survives_legacy_cleanup_failure() {
    let f = fixture();
    f.inventory.save(beans(json!([]))).await.unwrap();
    f.memory
        .set(LEGACY_PRODUCT_STOCKS, "beans_w1", json!({"productId": "beans", "locationId": "w1", "quantity": 1}))
        .await
        .unwrap();
    f.memory.fail_writes_to(LEGACY_PRODUCT_STOCKS, "beans_w1");

    f.inventory.delete("beans").await.unwrap();
    assert!(f.memory.peek(PRODUCTS, "beans").is_none());
    assert_eq!(f.memory.len(LEGACY_PRODUCT_STOCKS), 1);
}

// ========================================================================
// locations
// ========================================================================

#[tokio::test]
async fn test_retire_location_requires_purge_when_stocked() {
    let f = fixture();
    f.inventory
        .registry()
        .create(LocationCreate {
            id: Some("w1".into()),
            name: "W1".into(),
            location_type: LocationType::Warehouse,
            parent_store_id: None,
        })
        .await
        .unwrap();
    f.inventory
        .save(beans(json!([{"locationId": "w1", "quantity": 3}, {"locationId": "s1", "quantity": 1}])))
        .await
        .unwrap();

    assert_eq!(f.inventory.location_in_use("w1").await.unwrap(), vec!["beans"]);
    assert!(matches!(
        f.inventory.retire_location("w1", false, "owner").await,
        Err(StockError::LocationInUse { products: 1, .. })
    ));

    f.inventory.retire_location("w1", true, "owner").await.unwrap();
    let beans = f.inventory.get("beans").await.unwrap();
    assert_eq!(beans.stock_entries.len(), 1);
    assert_eq!(beans.current_stock, 1);
    assert!(f.inventory.registry().get("w1").is_none());
}

#[test]
fn test_location_totals() {
    let products = vec![
        beans(json!([{"locationId": "Main WH", "quantity": 2}])),
        validate(&json!({
            "id": "shirt",
            "variations": [{"id": "s", "type": "size", "value": "S", "stockEntries": [{"locationId": "main_wh", "quantity": 3}]}]
        })),
    ];
    let totals = location_totals(&products);
    assert_eq!(totals["main_wh"], 5);
}
