//! Stock Map Codec
//!
//! Persisted products store their breakdown as a map from canonical location
//! key to quantity (`warehouseStocks`). In memory the breakdown is an ordered
//! `Vec<StockEntry>` carrying display names.
//!
//! ```text
//! [{locationId: "Main Warehouse", qty: 4}]  ──to_persisted_map──►  {"main_warehouse": 4}
//! {"main_warehouse": 4}  ──from_persisted_map(names)──►  [{locationId: "main_warehouse", locationName: "Main Warehouse", qty: 4}]
//! ```
//!
//! Two raw ids that canonicalize identically collapse to one key; the last
//! entry wins and the collision is logged.

use super::coerce;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::StockEntry;
use std::collections::{BTreeMap, HashMap};

/// Lowercase, whitespace runs → `_`, trimmed
///
/// Idempotent: `canonical_key(canonical_key(x)) == canonical_key(x)`.
pub fn canonical_key(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Whether two location ids address the same persisted key
pub fn same_location(a: &str, b: &str) -> bool {
    a == b || canonical_key(a) == canonical_key(b)
}

/// Display-name lookup by location key
pub trait ResolveLocationName {
    /// Name for a (canonical or raw) location key, `None` when unknown
    fn location_name(&self, key: &str) -> Option<String>;
}

/// Resolver that knows no names; entries keep their raw keys
#[derive(Debug, Clone, Copy, Default)]
pub struct RawKeyNames;

impl ResolveLocationName for RawKeyNames {
    fn location_name(&self, _key: &str) -> Option<String> {
        None
    }
}

/// id → name map (ids may be raw or canonical)
impl ResolveLocationName for HashMap<String, String> {
    fn location_name(&self, key: &str) -> Option<String> {
        self.get(key).cloned().or_else(|| {
            self.iter()
                .find(|(id, _)| same_location(id, key))
                .map(|(_, name)| name.clone())
        })
    }
}

pub fn to_persisted_map(entries: &[StockEntry]) -> BTreeMap<String, u32> {
    let mut map = BTreeMap::new();
    for entry in entries {
        insert_canonical(&mut map, &entry.location_id, entry.quantity);
    }
    map
}

/// Keys are canonicalized on the way in, so a stored map written with raw
/// keys decodes to the same entries as its canonical form.
pub fn from_persisted_map(
    map: &BTreeMap<String, u32>,
    names: &impl ResolveLocationName,
) -> Vec<StockEntry> {
    canonicalize(map)
        .into_iter()
        .map(|(key, quantity)| {
            // 已删除的位置可能仍有残留库存，名称回退为原始键
            let name = names.location_name(&key).unwrap_or_else(|| key.clone());
            StockEntry::new(key, name, quantity)
        })
        .collect()
}

/// Parse a raw `warehouseStocks` value; a missing or non-object value is empty
pub fn parse_persisted_map(value: Option<&Value>) -> BTreeMap<String, u32> {
    let mut map = BTreeMap::new();
    if let Some(Value::Object(fields)) = value {
        for (key, qty) in fields.iter().filter(|(key, _)| !key.trim().is_empty()) {
            insert_canonical(&mut map, key, coerce::quantity(Some(qty)));
        }
    }
    map
}

fn canonicalize(map: &BTreeMap<String, u32>) -> BTreeMap<String, u32> {
    let mut out = BTreeMap::new();
    for (key, quantity) in map {
        insert_canonical(&mut out, key, *quantity);
    }
    out
}

fn insert_canonical(map: &mut BTreeMap<String, u32>, raw_key: &str, quantity: u32) {
    let key = canonical_key(raw_key);
    if let Some(previous) = map.insert(key.clone(), quantity) {
        tracing::warn!(
            key = %key,
            location_id = %raw_key,
            previous,
            kept = quantity,
            "Stock map key collision, last entry wins"
        );
    }
}

// =============================================================================
// Legacy per-location records
// =============================================================================

/// Separate per-location stock document (`productStocks` collection)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyStockRecord {
    pub product_id: String,
    #[serde(alias = "warehouseId")]
    pub location_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<String>,
    #[serde(default)]
    pub quantity: u32,
}

impl LegacyStockRecord {
    /// Lenient decode of a raw legacy document
    pub fn from_document(doc: &Value) -> Option<Self> {
        let product_id = coerce::non_empty(doc.get("productId"))?;
        let location_id = coerce::non_empty(doc.get("locationId"))
            .or_else(|| coerce::non_empty(doc.get("warehouseId")))?;
        Some(Self {
            product_id,
            location_id,
            variation_id: coerce::non_empty(doc.get("variationId")),
            quantity: coerce::quantity(doc.get("quantity")),
        })
    }
}

/// Where a product's breakdown was read from
///
/// Both representations decode to the same entries; writes always use the
/// embedded map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockSource {
    Embedded(BTreeMap<String, u32>),
    Legacy(Vec<LegacyStockRecord>),
}

impl StockSource {
    /// Canonical-key map (legacy records follow the same collision rule)
    pub fn into_map(self) -> BTreeMap<String, u32> {
        match self {
            Self::Embedded(map) => map,
            Self::Legacy(records) => {
                let entries: Vec<StockEntry> = records
                    .into_iter()
                    .map(|r| StockEntry::new(r.location_id, String::new(), r.quantity))
                    .collect();
                to_persisted_map(&entries)
            }
        }
    }

    pub fn into_entries(self, names: &impl ResolveLocationName) -> Vec<StockEntry> {
        from_persisted_map(&self.into_map(), names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::models::sum_entries;

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("Main Warehouse"), "main_warehouse");
        assert_eq!(canonical_key("  Store \t 1 "), "store_1");
        assert_eq!(canonical_key("warehouse-A"), "warehouse-a");
        assert_eq!(canonical_key(""), "");
    }

    #[test]
    fn test_canonical_key_idempotent() {
        for raw in ["Main Warehouse", "a  b\nc", "ALREADY_canonical", "x"] {
            let once = canonical_key(raw);
            assert_eq!(canonical_key(&once), once);
        }
    }

    #[test]
    fn test_round_trip_law() {
        let map: BTreeMap<String, u32> =
            [("main_warehouse".to_string(), 4), ("store_1".to_string(), 0), ("store_2".to_string(), 9)]
                .into_iter()
                .collect();
        let entries = from_persisted_map(&map, &RawKeyNames);
        assert_eq!(sum_entries(&entries), 13);
        assert_eq!(to_persisted_map(&entries), map);
    }

    #[test]
    fn test_raw_keys_decode_canonical() {
        let stored = parse_persisted_map(Some(&json!({"Main Warehouse": 4, "store_1": 2, "Store 2": 0})));
        let canonical: BTreeMap<String, u32> =
            [("main_warehouse".to_string(), 4), ("store_1".to_string(), 2), ("store_2".to_string(), 0)]
                .into_iter()
                .collect();
        assert_eq!(stored, canonical);

        // decode straight from a raw-keyed map as well
        let raw: BTreeMap<String, u32> = [("Main Warehouse".to_string(), 4), ("store_1".to_string(), 2)]
            .into_iter()
            .collect();
        let entries = from_persisted_map(&raw, &RawKeyNames);
        assert_eq!(entries[0].location_id, "main_warehouse");
        assert_eq!(to_persisted_map(&entries), canonicalize(&raw));

        let again = from_persisted_map(&to_persisted_map(&entries), &RawKeyNames);
        assert_eq!(again, entries);
    }

    #[test]
    fn test_mixed_key_collision_on_decode() {
        let map = parse_persisted_map(Some(&json!({"Store 1": 5, "store_1": 2})));
        assert_eq!(map.len(), 1);
        assert_eq!(map["store_1"], 2);
    }

    #[test]
    fn test_names_resolved_with_fallback() {
        let names: HashMap<String, String> =
            [("Main Warehouse".to_string(), "Main Warehouse".to_string())].into_iter().collect();
        let map: BTreeMap<String, u32> = [("main_warehouse".to_string(), 1), ("gone".to_string(), 2)]
            .into_iter()
            .collect();

        let entries = from_persisted_map(&map, &names);
        assert_eq!(entries[0].location_name, "gone");
        assert_eq!(entries[1].location_name, "Main Warehouse");
        assert_eq!(entries[1].location_id, "main_warehouse");
    }

    #[test]
    fn test_collision_last_write_wins() {
        let entries = vec![
            StockEntry::new("Store 1", "Store 1", 5),
            StockEntry::new("store 1", "store 1", 2),
        ];
        let map = to_persisted_map(&entries);
        assert_eq!(map.len(), 1);
        assert_eq!(map["store_1"], 2);
    }

    #[test]
    fn test_parse_missing_or_garbage_map() {
        assert!(parse_persisted_map(None).is_empty());
        assert!(parse_persisted_map(Some(&json!("nope"))).is_empty());

        let map = parse_persisted_map(Some(&json!({"w1": -3, "w2": "4", "w3": null})));
        assert_eq!(map["w1"], 0);
        assert_eq!(map["w2"], 4);
        assert_eq!(map["w3"], 0);
    }

    #[test]
    fn test_legacy_and_embedded_decode_identically() {
        let legacy = StockSource::Legacy(vec![
            LegacyStockRecord::from_document(&json!({"productId": "p1", "warehouseId": "Main Warehouse", "quantity": 4})).unwrap(),
            LegacyStockRecord::from_document(&json!({"productId": "p1", "locationId": "store_1", "quantity": 2})).unwrap(),
        ]);
        let embedded = StockSource::Embedded(
            [("main_warehouse".to_string(), 4), ("store_1".to_string(), 2)].into_iter().collect(),
        );
        assert_eq!(legacy.into_entries(&RawKeyNames), embedded.into_entries(&RawKeyNames));
    }

    #[test]
    fn test_legacy_record_requires_ids() {
        assert!(LegacyStockRecord::from_document(&json!({"locationId": "w1"})).is_none());
        assert!(LegacyStockRecord::from_document(&json!({"productId": "p1"})).is_none());
    }
}
