//! Product Aggregate
//!
//! [`validate`] is the single normalization boundary for products coming
//! from the store, seed files or callers. Everything past it works with typed
//! [`Product`] values whose quantities cannot go negative.
//!
//! Total stock rule: when a product has a per-location breakdown (flat
//! entries, or variations in variant mode) `current_stock` is the sum of that
//! breakdown. A product without any breakdown keeps its flat counter, which is
//! what [`adjust_stock`] edits.

use super::codec::{
    RawKeyNames, ResolveLocationName, from_persisted_map, parse_persisted_map, same_location,
};
use super::coerce;
use crate::core::{StockError, StockResult};
use serde_json::Value;
use shared::error::ErrorCode;
use shared::models::{Product, StockEntry, Variation};
use shared::util::{default_sku, new_id};

/// Normalize a raw product document without location names
pub fn validate(raw: &Value) -> Product {
    validate_with(raw, &RawKeyNames)
}

/// Normalize a raw product document
///
/// Accepts both the in-memory shape (`stockEntries`, variations as a list)
/// and the persisted shape (`warehouseStocks`, variations as an id map).
pub fn validate_with(raw: &Value, names: &impl ResolveLocationName) -> Product {
    let id = coerce::non_empty(raw.get("id")).unwrap_or_else(new_id);
    let sku = coerce::non_empty(raw.get("sku")).unwrap_or_else(|| default_sku(&id));
    let variations = parse_variations(raw.get("variations"), names);

    let has_variations = match raw.get("hasVariations") {
        Some(flag) => coerce::boolean(Some(flag)) && !variations.is_empty(),
        None => !variations.is_empty(),
    };
    let stock_entries = if has_variations {
        // 变体模式下不保留平铺库存
        Vec::new()
    } else {
        parse_entries(raw, names)
    };

    // 持久化字段优先，避免残留的规范化字段覆盖新值
    let current_stock = coerce::number(coerce::field(raw, &["totalStock", "currentStock"]));

    let mut product = Product {
        name: coerce::text(raw.get("name")),
        sku,
        description: coerce::text(raw.get("description")),
        price: coerce::decimal(raw.get("price")),
        cost: coerce::decimal(raw.get("cost")),
        category: coerce::text(raw.get("category")),
        default_location_label: coerce::text(
            raw.get("defaultLocationLabel").or_else(|| raw.get("location")),
        ),
        image_url: coerce::text(raw.get("imageUrl")),
        current_stock: if current_stock > 0.0 { current_stock.floor() as u64 } else { 0 },
        stock_entries,
        has_variations,
        variations,
        id,
    };
    recompute_total(&mut product);
    product
}

/// `warehouseStocks` wins over `stockEntries` when a document carries both
fn parse_entries(raw: &Value, names: &impl ResolveLocationName) -> Vec<StockEntry> {
    if let Some(map @ Value::Object(_)) = raw.get("warehouseStocks") {
        return from_persisted_map(&parse_persisted_map(Some(map)), names);
    }
    match raw.get("stockEntries") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let Some(location_id) = coerce::non_empty(item.get("locationId")) else {
                    tracing::debug!(entry = %item, "Dropping stock entry without locationId");
                    return None;
                };
                let location_name = coerce::non_empty(item.get("locationName"))
                    .or_else(|| names.location_name(&location_id))
                    .unwrap_or_else(|| location_id.clone());
                Some(StockEntry::new(
                    location_id,
                    location_name,
                    coerce::quantity(item.get("quantity")),
                ))
            })
            .collect(),
        _ => from_persisted_map(&parse_persisted_map(raw.get("warehouseStocks")), names),
    }
}

fn parse_variations(value: Option<&Value>, names: &impl ResolveLocationName) -> Vec<Variation> {
    let items: Vec<(Option<&String>, &Value)> = match value {
        Some(Value::Array(items)) => items.iter().map(|v| (None, v)).collect(),
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (Some(k), v)).collect(),
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|(key, item)| {
            let variation_type = coerce::non_empty(item.get("type"));
            let value = coerce::non_empty(item.get("value"));
            let (Some(variation_type), Some(value)) = (variation_type, value) else {
                tracing::debug!(variation = %item, "Dropping variation without type/value");
                return None;
            };
            let id = coerce::non_empty(item.get("id"))
                .or_else(|| key.cloned())
                .unwrap_or_else(new_id);
            Some(Variation {
                sku: coerce::non_empty(item.get("sku")).unwrap_or_else(|| default_sku(&id)),
                price: coerce::decimal(item.get("price")),
                cost: coerce::decimal(item.get("cost")),
                stock_entries: parse_entries(item, names),
                variation_type,
                value,
                id,
            })
        })
        .collect()
}

/// Re-derive `current_stock` from the breakdown; returns the new total
pub fn recompute_total(product: &mut Product) -> u64 {
    if product.has_breakdown() {
        product.current_stock = product.breakdown_total();
    }
    product.current_stock
}

/// Adjust the flat stock counter by `delta`, flooring at zero
pub fn adjust_stock(mut product: Product, delta: i64) -> Product {
    let next = i128::from(product.current_stock) + i128::from(delta);
    if next < 0 {
        tracing::debug!(
            product_id = %product.id,
            current = product.current_stock,
            delta,
            "Stock adjustment floored at zero"
        );
    }
    product.current_stock = next.clamp(0, i128::from(u64::MAX)) as u64;
    product
}

/// The breakdown a stock movement applies to
///
/// Variant products need a `variation_id`; flat products ignore it.
pub fn stock_entries_mut<'a>(
    product: &'a mut Product,
    variation_id: Option<&str>,
) -> StockResult<&'a mut Vec<StockEntry>> {
    if !product.has_variations {
        return Ok(&mut product.stock_entries);
    }
    let Some(variation_id) = variation_id else {
        return Err(StockError::invalid(
            ErrorCode::VariationRequired,
            format!(
                "product {} tracks stock per variation, a variation id is required",
                product.id
            ),
        ));
    };
    product
        .variation_mut(variation_id)
        .map(|v| &mut v.stock_entries)
        .ok_or_else(|| StockError::not_found("Variation", variation_id))
}

/// Quantity at a location (0 when absent)
pub fn quantity_at(entries: &[StockEntry], location_id: &str) -> u32 {
    entries
        .iter()
        .rev()
        .find(|e| same_location(&e.location_id, location_id))
        .map(|e| e.quantity)
        .unwrap_or(0)
}

/// Set the quantity at a location, appending an entry when absent
pub fn set_quantity(
    entries: &mut Vec<StockEntry>,
    location_id: &str,
    location_name: &str,
    quantity: u32,
) {
    let mut found = false;
    for entry in entries
        .iter_mut()
        .filter(|e| same_location(&e.location_id, location_id))
    {
        entry.quantity = quantity;
        if entry.location_name.is_empty() {
            entry.location_name = location_name.to_string();
        }
        found = true;
    }
    if !found {
        entries.push(StockEntry::new(location_id, location_name, quantity));
    }
}

/// Move `quantity` from source to destination
///
/// The source floors at zero; the destination always gains the full
/// quantity. Returns the deficit (units the source did not have).
pub fn move_between(
    entries: &mut Vec<StockEntry>,
    source: (&str, &str),
    destination: (&str, &str),
    quantity: u32,
) -> u32 {
    let available = quantity_at(entries, source.0);
    let deficit = quantity.saturating_sub(available);
    set_quantity(entries, source.0, source.1, available.saturating_sub(quantity));

    let current = quantity_at(entries, destination.0);
    set_quantity(entries, destination.0, destination.1, current.saturating_add(quantity));
    deficit
}
