//! Product Model
//!
//! A product holds its stock either flat (`stock_entries`) or, when
//! `has_variations` is set, per variation. The two modes never coexist.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quantity of a product (or variation) held at one location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockEntry {
    pub location_id: String,
    /// Denormalized display name
    pub location_name: String,
    pub quantity: u32,
}

impl StockEntry {
    pub fn new(location_id: impl Into<String>, location_name: impl Into<String>, quantity: u32) -> Self {
        Self {
            location_id: location_id.into(),
            location_name: location_name.into(),
            quantity,
        }
    }
}

/// Sum of quantities across a stock breakdown
pub fn sum_entries(entries: &[StockEntry]) -> u64 {
    entries.iter().map(|e| u64::from(e.quantity)).sum()
}

/// Product variation (e.g. size = "1kg")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    pub id: String,
    #[serde(rename = "type")]
    pub variation_type: String,
    pub value: String,
    pub sku: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    #[serde(default)]
    pub stock_entries: Vec<StockEntry>,
}

impl Variation {
    /// Derived total for this variation
    pub fn total_stock(&self) -> u64 {
        sum_entries(&self.stock_entries)
    }
}

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub description: String,
    /// 金额以 JSON 数字存储
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    #[serde(default)]
    pub category: String,
    /// Free-text shelf/location label shown on the product card
    #[serde(default)]
    pub default_location_label: String,
    #[serde(default)]
    pub image_url: String,
    pub current_stock: u64,
    #[serde(default)]
    pub stock_entries: Vec<StockEntry>,
    #[serde(default)]
    pub has_variations: bool,
    #[serde(default)]
    pub variations: Vec<Variation>,
}

impl Product {
    /// Whether stock is tracked per location (flat entries or variations)
    pub fn has_breakdown(&self) -> bool {
        if self.has_variations {
            !self.variations.is_empty()
        } else {
            !self.stock_entries.is_empty()
        }
    }

    /// Sum of the per-location breakdown for the active stock mode
    pub fn breakdown_total(&self) -> u64 {
        if self.has_variations {
            self.variations.iter().map(Variation::total_stock).sum()
        } else {
            sum_entries(&self.stock_entries)
        }
    }

    pub fn variation(&self, variation_id: &str) -> Option<&Variation> {
        self.variations.iter().find(|v| v.id == variation_id)
    }

    pub fn variation_mut(&mut self, variation_id: &str) -> Option<&mut Variation> {
        self.variations.iter_mut().find(|v| v.id == variation_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variation(id: &str, quantities: &[u32]) -> Variation {
        Variation {
            id: id.to_string(),
            variation_type: "size".to_string(),
            value: id.to_string(),
            sku: format!("SKU-{id}"),
            price: Decimal::ZERO,
            cost: Decimal::ZERO,
            stock_entries: quantities
                .iter()
                .enumerate()
                .map(|(i, q)| StockEntry::new(format!("loc{i}"), format!("Loc {i}"), *q))
                .collect(),
        }
    }

    #[test]
    fn test_variation_total() {
        assert_eq!(variation("1kg", &[3, 4]).total_stock(), 7);
    }

    #[test]
    fn test_breakdown_total_variant_mode_ignores_flat_entries() {
        let product = Product {
            id: "p1".into(),
            name: "Coffee".into(),
            sku: "SKU-P1".into(),
            description: String::new(),
            price: Decimal::ZERO,
            cost: Decimal::ZERO,
            category: String::new(),
            default_location_label: String::new(),
            image_url: String::new(),
            current_stock: 0,
            stock_entries: vec![StockEntry::new("w1", "W1", 100)],
            has_variations: true,
            variations: vec![variation("250g", &[1, 2]), variation("1kg", &[5])],
        };
        assert_eq!(product.breakdown_total(), 8);
        assert!(product.has_breakdown());
        assert!(product.variation("1kg").is_some());
    }

    #[test]
    fn test_serialized_field_names() {
        let entry = StockEntry::new("main_wh", "Main WH", 4);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["locationId"], "main_wh");
        assert_eq!(json["locationName"], "Main WH");
        assert_eq!(json["quantity"], 4);
    }

    #[test]
    fn test_money_serializes_as_number() {
        let mut v = variation("1kg", &[1]);
        v.price = Decimal::new(1250, 2);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["price"], 12.5);
        assert_eq!(json["cost"], 0.0);

        let back: Variation = serde_json::from_value(json).unwrap();
        assert_eq!(back.price, Decimal::new(1250, 2));
    }
}
