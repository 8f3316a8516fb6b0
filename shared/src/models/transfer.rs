//! Transfer Model
//!
//! # 状态机
//!
//! ```text
//! pending ──► in-transit ──► received
//!    │             │    └──► partially-received
//!    └─────────────┴───────► cancelled
//! ```
//!
//! `received` / `partially-received` / `cancelled` are terminal.
//! A transfer may also be created directly in `in-transit`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transfer status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferStatus {
    Pending,
    InTransit,
    Received,
    PartiallyReceived,
    Cancelled,
}

impl TransferStatus {
    /// Still accepting receipt (not yet reconciled or cancelled)
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::InTransit)
    }

    pub const fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    /// Allowed transitions of the transfer state machine
    pub const fn can_transition_to(&self, next: TransferStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InTransit)
                | (Self::Pending, Self::Received)
                | (Self::Pending, Self::PartiallyReceived)
                | (Self::Pending, Self::Cancelled)
                | (Self::InTransit, Self::Received)
                | (Self::InTransit, Self::PartiallyReceived)
                | (Self::InTransit, Self::Cancelled)
        )
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InTransit => "in-transit",
            Self::Received => "received",
            Self::PartiallyReceived => "partially-received",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product line of a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferLineItem {
    pub id: String,
    pub product_id: String,
    /// Set when the product tracks stock per variation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: String,
    pub expected_quantity: u32,
    #[serde(default)]
    pub received_quantity: u32,
    #[serde(default)]
    pub has_discrepancy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TransferLineItem {
    /// Record the counted quantity; negatives clamp to zero, over-receipt is kept
    pub fn set_received_quantity(&mut self, quantity: i64) {
        self.received_quantity = quantity.clamp(0, i64::from(u32::MAX)) as u32;
        self.refresh_discrepancy();
    }

    pub fn refresh_discrepancy(&mut self) {
        self.has_discrepancy = self.received_quantity != self.expected_quantity;
    }

    /// received - expected
    pub fn variance(&self) -> i64 {
        i64::from(self.received_quantity) - i64::from(self.expected_quantity)
    }
}

/// Transfer entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: String,
    pub source_location_id: String,
    pub destination_location_id: String,
    pub line_items: Vec<TransferLineItem>,
    pub status: TransferStatus,
    /// Unix millis
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<i64>,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Transfer {
    pub fn line_item(&self, line_item_id: &str) -> Option<&TransferLineItem> {
        self.line_items.iter().find(|l| l.id == line_item_id)
    }

    pub fn line_item_mut(&mut self, line_item_id: &str) -> Option<&mut TransferLineItem> {
        self.line_items.iter_mut().find(|l| l.id == line_item_id)
    }

    /// Every line has a positive counted quantity
    ///
    /// An unset line is indistinguishable from "not yet counted", so a
    /// transfer with any zero line cannot move on to confirmation.
    pub fn is_ready_for_review(&self) -> bool {
        !self.line_items.is_empty() && self.line_items.iter().all(|l| l.received_quantity > 0)
    }

    pub fn has_discrepancy(&self) -> bool {
        self.line_items.iter().any(|l| l.has_discrepancy)
    }

    /// Terminal status a confirmation of the current counts would produce
    pub fn receipt_status(&self) -> TransferStatus {
        if self.has_discrepancy() {
            TransferStatus::PartiallyReceived
        } else {
            TransferStatus::Received
        }
    }
}

// =============================================================================
// Persisted shape
// =============================================================================

/// Line item as stored before receipt (`products` field)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProductDoc {
    pub id: String,
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Reconciliation record per line (`receivedItems` field)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedItem {
    pub id: String,
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_id: Option<String>,
    pub expected_quantity: u32,
    pub received_quantity: u32,
    pub has_discrepancy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Transfer document as written to the `transfers` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDocument {
    pub id: String,
    pub source_location_id: String,
    pub destination_location_id: String,
    pub products: Vec<TransferProductDoc>,
    pub status: TransferStatus,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<i64>,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_items: Option<Vec<ReceivedItem>>,
}

impl From<&Transfer> for TransferDocument {
    fn from(transfer: &Transfer) -> Self {
        let products = transfer
            .line_items
            .iter()
            .map(|l| TransferProductDoc {
                id: l.id.clone(),
                product_id: l.product_id.clone(),
                variation_id: l.variation_id.clone(),
                name: l.name.clone(),
                sku: l.sku.clone(),
                quantity: l.expected_quantity,
                notes: l.notes.clone(),
            })
            .collect();

        // Reconciliation outcome only exists once received
        let received_items = matches!(
            transfer.status,
            TransferStatus::Received | TransferStatus::PartiallyReceived
        )
        .then(|| {
            transfer
                .line_items
                .iter()
                .map(|l| ReceivedItem {
                    id: l.id.clone(),
                    product_id: l.product_id.clone(),
                    variation_id: l.variation_id.clone(),
                    expected_quantity: l.expected_quantity,
                    received_quantity: l.received_quantity,
                    has_discrepancy: l.has_discrepancy,
                    notes: l.notes.clone(),
                })
                .collect()
        });

        Self {
            id: transfer.id.clone(),
            source_location_id: transfer.source_location_id.clone(),
            destination_location_id: transfer.destination_location_id.clone(),
            products,
            status: transfer.status,
            created_at: transfer.created_at,
            received_at: transfer.received_at,
            created_by: transfer.created_by.clone(),
            notes: transfer.notes.clone(),
            received_items,
        }
    }
}

impl From<TransferDocument> for Transfer {
    fn from(doc: TransferDocument) -> Self {
        let received = doc.received_items.unwrap_or_default();
        let line_items = doc
            .products
            .into_iter()
            .map(|p| {
                let record = received.iter().find(|r| r.id == p.id);
                let mut line = TransferLineItem {
                    id: p.id,
                    product_id: p.product_id,
                    variation_id: p.variation_id,
                    name: p.name,
                    sku: p.sku,
                    expected_quantity: p.quantity,
                    received_quantity: record.map(|r| r.received_quantity).unwrap_or(0),
                    has_discrepancy: false,
                    notes: record.and_then(|r| r.notes.clone()).or(p.notes),
                };
                if record.is_some() {
                    line.refresh_discrepancy();
                }
                line
            })
            .collect();

        Self {
            id: doc.id,
            source_location_id: doc.source_location_id,
            destination_location_id: doc.destination_location_id,
            line_items,
            status: doc.status,
            created_at: doc.created_at,
            received_at: doc.received_at,
            created_by: doc.created_by,
            notes: doc.notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, expected: u32) -> TransferLineItem {
        TransferLineItem {
            id: id.to_string(),
            product_id: format!("product-{id}"),
            variation_id: None,
            name: "Beans".to_string(),
            sku: "SKU-1".to_string(),
            expected_quantity: expected,
            received_quantity: 0,
            has_discrepancy: false,
            notes: None,
        }
    }

    fn transfer(lines: Vec<TransferLineItem>) -> Transfer {
        Transfer {
            id: "t1".to_string(),
            source_location_id: "warehouse-A".to_string(),
            destination_location_id: "store-1".to_string(),
            line_items: lines,
            status: TransferStatus::InTransit,
            created_at: 1_700_000_000_000,
            received_at: None,
            created_by: "owner".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_status_serde_names() {
        let json = serde_json::to_string(&TransferStatus::PartiallyReceived).unwrap();
        assert_eq!(json, "\"partially-received\"");
        let status: TransferStatus = serde_json::from_str("\"in-transit\"").unwrap();
        assert_eq!(status, TransferStatus::InTransit);
    }

    #[test]
    fn test_transitions() {
        use TransferStatus::*;
        assert!(Pending.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(PartiallyReceived));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!InTransit.can_transition_to(Pending));
        assert!(!Received.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(InTransit));
        assert!(!PartiallyReceived.can_transition_to(Received));
    }

    #[test]
    fn test_discrepancy_flag_law() {
        let cases = [(10, 10), (10, 0), (10, 7), (5, 8), (1, 1)];
        for (expected, received) in cases {
            let mut item = line("a", expected);
            item.set_received_quantity(i64::from(received));
            assert_eq!(item.has_discrepancy, received != expected, "{expected}/{received}");
        }
    }

    #[test]
    fn test_received_quantity_clamps_negative_only() {
        let mut item = line("a", 5);
        item.set_received_quantity(-3);
        assert_eq!(item.received_quantity, 0);
        assert!(item.has_discrepancy);
        item.set_received_quantity(12);
        assert_eq!(item.received_quantity, 12);
        assert_eq!(item.variance(), 7);
    }

    #[test]
    fn test_ready_for_review_requires_every_line_counted() {
        let mut t = transfer(vec![line("a", 2), line("b", 3)]);
        assert!(!t.is_ready_for_review());
        t.line_item_mut("a").unwrap().set_received_quantity(2);
        assert!(!t.is_ready_for_review());
        t.line_item_mut("b").unwrap().set_received_quantity(1);
        assert!(t.is_ready_for_review());
        assert_eq!(t.receipt_status(), TransferStatus::PartiallyReceived);
    }

    #[test]
    fn test_document_before_receipt_has_no_received_items() {
        let t = transfer(vec![line("a", 2)]);
        let doc = TransferDocument::from(&t);
        assert!(doc.received_items.is_none());
        assert_eq!(doc.products[0].quantity, 2);
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("receivedItems").is_none());
        assert_eq!(json["products"][0]["productId"], "product-a");
    }

    #[test]
    fn test_document_after_receipt_restores_counts() {
        let mut t = transfer(vec![line("a", 10), line("b", 4)]);
        t.line_item_mut("a").unwrap().set_received_quantity(7);
        t.line_item_mut("b").unwrap().set_received_quantity(4);
        t.status = t.receipt_status();
        t.received_at = Some(1_700_000_100_000);

        let doc = TransferDocument::from(&t);
        let items = doc.received_items.as_ref().unwrap();
        assert!(items[0].has_discrepancy);
        assert!(!items[1].has_discrepancy);

        let restored = Transfer::from(doc);
        assert_eq!(restored, t);
    }
}
