//! Transfer Reconciliation Engine
//!
//! Applies counted quantities of a transfer to the stock of its source and
//! destination, then closes the transfer.
//!
//! # 流程
//!
//! ```text
//! confirm_receipt
//!   ├─ permission + persisted status guard (per-transfer lock)
//!   ├─ per line (received > 0): lock product → source -= n (floor 0), destination += n → save
//!   │     failures are logged and the line is skipped
//!   └─ persist transfer: status, receivedAt, receivedItems
//! ```
//!
//! Product writes happen before the transfer write. If the transfer write
//! fails the stock moves stay applied and the error is returned; a retry
//! would apply them again, so the failure is logged with the applied lines.

use super::ledger::TransferLedger;
use crate::core::{StockError, StockResult};
use crate::inventory::InventoryStore;
use crate::stock::{move_between, stock_entries_mut};
use shared::models::{Product, Transfer, TransferLineItem, TransferStatus};
use shared::util::now_millis;

/// A line whose quantity was moved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedLine {
    pub line_item_id: String,
    pub product_id: String,
    pub variation_id: Option<String>,
    pub quantity: u32,
    /// Units the source did not hold (absorbed, source floored at 0)
    pub deficit: u32,
}

/// A line that was not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line_item_id: String,
    pub product_id: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ReceiptOutcome {
    /// The transfer as persisted
    pub transfer: Transfer,
    pub status: TransferStatus,
    pub applied: Vec<AppliedLine>,
    pub skipped: Vec<SkippedLine>,
    /// Products after their stock move, in line order
    pub updated_products: Vec<Product>,
    pub discrepancies: Vec<TransferLineItem>,
}

impl ReceiptOutcome {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    inventory: InventoryStore,
    ledger: TransferLedger,
}

impl ReconciliationEngine {
    pub fn new(inventory: InventoryStore, ledger: TransferLedger) -> Self {
        Self { inventory, ledger }
    }

    pub fn ledger(&self) -> &TransferLedger {
        &self.ledger
    }

    pub fn inventory(&self) -> &InventoryStore {
        &self.inventory
    }

    /// Confirm receipt of a transfer with its counted quantities
    ///
    /// Endpoints and expected quantities come from the persisted transfer;
    /// only `received_quantity` (and notes) are taken from `transfer`.
    /// A transfer already received or cancelled is rejected with
    /// `InvalidTransition`, so stock is never applied twice.
    pub async fn confirm_receipt(
        &self,
        transfer: &Transfer,
        authorized: bool,
        actor: &str,
    ) -> StockResult<ReceiptOutcome> {
        if !authorized {
            return Err(StockError::PermissionDenied("not allowed to receive transfers".into()));
        }

        let _guard = self.ledger.lock(&transfer.id).await;
        let persisted = self.ledger.get(&transfer.id).await?;
        let mut working = merge_counts(persisted, transfer);
        let status = working.receipt_status();
        if !working.status.is_open() {
            tracing::warn!(
                transfer_id = %working.id,
                status = %working.status,
                "Transfer already closed, receipt rejected"
            );
            return Err(StockError::InvalidTransition {
                from: working.status,
                to: status,
            });
        }

        let registry = self.inventory.registry();
        let source_id = working.source_location_id.clone();
        let destination_id = working.destination_location_id.clone();
        let source_name = registry.resolve_name(&source_id);
        let destination_name = registry.resolve_name(&destination_id);

        let mut applied = Vec::new();
        let mut skipped = Vec::new();
        let mut updated_products = Vec::new();

        for line in &working.line_items {
            if line.received_quantity == 0 {
                skipped.push(SkippedLine {
                    line_item_id: line.id.clone(),
                    product_id: line.product_id.clone(),
                    reason: "nothing received".into(),
                });
                continue;
            }

            let quantity = line.received_quantity;
            let variation_id = line.variation_id.clone();
            let result = self
                .inventory
                .mutate(&line.product_id, actor, |product| {
                    let entries = stock_entries_mut(product, variation_id.as_deref())?;
                    Ok(move_between(
                        entries,
                        (source_id.as_str(), source_name.as_str()),
                        (destination_id.as_str(), destination_name.as_str()),
                        quantity,
                    ))
                })
                .await;

            match result {
                Ok((product, deficit)) => {
                    if deficit > 0 {
                        tracing::warn!(
                            transfer_id = %working.id,
                            product_id = %line.product_id,
                            source = %source_id,
                            received = quantity,
                            deficit,
                            "Source held less than received quantity, floored at zero"
                        );
                    }
                    applied.push(AppliedLine {
                        line_item_id: line.id.clone(),
                        product_id: line.product_id.clone(),
                        variation_id: line.variation_id.clone(),
                        quantity,
                        deficit,
                    });
                    updated_products.push(product);
                }
                Err(e) => {
                    tracing::error!(
                        transfer_id = %working.id,
                        line_item_id = %line.id,
                        product_id = %line.product_id,
                        error = %e,
                        "Failed to apply transfer line, skipping"
                    );
                    skipped.push(SkippedLine {
                        line_item_id: line.id.clone(),
                        product_id: line.product_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        working.status = status;
        working.received_at = Some(now_millis());
        if let Err(e) = self.ledger.persist(&working).await {
            tracing::error!(
                transfer_id = %working.id,
                applied = applied.len(),
                error = %e,
                "Stock moved but transfer status could not be written"
            );
            return Err(e);
        }

        tracing::info!(
            transfer_id = %working.id,
            status = %status,
            applied = applied.len(),
            skipped = skipped.len(),
            actor,
            "Transfer receipt confirmed"
        );

        let discrepancies = working
            .line_items
            .iter()
            .filter(|l| l.has_discrepancy)
            .cloned()
            .collect();
        Ok(ReceiptOutcome {
            transfer: working,
            status,
            applied,
            skipped,
            updated_products,
            discrepancies,
        })
    }
}

/// Persisted transfer with the caller's counts; lines the caller lacks count 0
fn merge_counts(mut persisted: Transfer, counted: &Transfer) -> Transfer {
    for line in persisted.line_items.iter_mut() {
        match counted.line_item(&line.id) {
            Some(c) => {
                line.received_quantity = c.received_quantity;
                if c.notes.is_some() {
                    line.notes = c.notes.clone();
                }
            }
            None => line.received_quantity = 0,
        }
        line.refresh_discrepancy();
    }
    persisted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, expected: u32, received: u32) -> TransferLineItem {
        TransferLineItem {
            id: id.into(),
            product_id: "P".into(),
            variation_id: None,
            name: String::new(),
            sku: String::new(),
            expected_quantity: expected,
            received_quantity: received,
            has_discrepancy: false,
            notes: None,
        }
    }

    fn transfer(lines: Vec<TransferLineItem>) -> Transfer {
        Transfer {
            id: "t1".into(),
            source_location_id: "w".into(),
            destination_location_id: "s".into(),
            line_items: lines,
            status: TransferStatus::InTransit,
            created_at: 1,
            received_at: None,
            created_by: "owner".into(),
            notes: None,
        }
    }

    #[test]
    fn test_merge_counts_keeps_persisted_expectations() {
        let persisted = transfer(vec![line("a", 10, 0), line("b", 4, 0)]);
        let mut counted = transfer(vec![line("a", 99, 7)]);
        counted.source_location_id = "elsewhere".into();

        let merged = merge_counts(persisted, &counted);
        assert_eq!(merged.source_location_id, "w");
        assert_eq!(merged.line_items[0].expected_quantity, 10);
        assert_eq!(merged.line_items[0].received_quantity, 7);
        assert!(merged.line_items[0].has_discrepancy);
        assert_eq!(merged.line_items[1].received_quantity, 0);
        assert!(merged.line_items[1].has_discrepancy);
        assert_eq!(merged.receipt_status(), TransferStatus::PartiallyReceived);
    }
}
