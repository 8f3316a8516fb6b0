//! Transfer Ledger
//!
//! Creates transfers and drives the status state machine. Counted
//! quantities are recorded on the in-memory transfer by the receiving side
//! and only persisted by reconciliation.

use crate::core::{StockError, StockResult};
use crate::inventory::{KeyedGuard, KeyedLocks};
use crate::stock::codec::same_location;
use crate::store::{StoreClient, TRANSFERS};
use shared::error::ErrorCode;
use shared::models::{Transfer, TransferDocument, TransferLineItem, TransferStatus};
use shared::util::{new_id, now_millis};
use std::sync::Arc;

/// Create transfer payload
#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub source_location_id: String,
    pub destination_location_id: String,
    pub line_items: Vec<NewLineItem>,
    pub notes: Option<String>,
    /// `Pending` or `InTransit`
    pub status: TransferStatus,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub product_id: String,
    pub variation_id: Option<String>,
    pub name: String,
    pub sku: String,
    /// Must be positive
    pub expected_quantity: i64,
    pub notes: Option<String>,
}

impl NewLineItem {
    pub fn new(product_id: impl Into<String>, expected_quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            variation_id: None,
            name: String::new(),
            sku: String::new(),
            expected_quantity,
            notes: None,
        }
    }

    pub fn with_variation(mut self, variation_id: impl Into<String>) -> Self {
        self.variation_id = Some(variation_id.into());
        self
    }
}

#[derive(Clone)]
pub struct TransferLedger {
    client: StoreClient,
    /// Per-transfer exclusion for status changes
    locks: Arc<KeyedLocks>,
}

impl std::fmt::Debug for TransferLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferLedger").finish_non_exhaustive()
    }
}

impl TransferLedger {
    pub fn new(client: StoreClient) -> Self {
        Self {
            client,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub(crate) async fn lock(&self, transfer_id: &str) -> KeyedGuard {
        self.locks.lock(transfer_id).await
    }

    pub fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    /// Validate and persist a new transfer
    ///
    /// Nothing is written when validation or the permission check fails.
    pub async fn create(&self, data: NewTransfer, authorized: bool) -> StockResult<Transfer> {
        if !authorized {
            return Err(StockError::PermissionDenied("not allowed to create transfers".into()));
        }
        let transfer = build_transfer(data)?;

        self.persist(&transfer).await?;
        tracing::info!(
            transfer_id = %transfer.id,
            source = %transfer.source_location_id,
            destination = %transfer.destination_location_id,
            lines = transfer.line_items.len(),
            status = %transfer.status,
            "Transfer created"
        );
        Ok(transfer)
    }

    pub async fn get(&self, transfer_id: &str) -> StockResult<Transfer> {
        let doc = self.client.get(TRANSFERS, transfer_id).await?;
        let doc: TransferDocument = serde_json::from_value(doc)?;
        Ok(doc.into())
    }

    /// Transfers, newest first; undecodable documents are skipped
    pub async fn list(&self, status: Option<TransferStatus>) -> StockResult<Vec<Transfer>> {
        let mut transfers: Vec<Transfer> = self
            .client
            .list(TRANSFERS)
            .await?
            .into_iter()
            .filter_map(|(id, doc)| match serde_json::from_value::<TransferDocument>(doc) {
                Ok(doc) => Some(Transfer::from(doc)),
                Err(e) => {
                    tracing::warn!(transfer_id = %id, error = %e, "Skipping malformed transfer document");
                    None
                }
            })
            .filter(|t| status.is_none_or(|s| t.status == s))
            .collect();
        transfers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(transfers)
    }

    /// pending → in-transit
    pub async fn dispatch(&self, transfer_id: &str, authorized: bool) -> StockResult<Transfer> {
        self.transition(transfer_id, TransferStatus::InTransit, authorized).await
    }

    /// pending / in-transit → cancelled; stock is not touched
    pub async fn cancel(&self, transfer_id: &str, authorized: bool) -> StockResult<Transfer> {
        self.transition(transfer_id, TransferStatus::Cancelled, authorized).await
    }

    async fn transition(
        &self,
        transfer_id: &str,
        next: TransferStatus,
        authorized: bool,
    ) -> StockResult<Transfer> {
        if !authorized {
            return Err(StockError::PermissionDenied(format!(
                "not allowed to move transfer to {next}"
            )));
        }

        let _guard = self.lock(transfer_id).await;
        let mut transfer = self.get(transfer_id).await?;
        if !transfer.status.can_transition_to(next) {
            return Err(StockError::InvalidTransition {
                from: transfer.status,
                to: next,
            });
        }

        let from = transfer.status;
        transfer.status = next;
        self.persist(&transfer).await?;
        tracing::info!(transfer_id, from = %from, to = %next, "Transfer status changed");
        Ok(transfer)
    }

    /// Write the transfer document as-is
    pub async fn persist(&self, transfer: &Transfer) -> StockResult<()> {
        let doc = serde_json::to_value(TransferDocument::from(transfer))?;
        self.client.set(TRANSFERS, &transfer.id, doc).await?;
        Ok(())
    }
}

fn build_transfer(data: NewTransfer) -> StockResult<Transfer> {
    let source = data.source_location_id.trim().to_string();
    let destination = data.destination_location_id.trim().to_string();
    if source.is_empty() || destination.is_empty() {
        return Err(StockError::validation("source and destination are required"));
    }
    if same_location(&source, &destination) {
        return Err(StockError::invalid(
            ErrorCode::TransferSameLocation,
            "source and destination must be different locations",
        ));
    }
    if data.line_items.is_empty() {
        return Err(StockError::invalid(ErrorCode::TransferEmpty, "transfer has no line items"));
    }
    if !matches!(data.status, TransferStatus::Pending | TransferStatus::InTransit) {
        return Err(StockError::validation(format!(
            "transfers start as pending or in-transit, not {}",
            data.status
        )));
    }

    let mut line_items = Vec::with_capacity(data.line_items.len());
    for item in data.line_items {
        if item.product_id.trim().is_empty() {
            return Err(StockError::validation("line item product id is required"));
        }
        if item.expected_quantity <= 0 {
            return Err(StockError::invalid(
                ErrorCode::TransferInvalidQuantity,
                format!(
                    "expected quantity for {} must be positive, got {}",
                    item.product_id, item.expected_quantity
                ),
            ));
        }
        let expected_quantity = u32::try_from(item.expected_quantity).map_err(|_| {
            StockError::invalid(
                ErrorCode::TransferInvalidQuantity,
                format!("expected quantity for {} is too large", item.product_id),
            )
        })?;

        line_items.push(TransferLineItem {
            id: new_id(),
            product_id: item.product_id.trim().to_string(),
            variation_id: item.variation_id.filter(|v| !v.trim().is_empty()),
            name: item.name,
            sku: item.sku,
            expected_quantity,
            received_quantity: 0,
            has_discrepancy: false,
            notes: item.notes,
        });
    }

    Ok(Transfer {
        id: new_id(),
        source_location_id: source,
        destination_location_id: destination,
        line_items,
        status: data.status,
        created_at: now_millis(),
        received_at: None,
        created_by: data.created_by,
        notes: data.notes.filter(|n| !n.trim().is_empty()),
    })
}

/// Record a counted quantity on one line (negative → 0, no upper clamp)
pub fn record_received_quantity(
    transfer: &mut Transfer,
    line_item_id: &str,
    quantity: i64,
) -> StockResult<()> {
    if transfer.status.is_terminal() {
        return Err(StockError::InvalidTransition {
            from: transfer.status,
            to: transfer.receipt_status(),
        });
    }
    let line = transfer
        .line_item_mut(line_item_id)
        .ok_or_else(|| StockError::not_found("Line item", line_item_id))?;
    line.set_received_quantity(quantity);
    Ok(())
}

/// Every line has a positive counted quantity
pub fn is_ready_for_review(transfer: &Transfer) -> bool {
    transfer.is_ready_for_review()
}
