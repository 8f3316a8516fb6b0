//! 调拨模块
//!
//! - [`ledger`] - 调拨单创建、状态流转和持久化
//! - [`reconcile`] - 收货确认，将实收数量应用到来源/目的地库存

pub mod ledger;
pub mod reconcile;

pub use ledger::{NewLineItem, NewTransfer, TransferLedger, is_ready_for_review, record_received_quantity};
pub use reconcile::{AppliedLine, ReceiptOutcome, ReconciliationEngine, SkippedLine};
