//! Data models
//!
//! Shared between the stock ledger and its callers (command layer, sync).
//! Field names serialize in camelCase to match the document store.

pub mod location;
pub mod product;
pub mod role;
pub mod transfer;

// Re-exports
pub use location::*;
pub use product::*;
pub use role::*;
pub use transfer::*;
