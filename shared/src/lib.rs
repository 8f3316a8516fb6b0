//! Shared types for the stock ledger
//!
//! Data models (locations, products, transfers, profiles), the unified error
//! codes, and small utilities used by the ledger and its callers.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCode};
