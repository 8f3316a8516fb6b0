//! Unified error codes for the stock ledger
//!
//! This module defines all error codes surfaced by the ledger to its callers.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 2xxx: Permission errors
//! - 5xxx: Location errors
//! - 6xxx: Product / stock errors
//! - 7xxx: Transfer errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,

    // ==================== 5xxx: Location ====================
    /// Location not found
    LocationNotFound = 5001,
    /// Location still holds stock
    LocationInUse = 5002,

    // ==================== 6xxx: Product ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Variation not found
    VariationNotFound = 6002,
    /// Product tracks stock per variation, variation id required
    VariationRequired = 6003,

    // ==================== 7xxx: Transfer ====================
    /// Transfer not found
    TransferNotFound = 7001,
    /// Source and destination are the same location
    TransferSameLocation = 7002,
    /// Transfer has no line items
    TransferEmpty = 7003,
    /// Line item quantity must be positive
    TransferInvalidQuantity = 7004,
    /// Status change not allowed by the transfer state machine
    TransferInvalidTransition = 7005,
    /// Line item not found on transfer
    TransferLineItemNotFound = 7006,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Local storage error
    StorageError = 9002,
    /// Remote document store unreachable
    StoreUnavailable = 9003,
    /// Remote document store call timed out
    StoreTimeout = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "Specific role is required",

            // Location
            ErrorCode::LocationNotFound => "Location not found",
            ErrorCode::LocationInUse => "Location still holds stock",

            // Product
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::VariationNotFound => "Variation not found",
            ErrorCode::VariationRequired => "Variation is required for this product",

            // Transfer
            ErrorCode::TransferNotFound => "Transfer not found",
            ErrorCode::TransferSameLocation => "Source and destination must differ",
            ErrorCode::TransferEmpty => "Transfer has no line items",
            ErrorCode::TransferInvalidQuantity => "Quantity must be greater than zero",
            ErrorCode::TransferInvalidTransition => "Transfer status change not allowed",
            ErrorCode::TransferLineItemNotFound => "Transfer line item not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::StorageError => "Storage error",
            ErrorCode::StoreUnavailable => "Data store is unavailable",
            ErrorCode::StoreTimeout => "Data store request timed out",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),

            // Location
            5001 => Ok(ErrorCode::LocationNotFound),
            5002 => Ok(ErrorCode::LocationInUse),

            // Product
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::VariationNotFound),
            6003 => Ok(ErrorCode::VariationRequired),

            // Transfer
            7001 => Ok(ErrorCode::TransferNotFound),
            7002 => Ok(ErrorCode::TransferSameLocation),
            7003 => Ok(ErrorCode::TransferEmpty),
            7004 => Ok(ErrorCode::TransferInvalidQuantity),
            7005 => Ok(ErrorCode::TransferInvalidTransition),
            7006 => Ok(ErrorCode::TransferLineItemNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::StorageError),
            9003 => Ok(ErrorCode::StoreUnavailable),
            9004 => Ok(ErrorCode::StoreTimeout),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
