use crate::store::{LocalCacheError, StoreError};
use shared::error::{AppError, ErrorCode};
use shared::models::TransferStatus;
use std::time::Duration;
use thiserror::Error;

/// 库存账本错误
#[derive(Error, Debug)]
pub enum StockError {
    /// `code` narrows the failure for callers (defaults to `ValidationFailed`)
    #[error("验证错误: {message}")]
    Validation { code: ErrorCode, message: String },

    #[error("存储不可用: {0}")]
    StoreUnavailable(String),

    #[error("存储请求超时: {0:?}")]
    StoreTimeout(Duration),

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("权限不足: {0}")]
    PermissionDenied(String),

    #[error("位置仍有库存: {location_id} ({products} products)")]
    LocationInUse { location_id: String, products: usize },

    #[error("Invalid transfer transition: {from} -> {to}")]
    InvalidTransition {
        from: TransferStatus,
        to: TransferStatus,
    },

    #[error("本地缓存错误: {0}")]
    Cache(#[from] LocalCacheError),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StockError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::invalid(ErrorCode::ValidationFailed, msg)
    }

    /// Validation failure with a specific error code
    pub fn invalid(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: msg.into(),
        }
    }

    /// Error code of a validation failure
    pub fn validation_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Validation { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StoreError> for StockError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => Self::NotFound {
                resource: resource_name(&collection),
                id,
            },
            StoreError::InvalidDocument(msg) => Self::validation(msg),
            StoreError::Timeout(after) => Self::StoreTimeout(after),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

fn resource_name(collection: &str) -> &'static str {
    match collection {
        "products" => "Product",
        "transfers" => "Transfer",
        "warehouses" | "stores" => "Location",
        "profiles" => "Profile",
        _ => "Document",
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match &err {
            StockError::Validation { code, message } => AppError::with_message(*code, message.clone()),
            StockError::StoreUnavailable(msg) => AppError::store_unavailable(msg.clone()),
            StockError::StoreTimeout(after) => AppError::with_message(ErrorCode::StoreTimeout, err.to_string())
                .with_detail("timeoutMs", after.as_millis() as u64),
            StockError::NotFound { resource, id } => {
                let code = match *resource {
                    "Product" => ErrorCode::ProductNotFound,
                    "Transfer" => ErrorCode::TransferNotFound,
                    "Location" => ErrorCode::LocationNotFound,
                    "Variation" => ErrorCode::VariationNotFound,
                    "Line item" => ErrorCode::TransferLineItemNotFound,
                    _ => ErrorCode::NotFound,
                };
                AppError::with_message(code, err.to_string()).with_detail("id", id.clone())
            }
            StockError::PermissionDenied(msg) => AppError::permission_denied(msg.clone()),
            StockError::LocationInUse {
                location_id,
                products,
            } => AppError::with_message(ErrorCode::LocationInUse, err.to_string())
                .with_detail("locationId", location_id.clone())
                .with_detail("products", *products),
            StockError::InvalidTransition { from, to } => {
                AppError::with_message(ErrorCode::TransferInvalidTransition, err.to_string())
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            StockError::Cache(_) | StockError::Serialization(_) => {
                // 内部错误只记录，不暴露细节
                tracing::error!(error = %err, "Internal stock ledger error");
                AppError::with_message(ErrorCode::StorageError, "Local storage error")
            }
        }
    }
}

/// 库存账本 Result 类型别名
pub type StockResult<T> = std::result::Result<T, StockError>;
