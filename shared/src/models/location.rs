//! Location Model (warehouses and stores)

use serde::{Deserialize, Serialize};
use std::fmt;

/// 位置类型 - 仓库或门店
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Warehouse,
    Store,
}

impl LocationType {
    /// Document store collection holding locations of this type
    pub const fn collection(&self) -> &'static str {
        match self {
            Self::Warehouse => "warehouses",
            Self::Store => "stores",
        }
    }

    pub const ALL: [LocationType; 2] = [LocationType::Warehouse, LocationType::Store];
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warehouse => write!(f, "warehouse"),
            Self::Store => write!(f, "store"),
        }
    }
}

/// Location entity
///
/// Immutable once referenced by stock; the registry does not enforce that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    /// Owning store (warehouses attached to a store)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_store_id: Option<String>,
}

/// Create location payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationCreate {
    /// Explicit ID; generated when absent
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub parent_store_id: Option<String>,
}

/// Update location payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub name: Option<String>,
    pub parent_store_id: Option<String>,
}
