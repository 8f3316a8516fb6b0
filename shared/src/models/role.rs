//! Role Model
//!
//! User-role documents from the `profiles` collection. Role resolution itself
//! happens outside the ledger; these types only carry the decision inputs.

use serde::{Deserialize, Serialize};

/// User role (RBAC 角色)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full access to every location
    Owner,
    /// Manages assigned warehouses and stores
    #[serde(alias = "warehouse_manager", alias = "manager")]
    WarehouseAdmin,
    /// Point-of-sale staff at assigned stores
    #[serde(alias = "staff")]
    Cashier,
}

/// Profile document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    pub role: UserRole,
    #[serde(default)]
    pub assigned_stores: Vec<String>,
    #[serde(default)]
    pub assigned_warehouses: Vec<String>,
}

impl UserProfile {
    pub fn is_assigned_store(&self, store_id: &str) -> bool {
        self.assigned_stores.iter().any(|s| s == store_id)
    }

    pub fn is_assigned_warehouse(&self, warehouse_id: &str) -> bool {
        self.assigned_warehouses.iter().any(|w| w == warehouse_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_aliases() {
        let p: UserProfile =
            serde_json::from_str(r#"{"role":"manager","assignedWarehouses":["w1"]}"#).unwrap();
        assert_eq!(p.role, UserRole::WarehouseAdmin);
        assert!(p.is_assigned_warehouse("w1"));
        assert!(p.assigned_stores.is_empty());

        let p: UserProfile = serde_json::from_str(r#"{"role":"staff"}"#).unwrap();
        assert_eq!(p.role, UserRole::Cashier);
    }
}
