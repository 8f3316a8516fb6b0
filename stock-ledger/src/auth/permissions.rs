//! Permission Definitions
//!
//! Location-scoped RBAC. The ledger's mutating entry points only take the
//! boolean produced here; role resolution happens before.
//!
//! ## 规则
//! - owner: 全部操作
//! - warehouse_admin: 维护商品；已分配位置作为来源时创建/发出/取消调拨；作为目的地时收货
//! - cashier: 查看已分配门店库存；已分配门店作为目的地时收货

use shared::models::{UserProfile, UserRole};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ViewInventory,
    EditProduct,
    DeleteProduct,
    ManageLocations,
    CreateTransfer,
    DispatchTransfer,
    ReceiveTransfer,
    CancelTransfer,
}

impl Action {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ViewInventory => "inventory:view",
            Self::EditProduct => "products:edit",
            Self::DeleteProduct => "products:delete",
            Self::ManageLocations => "locations:manage",
            Self::CreateTransfer => "transfers:create",
            Self::DispatchTransfer => "transfers:dispatch",
            Self::ReceiveTransfer => "transfers:receive",
            Self::CancelTransfer => "transfers:cancel",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an action targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource<'a> {
    /// Not scoped to a location (catalog-wide)
    Any,
    Location(&'a str),
    Transfer {
        source: &'a str,
        destination: &'a str,
    },
}

fn is_assigned(profile: &UserProfile, location_id: &str) -> bool {
    profile.is_assigned_store(location_id) || profile.is_assigned_warehouse(location_id)
}

/// Centralized permission decision
pub fn authorize(profile: &UserProfile, action: Action, resource: Resource<'_>) -> bool {
    let allowed = match profile.role {
        UserRole::Owner => true,
        UserRole::WarehouseAdmin => match (action, resource) {
            (Action::ViewInventory, Resource::Any) => true,
            (Action::ViewInventory, Resource::Location(id)) => is_assigned(profile, id),
            (Action::EditProduct, _) => true,
            (Action::DeleteProduct | Action::ManageLocations, _) => false,
            (
                Action::CreateTransfer | Action::DispatchTransfer | Action::CancelTransfer,
                Resource::Transfer { source, .. },
            ) => is_assigned(profile, source),
            (Action::ReceiveTransfer, Resource::Transfer { destination, .. }) => {
                is_assigned(profile, destination)
            }
            _ => false,
        },
        UserRole::Cashier => match (action, resource) {
            (Action::ViewInventory, Resource::Any) => true,
            (Action::ViewInventory, Resource::Location(id)) => profile.is_assigned_store(id),
            (Action::ReceiveTransfer, Resource::Transfer { destination, .. }) => {
                profile.is_assigned_store(destination)
            }
            _ => false,
        },
    };

    if !allowed {
        tracing::debug!(
            user_id = %profile.id,
            role = ?profile.role,
            action = %action,
            resource = ?resource,
            "Permission denied"
        );
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: UserRole, stores: &[&str], warehouses: &[&str]) -> UserProfile {
        UserProfile {
            id: "u1".into(),
            role,
            assigned_stores: stores.iter().map(|s| s.to_string()).collect(),
            assigned_warehouses: warehouses.iter().map(|s| s.to_string()).collect(),
        }
    }

    const W_TO_S: Resource<'static> = Resource::Transfer {
        source: "warehouse-A",
        destination: "store-1",
    };

    #[test]
    fn test_owner_can_do_everything() {
        let owner = profile(UserRole::Owner, &[], &[]);
        assert!(authorize(&owner, Action::ManageLocations, Resource::Any));
        assert!(authorize(&owner, Action::ReceiveTransfer, W_TO_S));
        assert!(authorize(&owner, Action::DeleteProduct, Resource::Any));
    }

    #[test]
    fn test_warehouse_admin_scoped_to_source() {
        let admin = profile(UserRole::WarehouseAdmin, &[], &["warehouse-A"]);
        assert!(authorize(&admin, Action::CreateTransfer, W_TO_S));
        assert!(authorize(&admin, Action::CancelTransfer, W_TO_S));
        assert!(!authorize(&admin, Action::ReceiveTransfer, W_TO_S));
        assert!(authorize(&admin, Action::EditProduct, Resource::Any));
        assert!(!authorize(&admin, Action::ManageLocations, Resource::Any));
        assert!(!authorize(&admin, Action::ViewInventory, Resource::Location("store-1")));
    }

    #[test]
    fn test_cashier_receives_at_own_store() {
        let cashier = profile(UserRole::Cashier, &["store-1"], &[]);
        assert!(authorize(&cashier, Action::ReceiveTransfer, W_TO_S));
        assert!(!authorize(&cashier, Action::CreateTransfer, W_TO_S));
        assert!(authorize(&cashier, Action::ViewInventory, Resource::Location("store-1")));

        let elsewhere = profile(UserRole::Cashier, &["store-2"], &[]);
        assert!(!authorize(&elsewhere, Action::ReceiveTransfer, W_TO_S));
    }
}
