//! # Permissions Module
//!
//! Roles, permissions and the acting user. The role table is a plain
//! `match`: read-only and exhaustive, so adding a role or permission
//! forces a decision at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Manager,
    Cashier,
    StockClerk,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewProducts,
    ManageProducts,
    ViewStock,
    AdjustStock,
    ManageReservations,
    ViewSales,
    EditSales,
    CompleteSales,
    CancelSales,
}

impl Role {
    pub fn has(&self, permission: Permission) -> bool {
        use Permission::*;

        match self {
            Role::Owner | Role::Manager => true,
            Role::Cashier => matches!(
                permission,
                ViewProducts | ViewStock | ViewSales | EditSales | CompleteSales | CancelSales
            ),
            Role::StockClerk => matches!(
                permission,
                ViewProducts | ViewStock | AdjustStock | ManageReservations
            ),
            Role::Viewer => matches!(permission, ViewProducts | ViewStock | ViewSales),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
            Role::StockClerk => "stock_clerk",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Permission::ViewProducts => "view products",
            Permission::ManageProducts => "manage products",
            Permission::ViewStock => "view stock",
            Permission::AdjustStock => "adjust stock",
            Permission::ManageReservations => "manage reservations",
            Permission::ViewSales => "view sales",
            Permission::EditSales => "edit sales",
            Permission::CompleteSales => "complete sales",
            Permission::CancelSales => "cancel sales",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Actor
// =============================================================================

/// The user on whose behalf an operation runs.
///
/// The tenant id here scopes every read and write the operation makes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub tenant_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, tenant_id: impl Into<String>, role: Role) -> Self {
        Actor {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            role,
        }
    }

    /// Fails with `PermissionDenied` unless the role grants `permission`.
    pub fn authorize(&self, permission: Permission) -> CoreResult<()> {
        if self.role.has(permission) {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                role: self.role.to_string(),
                permission: permission.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_and_manager_have_everything() {
        for p in [
            Permission::ManageProducts,
            Permission::AdjustStock,
            Permission::CancelSales,
        ] {
            assert!(Role::Owner.has(p));
            assert!(Role::Manager.has(p));
        }
    }

    #[test]
    fn test_cashier_sells_but_does_not_adjust_stock() {
        assert!(Role::Cashier.has(Permission::EditSales));
        assert!(Role::Cashier.has(Permission::CompleteSales));
        assert!(!Role::Cashier.has(Permission::AdjustStock));
        assert!(!Role::Cashier.has(Permission::ManageProducts));
    }

    #[test]
    fn test_stock_clerk_adjusts_but_does_not_sell() {
        assert!(Role::StockClerk.has(Permission::AdjustStock));
        assert!(!Role::StockClerk.has(Permission::EditSales));
        assert!(!Role::StockClerk.has(Permission::ViewSales));
    }

    #[test]
    fn test_viewer_is_read_only() {
        let actor = Actor::new("u-1", "t-1", Role::Viewer);
        assert!(actor.authorize(Permission::ViewSales).is_ok());

        let err = actor.authorize(Permission::EditSales).unwrap_err();
        assert_eq!(err.to_string(), "Role viewer is not allowed to edit sales");
    }
}
