//! Role and permission tables for tenant-scoped authorization.
//!
//! Roles map to explicit enumerated permission sets rather than an
//! inheritance chain, and the invite/remove/change rules are directional
//! decision tables over role pairs. A naive total order over roles would
//! get these wrong: an admin outranks staff for removal but an owner may
//! not remove another owner, so every rule is spelled out per pair.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Member role within a tenant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Staff,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Admin => write!(f, "admin"),
            Role::Staff => write!(f, "staff"),
        }
    }
}

/// Permission granted to a role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // Billing & subscription
    ManageBilling,
    ViewBilling,
    // User management
    ManageUsers,
    InviteUsers,
    RemoveUsers,
    ChangeRoles,
    // Tenant management
    ManageTenant,
    DeleteTenant,
    // Products & inventory
    ManageProducts,
    ViewProducts,
    // Customers
    ManageCustomers,
    ViewCustomers,
    // Transactions
    CreateTransactions,
    ViewTransactions,
    ManageTransactions,
    // Reports
    ViewReports,
}

/// Every permission a given role holds, as an explicit enumerated set.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    use Permission::*;
    match role {
        // Full access to everything
        Role::Owner => &[
            ManageBilling,
            ViewBilling,
            ManageUsers,
            InviteUsers,
            RemoveUsers,
            ChangeRoles,
            ManageTenant,
            DeleteTenant,
            ManageProducts,
            ViewProducts,
            ManageCustomers,
            ViewCustomers,
            CreateTransactions,
            ViewTransactions,
            ManageTransactions,
            ViewReports,
        ],
        // Can manage operations but not billing or tenant settings
        Role::Admin => &[
            ViewBilling,
            InviteUsers,
            RemoveUsers,
            ManageProducts,
            ViewProducts,
            ManageCustomers,
            ViewCustomers,
            CreateTransactions,
            ViewTransactions,
            ManageTransactions,
            ViewReports,
        ],
        // View-only access, can create transactions
        Role::Staff => &[
            ViewProducts,
            ViewCustomers,
            CreateTransactions,
            ViewTransactions,
        ],
    }
}

/// Check if a role has a specific permission
pub fn has_permission(role: Role, permission: Permission) -> bool {
    role_permissions(role).contains(&permission)
}

/// Check if a role has any of the specified permissions
pub fn has_any_permission(role: Role, permissions: &[Permission]) -> bool {
    permissions.iter().any(|p| has_permission(role, *p))
}

/// Check if a role has all of the specified permissions
pub fn has_all_permissions(role: Role, permissions: &[Permission]) -> bool {
    permissions.iter().all(|p| has_permission(role, *p))
}

/// Whether `actor` may invite a new member with `target` role.
/// Owners invite anyone; admins invite staff only; staff invite no one.
pub fn can_invite_role(actor: Role, target: Role) -> bool {
    match (actor, target) {
        (Role::Owner, _) => true,
        (Role::Admin, Role::Staff) => true,
        _ => false,
    }
}

/// Whether `actor` may remove a member holding `target` role.
/// Owners remove anyone except another owner; admins remove staff only.
pub fn can_remove_role(actor: Role, target: Role) -> bool {
    match (actor, target) {
        (Role::Owner, Role::Owner) => false,
        (Role::Owner, _) => true,
        (Role::Admin, Role::Staff) => true,
        _ => false,
    }
}

/// Whether `actor` may change a member's role from `from` to `to`.
/// Only owners change roles, and never involving the owner role on either
/// side: no promotion to owner and no demotion of an owner through this
/// path.
pub fn can_change_role(actor: Role, from: Role, to: Role) -> bool {
    if actor != Role::Owner {
        return false;
    }
    if from == Role::Owner || to == Role::Owner {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [Role; 3] = [Role::Owner, Role::Admin, Role::Staff];

    #[test]
    fn owner_holds_every_permission() {
        use Permission::*;
        for p in [
            ManageBilling,
            ViewBilling,
            ManageUsers,
            InviteUsers,
            RemoveUsers,
            ChangeRoles,
            ManageTenant,
            DeleteTenant,
            ManageProducts,
            ViewProducts,
            ManageCustomers,
            ViewCustomers,
            CreateTransactions,
            ViewTransactions,
            ManageTransactions,
            ViewReports,
        ] {
            assert!(has_permission(Role::Owner, p), "owner must hold {:?}", p);
        }
    }

    #[test]
    fn staff_never_manages_billing() {
        assert!(!has_permission(Role::Staff, Permission::ManageBilling));
        assert!(!has_permission(Role::Staff, Permission::ViewBilling));
    }

    #[test]
    fn admin_views_but_does_not_manage_billing() {
        assert!(has_permission(Role::Admin, Permission::ViewBilling));
        assert!(!has_permission(Role::Admin, Permission::ManageBilling));
    }

    #[test]
    fn any_and_all_combinators() {
        let ps = [Permission::ManageBilling, Permission::ViewProducts];
        assert!(has_any_permission(Role::Staff, &ps));
        assert!(!has_all_permissions(Role::Staff, &ps));
        assert!(has_all_permissions(Role::Owner, &ps));
        assert!(!has_any_permission(Role::Staff, &[Permission::ChangeRoles]));
    }

    #[test]
    fn invite_table() {
        for target in ALL_ROLES {
            assert!(can_invite_role(Role::Owner, target));
            assert!(!can_invite_role(Role::Staff, target));
        }
        assert!(can_invite_role(Role::Admin, Role::Staff));
        assert!(!can_invite_role(Role::Admin, Role::Admin));
        assert!(!can_invite_role(Role::Admin, Role::Owner));
    }

    #[test]
    fn remove_table() {
        assert!(!can_remove_role(Role::Owner, Role::Owner));
        assert!(can_remove_role(Role::Owner, Role::Admin));
        assert!(can_remove_role(Role::Owner, Role::Staff));
        assert!(can_remove_role(Role::Admin, Role::Staff));
        assert!(!can_remove_role(Role::Admin, Role::Admin));
        assert!(!can_remove_role(Role::Admin, Role::Owner));
        for target in ALL_ROLES {
            assert!(!can_remove_role(Role::Staff, target));
        }
    }

    #[test]
    fn change_role_table() {
        assert!(can_change_role(Role::Owner, Role::Staff, Role::Admin));
        assert!(can_change_role(Role::Owner, Role::Admin, Role::Staff));
        // Never involving the owner role on either side
        assert!(!can_change_role(Role::Owner, Role::Owner, Role::Admin));
        assert!(!can_change_role(Role::Owner, Role::Staff, Role::Owner));
        // Only owners change roles at all
        assert!(!can_change_role(Role::Admin, Role::Staff, Role::Admin));
        assert!(!can_change_role(Role::Staff, Role::Staff, Role::Admin));
    }
}
