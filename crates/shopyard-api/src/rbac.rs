//! The single authorization gate for mutating tenant-scoped endpoints.
//!
//! Composes the session check (401), tenant-context check (404), role
//! lookup, and permission check (403). Handlers call this before acting
//! and never re-derive role comparisons inline; role-pair rules live in
//! `shopyard_core::rbac`.

use shopyard_core::rbac::{has_permission, Role};
use shopyard_core::{AppError, Permission};
use shopyard_db::MembershipRepository;

use crate::auth::CurrentUser;
use crate::middleware::TenantContext;

pub async fn require_permission(
    user: Option<&CurrentUser>,
    tenant: Option<&TenantContext>,
    memberships: &MembershipRepository,
    permission: Permission,
) -> Result<Role, AppError> {
    let user = user
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
    let tenant = tenant.ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

    let role = memberships
        .get_role(user.0.user_id, tenant.tenant_id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Not a member of this business".to_string()))?;

    if !has_permission(role, permission) {
        return Err(AppError::Forbidden(format!(
            "Role {} lacks the required permission",
            role
        )));
    }

    Ok(role)
}
