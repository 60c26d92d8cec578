//! Team membership management.
//!
//! Role-pair rules (who may remove or re-role whom) come from the core
//! decision tables; handlers never compare roles inline.

use axum::extract::{Path, State};
use axum::{response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use shopyard_core::rbac::{can_change_role, can_remove_role, Role};
use shopyard_core::{AppError, Permission};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::middleware::TenantContext;
use crate::rbac::require_permission;
use crate::state::AppState;

pub async fn list_members(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, HttpAppError> {
    require_permission(
        Some(&user),
        Some(&tenant),
        &state.db.memberships,
        Permission::InviteUsers,
    )
    .await?;

    let members = state.db.memberships.list_members(tenant.tenant_id).await?;
    Ok(Json(members))
}

pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    tenant: TenantContext,
    Path(membership_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let actor_role = require_permission(
        Some(&user),
        Some(&tenant),
        &state.db.memberships,
        Permission::RemoveUsers,
    )
    .await?;

    let member = state
        .db
        .memberships
        .get_member(membership_id, tenant.tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    if member.user_id == user.0.user_id {
        return Err(AppError::BadRequest("You cannot remove yourself".to_string()).into());
    }
    if !can_remove_role(actor_role, member.role) {
        return Err(AppError::Forbidden(format!(
            "Role {} may not remove a {}",
            actor_role, member.role
        ))
        .into());
    }

    state
        .db
        .memberships
        .remove(membership_id, tenant.tenant_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

pub async fn change_member_role(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    tenant: TenantContext,
    Path(membership_id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<ChangeRoleRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let actor_role = require_permission(
        Some(&user),
        Some(&tenant),
        &state.db.memberships,
        Permission::ChangeRoles,
    )
    .await?;

    let member = state
        .db
        .memberships
        .get_member(membership_id, tenant.tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    if !can_change_role(actor_role, member.role, body.role) {
        return Err(AppError::Forbidden(format!(
            "Role {} may not change a {} to {}",
            actor_role, member.role, body.role
        ))
        .into());
    }

    let updated = state
        .db
        .memberships
        .update_role(membership_id, tenant.tenant_id, body.role)
        .await?;
    Ok(Json(updated))
}
