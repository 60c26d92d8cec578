//! Current-user queries within a tenant context.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::error::HttpAppError;
use crate::middleware::TenantContext;
use crate::state::AppState;

/// The caller's role in the current tenant, `null` when not a member.
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let role = state
        .db
        .memberships
        .get_role(user.0.user_id, tenant.tenant_id)
        .await?;
    Ok(Json(json!({ "role": role })))
}
