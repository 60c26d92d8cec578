//! Tenant dashboard, the target of the bare-root rewrite.

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::HttpAppError;
use crate::middleware::TenantContext;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub tenant_id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub subscription_active: bool,
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let subscription_active = state
        .db
        .billing
        .is_subscription_active(tenant.tenant_id)
        .await?;

    Ok(Json(DashboardResponse {
        tenant_id: tenant.tenant_id,
        name: tenant.name,
        subdomain: tenant.subdomain,
        subscription_active,
    }))
}
