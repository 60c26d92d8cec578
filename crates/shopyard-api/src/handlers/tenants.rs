//! Tenant registration and subdomain availability.

use axum::extract::{Query, State};
use axum::{response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use shopyard_core::subdomain::{is_valid_subdomain, sanitize_subdomain, subdomain_url};
use shopyard_core::AppError;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckSubdomainQuery {
    pub subdomain: String,
}

#[derive(Debug, Serialize)]
pub struct CheckSubdomainResponse {
    pub available: bool,
}

/// Advisory availability check for the registration form. The database
/// unique constraint remains the source of truth at creation time.
pub async fn check_subdomain(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckSubdomainQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let subdomain = sanitize_subdomain(&query.subdomain);
    if !is_valid_subdomain(&subdomain) {
        return Ok(Json(CheckSubdomainResponse { available: false }));
    }

    let taken = state.db.tenants.find_by_subdomain(&subdomain).await?;
    Ok(Json(CheckSubdomainResponse {
        available: taken.is_none(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 63))]
    pub subdomain: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTenantResponse {
    pub tenant_id: Uuid,
    pub subdomain: String,
    pub url: String,
}

pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ValidatedJson(body): ValidatedJson<CreateTenantRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let subdomain = sanitize_subdomain(&body.subdomain);
    if !is_valid_subdomain(&subdomain) {
        return Err(AppError::InvalidInput(
            "Subdomain must be 3-63 lowercase letters, digits, or hyphens".to_string(),
        )
        .into());
    }

    // The slug mirrors the subdomain; the display name is free-form and
    // two businesses may share it.
    let tenant = state
        .db
        .tenants
        .create_with_owner(&body.name, &subdomain, &subdomain, user.0.user_id)
        .await?;

    let url = subdomain_url(
        &tenant.subdomain,
        state.config.root_domain(),
        state.is_production,
    );
    Ok((
        axum::http::StatusCode::CREATED,
        Json(CreateTenantResponse {
            tenant_id: tenant.id,
            subdomain: tenant.subdomain,
            url,
        }),
    ))
}
