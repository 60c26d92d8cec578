//! Registration, login, and logout.

use axum::http::HeaderMap;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shopyard_core::models::User;
use shopyard_core::AppError;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::extract_session_token;
use crate::auth::{generate_token, hash_password, verify_password};
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

async fn open_session(state: &AppState, user_id: Uuid) -> Result<String, AppError> {
    // Opportunistic pruning; a failure here must not block sign-in.
    if let Err(e) = state.db.sessions.delete_expired().await {
        tracing::warn!(error = %e, "Failed to prune expired sessions");
    }

    let token = generate_token();
    let expires = Utc::now() + Duration::hours(state.config.session_ttl_hours());
    state.db.sessions.create(user_id, &token, expires).await?;
    Ok(token)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let password_hash = hash_password(&body.password)?;
    let user = state
        .db
        .users
        .create(&body.name, &body.email.to_lowercase(), &password_hash)
        .await?;

    let token = open_session(&state, user.id).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(SessionResponse {
            token,
            user: UserSummary::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    // The same message for unknown email and wrong password, so the
    // endpoint does not confirm which emails are registered.
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .db
        .users
        .get_by_email(&body.email.to_lowercase())
        .await?
        .ok_or_else(invalid)?;

    let stored_hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    if !verify_password(&body.password, stored_hash)? {
        return Err(invalid().into());
    }

    let token = open_session(&state, user.id).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(SessionResponse {
        token,
        user: UserSummary::from(&user),
    }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpAppError> {
    if let Some(token) = extract_session_token(&headers) {
        state.db.sessions.delete(&token).await?;
    }
    Ok(Json(json!({ "success": true })))
}
