//! Health and readiness checks.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::error::HttpAppError;
use crate::state::AppState;

pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Readiness: verifies the database answers before reporting ready.
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    sqlx::query("SELECT 1")
        .execute(&state.db.pool)
        .await
        .map_err(shopyard_core::AppError::from)?;
    Ok(Json(json!({ "status": "ready" })))
}
