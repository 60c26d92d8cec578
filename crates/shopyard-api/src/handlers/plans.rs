//! Billing plan catalog.

use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

use crate::error::HttpAppError;
use crate::state::AppState;

pub async fn list_plans(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let plans = state.db.plans.list_active().await?;
    Ok(Json(plans))
}
