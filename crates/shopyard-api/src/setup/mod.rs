//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from
//! main.rs for better organization and testability.

pub mod database;
pub mod routes;
pub mod server;

use crate::services::email::EmailService;
use crate::services::payments::SnapGateway;
use crate::state::{AppState, DbState};
use anyhow::{Context, Result};
use shopyard_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.is_production());
    tracing::info!("Configuration loaded and validated successfully");

    let pool = database::setup_database(&config).await?;

    let gateway = Arc::new(SnapGateway::from_config(&config));
    let email = EmailService::from_config(&config);
    if email.is_none() {
        tracing::warn!("SMTP not configured; invitation emails will not be sent");
    }

    let state = Arc::new(AppState {
        db: DbState::new(pool),
        is_production: config.is_production(),
        gateway,
        email,
        config,
    });

    let router = routes::setup_routes(&state.config, state.clone())?;

    Ok((state, router))
}
