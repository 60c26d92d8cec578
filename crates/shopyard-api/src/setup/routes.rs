//! Route configuration and setup.
//!
//! Middleware ordering matters: the session resolver runs before the
//! tenant router so the routing decision can see whether a session is
//! present; request-id, tracing, and CORS wrap everything.

use crate::auth::session_middleware;
use crate::handlers::{auth, billing, dashboard, health, invitations, plans, team, tenants, user};
use crate::middleware::{request_id_middleware, tenant_middleware};
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use shopyard_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

const MAX_BODY_BYTES: usize = 256 * 1024;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let api = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        // Tenants
        .route("/api/tenants/check-subdomain", get(tenants::check_subdomain))
        .route("/api/tenants", post(tenants::create_tenant))
        // Billing
        .route("/api/billing/plans", get(plans::list_plans))
        .route("/api/billing/checkout", post(billing::checkout))
        .route("/api/billing/webhook", post(billing::webhook))
        .route("/api/billing/subscription", get(billing::get_subscription))
        .route("/api/billing/cancel", post(billing::cancel_subscription))
        .route(
            "/api/billing/transactions/{order_id}",
            get(billing::get_transaction),
        )
        // Invitations
        .route("/api/invitations", post(invitations::send_invitation))
        .route(
            "/api/invitations/accept",
            post(invitations::accept_invitation),
        )
        .route(
            "/api/invitations/{token}",
            get(invitations::preview_invitation),
        )
        // Team
        .route("/api/team/members", get(team::list_members))
        .route(
            "/api/team/members/{id}",
            delete(team::remove_member).patch(team::change_member_role),
        )
        // Current user
        .route("/api/user/role", get(user::get_role))
        // Dashboard (target of the bare-root rewrite)
        .route("/dashboard", get(dashboard::dashboard));

    // Layers apply bottom-up: session resolution runs first, then the
    // tenant router, then the route handlers.
    let app = api
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            tenant_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins().contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    };
    Ok(cors)
}
