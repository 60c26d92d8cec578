//! Tenant resolution and request routing.
//!
//! Every inbound request passes through here. The host header is resolved
//! to a tenant, and a fixed ordered decision list determines whether the
//! request passes through (root domain), gets redirected (unknown tenant,
//! suspended tenant, unauthenticated), or proceeds with tenant identity
//! injected into request extensions and forwarded headers.
//!
//! The decision logic itself is a pure function over already-resolved
//! facts, so the ordering is unit-testable without HTTP or a database.

use axum::extract::{FromRequestParts, OptionalFromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderValue, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use shopyard_core::models::TenantStatus;
use shopyard_core::subdomain::extract_subdomain;
use shopyard_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::constants::{
    HEADER_TENANT_ID, HEADER_TENANT_NAME, HEADER_TENANT_SUBDOMAIN, PUBLIC_TENANT_PATHS,
    PUBLIC_TENANT_PREFIXES,
};
use crate::error::HttpAppError;
use crate::state::AppState;

/// Resolved tenant identity for the current request. Handlers take this as
/// an explicit extractor argument rather than re-parsing ambient headers.
#[derive(Clone, Debug)]
pub struct TenantContext {
    pub tenant_id: Uuid,
    pub subdomain: String,
    pub name: String,
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| HttpAppError(AppError::NotFound("Tenant not found".to_string())))
    }
}

impl<S> OptionalFromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<TenantContext>().cloned())
    }
}

/// Outcome of the per-request routing decision for tenant-subdomain hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
    /// Unknown subdomain: send to the root-domain "not found" page.
    TenantNotFound,
    /// Tenant exists but is not active, and the path is not public.
    TenantSuspended,
    /// Admin surfaces are root-domain-only; bounce to the tenant home.
    AdminDenied,
    /// No session on a protected path: tenant-scoped login.
    LoginRequired,
    /// Proceed with injected context; the bare root is rewritten to the
    /// dashboard view.
    Proceed { rewrite_to_dashboard: bool },
}

fn is_public_path(path: &str) -> bool {
    PUBLIC_TENANT_PATHS.contains(&path)
        || PUBLIC_TENANT_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
}

/// The ordered decision list. Later checks assume earlier ones passed:
/// admin denial presumes an active tenant, login presumes a non-admin
/// path, and context injection presumes all gates cleared.
pub fn route_decision(
    tenant_status: Option<TenantStatus>,
    path: &str,
    has_session: bool,
) -> RouteAction {
    let Some(status) = tenant_status else {
        return RouteAction::TenantNotFound;
    };

    if status != TenantStatus::Active && !is_public_path(path) {
        return RouteAction::TenantSuspended;
    }

    if path.starts_with("/admin") {
        return RouteAction::AdminDenied;
    }

    if !has_session && !is_public_path(path) {
        return RouteAction::LoginRequired;
    }

    RouteAction::Proceed {
        rewrite_to_dashboard: path == "/",
    }
}

fn rewrite_to_dashboard(uri: &Uri) -> Uri {
    let path_and_query = match uri.query() {
        Some(q) => format!("/dashboard?{}", q),
        None => "/dashboard".to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = path_and_query.parse().ok();
    Uri::from_parts(parts).unwrap_or_else(|_| Uri::from_static("/dashboard"))
}

pub async fn tenant_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, HttpAppError> {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    // Root-domain traffic bypasses all tenant logic.
    let Some(subdomain) = extract_subdomain(host, state.config.root_domain()) else {
        return Ok(next.run(request).await);
    };

    let tenant = state.db.tenants.find_by_subdomain(&subdomain).await?;
    let has_session = request.extensions().get::<CurrentUser>().is_some();
    let path = request.uri().path().to_string();

    let action = route_decision(tenant.as_ref().map(|t| t.status), &path, has_session);

    let tenant = match action {
        RouteAction::TenantNotFound => {
            tracing::debug!(subdomain = %subdomain, "Unknown tenant subdomain");
            let target = format!("{}/tenant-not-found", state.config.app_url());
            return Ok(Redirect::temporary(&target).into_response());
        }
        RouteAction::TenantSuspended => {
            let target = format!("{}/suspended", state.config.app_url());
            return Ok(Redirect::temporary(&target).into_response());
        }
        RouteAction::AdminDenied => {
            return Ok(Redirect::temporary("/").into_response());
        }
        RouteAction::LoginRequired => {
            return Ok(Redirect::temporary("/login").into_response());
        }
        RouteAction::Proceed {
            rewrite_to_dashboard: rewrite,
        } => {
            // Invariant from route_decision: Proceed implies the lookup hit.
            let tenant = tenant
                .ok_or_else(|| AppError::Internal("Tenant resolved but missing".to_string()))?;
            if rewrite {
                *request.uri_mut() = rewrite_to_dashboard(request.uri());
            }
            tenant
        }
    };

    let context = TenantContext {
        tenant_id: tenant.id,
        subdomain: tenant.subdomain.clone(),
        name: tenant.name.clone(),
    };

    // Forwarded headers for downstream consumers; the extension is the
    // authoritative in-process carrier.
    let headers = request.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&tenant.id.to_string()) {
        headers.insert(HEADER_TENANT_ID, v);
    }
    if let Ok(v) = HeaderValue::from_str(&tenant.subdomain) {
        headers.insert(HEADER_TENANT_SUBDOMAIN, v);
    }
    if let Ok(v) = HeaderValue::from_str(&tenant.name) {
        headers.insert(HEADER_TENANT_NAME, v);
    }
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIVE: Option<TenantStatus> = Some(TenantStatus::Active);
    const SUSPENDED: Option<TenantStatus> = Some(TenantStatus::Suspended);

    #[test]
    fn unknown_tenant_redirects_before_anything_else() {
        assert_eq!(
            route_decision(None, "/dashboard", true),
            RouteAction::TenantNotFound
        );
        assert_eq!(route_decision(None, "/login", false), RouteAction::TenantNotFound);
    }

    #[test]
    fn suspended_tenant_blocks_protected_paths_only() {
        assert_eq!(
            route_decision(SUSPENDED, "/dashboard", true),
            RouteAction::TenantSuspended
        );
        // Auth surfaces stay reachable so members can still sign in.
        assert_eq!(
            route_decision(SUSPENDED, "/login", false),
            RouteAction::Proceed {
                rewrite_to_dashboard: false
            }
        );
        assert_eq!(
            route_decision(SUSPENDED, "/api/auth/login", false),
            RouteAction::Proceed {
                rewrite_to_dashboard: false
            }
        );
    }

    #[test]
    fn cancelled_tenant_is_gated_like_suspended() {
        assert_eq!(
            route_decision(Some(TenantStatus::Cancelled), "/dashboard", true),
            RouteAction::TenantSuspended
        );
    }

    #[test]
    fn admin_routes_are_root_domain_only() {
        assert_eq!(
            route_decision(ACTIVE, "/admin/tenants", true),
            RouteAction::AdminDenied
        );
        // Even without a session the admin check fires first.
        assert_eq!(
            route_decision(ACTIVE, "/admin", false),
            RouteAction::AdminDenied
        );
    }

    #[test]
    fn no_session_redirects_to_login_on_protected_paths() {
        assert_eq!(
            route_decision(ACTIVE, "/dashboard", false),
            RouteAction::LoginRequired
        );
        assert_eq!(
            route_decision(ACTIVE, "/invitations/accept", false),
            RouteAction::Proceed {
                rewrite_to_dashboard: false
            }
        );
    }

    #[test]
    fn bare_root_is_rewritten_to_dashboard() {
        assert_eq!(
            route_decision(ACTIVE, "/", true),
            RouteAction::Proceed {
                rewrite_to_dashboard: true
            }
        );
        assert_eq!(
            route_decision(ACTIVE, "/dashboard", true),
            RouteAction::Proceed {
                rewrite_to_dashboard: false
            }
        );
    }

    #[test]
    fn rewrite_preserves_query() {
        let uri: Uri = "/?tab=sales".parse().expect("uri");
        assert_eq!(rewrite_to_dashboard(&uri), "/dashboard?tab=sales");
        let uri: Uri = "/".parse().expect("uri");
        assert_eq!(rewrite_to_dashboard(&uri), "/dashboard");
    }
}
