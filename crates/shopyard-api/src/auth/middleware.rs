//! Session resolution middleware and the `CurrentUser` extractor.
//!
//! The middleware is resolve-only: it attaches `CurrentUser` when a valid
//! session token is presented and passes through otherwise. Enforcement
//! happens in the tenant router (redirects) and the permission gate (401).

use axum::extract::{FromRequestParts, OptionalFromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use shopyard_core::models::SessionUser;
use shopyard_core::AppError;
use std::sync::Arc;

use crate::constants::SESSION_COOKIE;
use crate::error::HttpAppError;
use crate::state::AppState;

/// Authenticated user for the current request, from a valid session token.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub SessionUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized("Authentication required".to_string()))
            })
    }
}

impl<S> OptionalFromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned())
    }
}

/// Pull the session token from `Authorization: Bearer` or the session cookie.
pub fn extract_session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(auth) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    let cookies = headers
        .get(axum::http::header::COOKIE)
        .and_then(|h| h.to_str().ok())?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, HttpAppError> {
    if let Some(token) = extract_session_token(request.headers()) {
        if let Some(user) = state.db.sessions.find_user_by_token(&token).await? {
            request.extensions_mut().insert(CurrentUser(user));
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    fn headers_of(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).expect("name"),
                value.parse().expect("value"),
            );
        }
        headers
    }

    #[test]
    fn bearer_token_wins_over_cookie() {
        let headers = headers_of(&[
            ("authorization", "Bearer abc123"),
            ("cookie", "session_token=def456"),
        ]);
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn cookie_is_parsed_among_others() {
        let headers = headers_of(&[("cookie", "theme=dark; session_token=def456; a=b")]);
        assert_eq!(extract_session_token(&headers).as_deref(), Some("def456"));
    }

    #[test]
    fn missing_credentials_yield_none() {
        let headers = headers_of(&[("cookie", "theme=dark")]);
        assert_eq!(extract_session_token(&headers), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }
}
