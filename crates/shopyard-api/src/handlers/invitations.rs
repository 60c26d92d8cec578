//! Invitation issuing, preview, and acceptance.

use axum::extract::{Path, State};
use axum::{response::IntoResponse, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use shopyard_core::rbac::{can_invite_role, Role};
use shopyard_core::subdomain::subdomain_url;
use shopyard_core::{AppError, Permission};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{generate_token, hash_password, CurrentUser};
use crate::constants::INVITATION_EXPIRY_DAYS;
use crate::error::{HttpAppError, ValidatedJson};
use crate::middleware::TenantContext;
use crate::rbac::require_permission;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SendInvitationRequest {
    #[validate(email)]
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct SendInvitationResponse {
    pub invitation_id: Uuid,
    pub accept_url: String,
}

pub async fn send_invitation(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    tenant: TenantContext,
    ValidatedJson(body): ValidatedJson<SendInvitationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let actor_role = require_permission(
        Some(&user),
        Some(&tenant),
        &state.db.memberships,
        Permission::InviteUsers,
    )
    .await?;

    if !can_invite_role(actor_role, body.role) {
        return Err(AppError::Forbidden(format!(
            "Role {} may not invite a {}",
            actor_role, body.role
        ))
        .into());
    }

    let token = generate_token();
    let expires_at = Utc::now() + Duration::days(INVITATION_EXPIRY_DAYS);
    let invitation = state
        .db
        .invitations
        .create(
            &body.email.to_lowercase(),
            tenant.tenant_id,
            body.role,
            user.0.user_id,
            &token,
            expires_at,
        )
        .await?;

    let accept_url = format!(
        "{}/invitations/accept?token={}",
        subdomain_url(
            &tenant.subdomain,
            state.config.root_domain(),
            state.is_production
        ),
        token
    );

    // Single attempt; a delivery failure is surfaced to the caller as a
    // failed send, with the invitation row left in place for re-sending.
    if let Some(email_service) = &state.email {
        let inviter = user.0.name.clone().unwrap_or_else(|| user.0.email.clone());
        email_service
            .send_invitation(&invitation.email, &tenant.name, &inviter, body.role, &accept_url)
            .await?;
    }

    Ok((
        axum::http::StatusCode::CREATED,
        Json(SendInvitationResponse {
            invitation_id: invitation.id,
            accept_url,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct InvitationPreview {
    pub email: String,
    pub role: Role,
    pub tenant_name: String,
    pub inviter_name: Option<String>,
}

/// Pre-acceptance preview shown on the invitation landing page.
pub async fn preview_invitation(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let invitation = state
        .db
        .invitations
        .get_by_token(&token)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;

    if invitation.is_expired(Utc::now()) {
        return Err(AppError::BadRequest("Invitation has expired".to_string()).into());
    }
    if invitation.is_accepted() {
        return Err(
            AppError::BadRequest("Invitation has already been accepted".to_string()).into(),
        );
    }

    let tenant = state
        .db
        .tenants
        .get_by_id(invitation.tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;
    let inviter = state.db.users.get_by_id(invitation.invited_by).await?;

    Ok(Json(InvitationPreview {
        email: invitation.email,
        role: invitation.role,
        tenant_name: tenant.name,
        inviter_name: inviter.and_then(|u| u.name),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AcceptInvitationRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AcceptInvitationResponse {
    pub tenant_id: Uuid,
    /// Session token for users created during acceptance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

/// Redeem an invitation token. Acceptance is single-use and expiry wins
/// over everything; the membership insert and the accepted_at stamp are
/// one atomic unit.
pub async fn accept_invitation(
    State(state): State<Arc<AppState>>,
    user: Option<CurrentUser>,
    ValidatedJson(body): ValidatedJson<AcceptInvitationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let invitation = state
        .db
        .invitations
        .get_by_token(&body.token)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))?;

    if invitation.is_expired(Utc::now()) {
        return Err(AppError::BadRequest("Invitation has expired".to_string()).into());
    }
    if invitation.is_accepted() {
        return Err(
            AppError::BadRequest("Invitation has already been accepted".to_string()).into(),
        );
    }

    let (membership, session_token) = match user {
        Some(current) => {
            if !current.0.email.eq_ignore_ascii_case(&invitation.email) {
                return Err(AppError::BadRequest(
                    "Invitation was sent to a different email address".to_string(),
                )
                .into());
            }
            let membership = state
                .db
                .invitations
                .accept_with_user(
                    invitation.id,
                    invitation.tenant_id,
                    invitation.role,
                    current.0.user_id,
                )
                .await?;
            (membership, None)
        }
        None => {
            if state.db.users.get_by_email(&invitation.email).await?.is_some() {
                return Err(AppError::BadRequest(
                    "An account with this email already exists, log in to accept".to_string(),
                )
                .into());
            }
            let (Some(name), Some(password)) = (&body.name, &body.password) else {
                return Err(AppError::InvalidInput(
                    "Name and password are required to create an account".to_string(),
                )
                .into());
            };
            let password_hash = hash_password(password)?;
            let token = generate_token();
            let expires = Utc::now() + Duration::hours(state.config.session_ttl_hours());

            // Account, session, and membership are one atomic unit, so a
            // lost claim race leaves no orphan account behind.
            let (_new_user, membership) = state
                .db
                .invitations
                .accept_with_new_user(
                    invitation.id,
                    invitation.tenant_id,
                    invitation.role,
                    name,
                    &invitation.email,
                    &password_hash,
                    &token,
                    expires,
                )
                .await?;
            (membership, Some(token))
        }
    };

    tracing::info!(
        invitation_id = %invitation.id,
        membership_id = %membership.id,
        "Invitation accepted"
    );
    Ok(Json(AcceptInvitationResponse {
        tenant_id: invitation.tenant_id,
        session_token,
    }))
}
