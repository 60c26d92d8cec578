//! Invitation repository: issuing and redeeming membership offers.

use chrono::{DateTime, Utc};
use shopyard_core::error::is_unique_violation;
use shopyard_core::models::{Invitation, Membership, User};
use shopyard_core::rbac::Role;
use shopyard_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::transaction::with_transaction;

#[derive(Clone)]
pub struct InvitationRepository {
    pool: PgPool,
}

impl InvitationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "invitations"))]
    pub async fn create(
        &self,
        email: &str,
        tenant_id: Uuid,
        role: Role,
        invited_by: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation, AppError> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO invitations (email, tenant_id, role, invited_by, token, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, tenant_id, role, invited_by, token, expires_at, accepted_at, created_at
            "#,
        )
        .bind(email)
        .bind(tenant_id)
        .bind(role)
        .bind(invited_by)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            invitation_id = %invitation.id,
            tenant_id = %tenant_id,
            role = %role,
            "Created invitation"
        );
        Ok(invitation)
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "invitations"))]
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Invitation>, AppError> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, email, tenant_id, role, invited_by, token, expires_at, accepted_at, created_at
            FROM invitations
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invitation)
    }

    /// Redeem an invitation: mark it accepted and create the membership as
    /// one atomic unit. The conditional `accepted_at IS NULL` update makes
    /// the token single-use even under concurrent redemption; the loser
    /// sees zero rows updated and gets `BadRequest`.
    #[tracing::instrument(skip(self), fields(db.table = "invitations", db.record_id = %invitation_id))]
    pub async fn accept_with_user(
        &self,
        invitation_id: Uuid,
        tenant_id: Uuid,
        role: Role,
        user_id: Uuid,
    ) -> Result<Membership, AppError> {
        let membership = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let claimed = sqlx::query(
                    r#"
                    UPDATE invitations
                    SET accepted_at = NOW()
                    WHERE id = $1 AND accepted_at IS NULL
                    "#,
                )
                .bind(invitation_id)
                .execute(&mut **tx)
                .await?;

                if claimed.rows_affected() == 0 {
                    return Err(AppError::BadRequest(
                        "Invitation has already been accepted".to_string(),
                    ));
                }

                let membership = sqlx::query_as::<_, Membership>(
                    r#"
                    INSERT INTO user_tenants (user_id, tenant_id, role)
                    VALUES ($1, $2, $3)
                    RETURNING id, user_id, tenant_id, role, created_at
                    "#,
                )
                .bind(user_id)
                .bind(tenant_id)
                .bind(role)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::Conflict(
                            "User is already a member of this business".to_string(),
                        )
                    } else {
                        AppError::Database(e)
                    }
                })?;

                Ok(membership)
            })
        })
        .await?;

        tracing::info!(
            invitation_id = %invitation_id,
            membership_id = %membership.id,
            "Accepted invitation"
        );
        Ok(membership)
    }

    /// Redeem an invitation for someone without an account: claim the
    /// invitation, create the user with an initial session, and insert the
    /// membership in one transaction. Losing the single-use claim rolls
    /// everything back, so no orphan account survives a replayed token.
    #[tracing::instrument(
        skip(self, password_hash, session_token),
        fields(db.table = "invitations", db.record_id = %invitation_id)
    )]
    #[allow(clippy::too_many_arguments)]
    pub async fn accept_with_new_user(
        &self,
        invitation_id: Uuid,
        tenant_id: Uuid,
        role: Role,
        name: &str,
        email: &str,
        password_hash: &str,
        session_token: &str,
        session_expires: DateTime<Utc>,
    ) -> Result<(User, Membership), AppError> {
        let name = name.to_string();
        let email = email.to_string();
        let password_hash = password_hash.to_string();
        let session_token = session_token.to_string();

        let (user, membership) = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let claimed = sqlx::query(
                    r#"
                    UPDATE invitations
                    SET accepted_at = NOW()
                    WHERE id = $1 AND accepted_at IS NULL
                    "#,
                )
                .bind(invitation_id)
                .execute(&mut **tx)
                .await?;

                if claimed.rows_affected() == 0 {
                    return Err(AppError::BadRequest(
                        "Invitation has already been accepted".to_string(),
                    ));
                }

                let user = sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (name, email, password_hash)
                    VALUES ($1, $2, $3)
                    RETURNING id, name, email, email_verified, image, password_hash, created_at, updated_at
                    "#,
                )
                .bind(&name)
                .bind(&email)
                .bind(&password_hash)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::Conflict("Email already registered".to_string())
                    } else {
                        AppError::Database(e)
                    }
                })?;

                sqlx::query(
                    r#"
                    INSERT INTO sessions (session_token, user_id, expires)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(&session_token)
                .bind(user.id)
                .bind(session_expires)
                .execute(&mut **tx)
                .await?;

                let membership = sqlx::query_as::<_, Membership>(
                    r#"
                    INSERT INTO user_tenants (user_id, tenant_id, role)
                    VALUES ($1, $2, $3)
                    RETURNING id, user_id, tenant_id, role, created_at
                    "#,
                )
                .bind(user.id)
                .bind(tenant_id)
                .bind(role)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::Conflict(
                            "User is already a member of this business".to_string(),
                        )
                    } else {
                        AppError::Database(e)
                    }
                })?;

                Ok((user, membership))
            })
        })
        .await?;

        tracing::info!(
            invitation_id = %invitation_id,
            user_id = %user.id,
            membership_id = %membership.id,
            "Accepted invitation with new account"
        );
        Ok((user, membership))
    }
}
