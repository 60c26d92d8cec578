//! Session repository: the DB-backed auth session provider.

use chrono::{DateTime, Utc};
use shopyard_core::models::{Session, SessionUser};
use shopyard_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "sessions"))]
    pub async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<Session, AppError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (session_token, user_id, expires)
            VALUES ($1, $2, $3)
            RETURNING session_token, user_id, expires
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(expires)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    /// Resolve a session token to its user, ignoring expired sessions.
    /// This is the `{user_id, email, name} | none` contract the router and
    /// RBAC gate rely on.
    #[tracing::instrument(skip(self, token), fields(db.table = "sessions"))]
    pub async fn find_user_by_token(&self, token: &str) -> Result<Option<SessionUser>, AppError> {
        let user = sqlx::query_as::<_, (Uuid, String, Option<String>)>(
            r#"
            SELECT u.id, u.email, u.name
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.session_token = $1 AND s.expires > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user.map(|(user_id, email, name)| SessionUser {
            user_id,
            email,
            name,
        }))
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "sessions"))]
    pub async fn delete(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE session_token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove lapsed sessions. Reads already filter on `expires`, so this
    /// only keeps the table from growing without bound; it runs
    /// opportunistically whenever a new session is opened.
    #[tracing::instrument(skip(self), fields(db.table = "sessions"))]
    pub async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires < NOW()")
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            tracing::debug!(removed, "Pruned expired sessions");
        }
        Ok(removed)
    }
}
