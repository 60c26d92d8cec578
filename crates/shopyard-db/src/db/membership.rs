//! Membership repository: who belongs to which tenant, and as what.

use shopyard_core::error::is_unique_violation;
use shopyard_core::models::{Membership, TeamMember};
use shopyard_core::rbac::Role;
use shopyard_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Role of a user within a tenant, `None` when not a member. This is
    /// the single query every permission gate runs.
    #[tracing::instrument(skip(self), fields(db.table = "user_tenants"))]
    pub async fn get_role(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, (Role,)>(
            r#"
            SELECT role
            FROM user_tenants
            WHERE user_id = $1 AND tenant_id = $2
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(role.map(|(r,)| r))
    }

    /// Fetch a membership by id, scoped to the tenant so a caller can never
    /// address a row belonging to another tenant.
    #[tracing::instrument(skip(self), fields(db.table = "user_tenants", db.record_id = %membership_id))]
    pub async fn get_member(
        &self,
        membership_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, user_id, tenant_id, role, created_at
            FROM user_tenants
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(membership_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_tenants"))]
    pub async fn list_members(&self, tenant_id: Uuid) -> Result<Vec<TeamMember>, AppError> {
        let members = sqlx::query_as::<_, TeamMember>(
            r#"
            SELECT ut.id, ut.user_id, ut.role, u.name, u.email, ut.created_at
            FROM user_tenants ut
            JOIN users u ON u.id = ut.user_id
            WHERE ut.tenant_id = $1
            ORDER BY ut.created_at ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_tenants"))]
    pub async fn add_member(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        role: Role,
    ) -> Result<Membership, AppError> {
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
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User is already a member of this business".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        tracing::info!(
            membership_id = %membership.id,
            tenant_id = %tenant_id,
            role = %role,
            "Added member to tenant"
        );
        Ok(membership)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_tenants", db.record_id = %membership_id))]
    pub async fn remove(&self, membership_id: Uuid, tenant_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM user_tenants WHERE id = $1 AND tenant_id = $2")
            .bind(membership_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Member not found".to_string()));
        }

        tracing::info!(membership_id = %membership_id, "Removed member from tenant");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_tenants", db.record_id = %membership_id))]
    pub async fn update_role(
        &self,
        membership_id: Uuid,
        tenant_id: Uuid,
        role: Role,
    ) -> Result<Membership, AppError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE user_tenants
            SET role = $3
            WHERE id = $1 AND tenant_id = $2
            RETURNING id, user_id, tenant_id, role, created_at
            "#,
        )
        .bind(membership_id)
        .bind(tenant_id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

        tracing::info!(membership_id = %membership.id, role = %role, "Changed member role");
        Ok(membership)
    }
}
