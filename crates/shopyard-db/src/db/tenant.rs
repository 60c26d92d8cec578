//! Tenant repository: directory lookups and registration.

use shopyard_core::error::is_unique_violation;
use shopyard_core::models::{Tenant, TenantStatus};
use shopyard_core::rbac::Role;
use shopyard_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::transaction::with_transaction;

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a tenant and its owner membership as one atomic unit.
    ///
    /// Subdomain and slug uniqueness are enforced here by the database
    /// constraints; the earlier availability check is advisory UX only, so
    /// a losing racer gets `Conflict` rather than a duplicate row.
    #[tracing::instrument(skip(self), fields(db.table = "tenants"))]
    pub async fn create_with_owner(
        &self,
        name: &str,
        slug: &str,
        subdomain: &str,
        owner_user_id: Uuid,
    ) -> Result<Tenant, AppError> {
        let name = name.to_string();
        let slug = slug.to_string();
        let subdomain = subdomain.to_string();

        let tenant = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let tenant = sqlx::query_as::<_, Tenant>(
                    r#"
                    INSERT INTO tenants (name, slug, subdomain, status)
                    VALUES ($1, $2, $3, 'active')
                    RETURNING id, name, slug, subdomain, status, created_at, updated_at
                    "#,
                )
                .bind(&name)
                .bind(&slug)
                .bind(&subdomain)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::Conflict("Subdomain is already taken".to_string())
                    } else {
                        AppError::Database(e)
                    }
                })?;

                sqlx::query(
                    r#"
                    INSERT INTO user_tenants (user_id, tenant_id, role)
                    VALUES ($1, $2, $3)
                    "#,
                )
                .bind(owner_user_id)
                .bind(tenant.id)
                .bind(Role::Owner)
                .execute(&mut **tx)
                .await?;

                Ok(tenant)
            })
        })
        .await?;

        tracing::info!(tenant_id = %tenant.id, subdomain = %tenant.subdomain, "Created new tenant");
        Ok(tenant)
    }

    /// Single-row lookup on the unique subdomain index. Used both at
    /// routing time and for the availability check.
    #[tracing::instrument(skip(self), fields(db.table = "tenants"))]
    pub async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, slug, subdomain, status, created_at, updated_at
            FROM tenants
            WHERE subdomain = $1
            "#,
        )
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.record_id = %tenant_id))]
    pub async fn get_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id, name, slug, subdomain, status, created_at, updated_at
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tenants", db.record_id = %tenant_id))]
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        status: TenantStatus,
    ) -> Result<Tenant, AppError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, subdomain, status, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

        tracing::info!(tenant_id = %tenant.id, status = ?tenant.status, "Updated tenant status");
        Ok(tenant)
    }
}
