//! Plan repository: the billing catalog, read-only at runtime.

use shopyard_core::models::Plan;
use shopyard_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "plans"))]
    pub async fn list_active(&self) -> Result<Vec<Plan>, AppError> {
        let plans = sqlx::query_as::<_, Plan>(
            r#"
            SELECT id, name, description, price, "interval", is_active, created_at
            FROM plans
            WHERE is_active = TRUE
            ORDER BY price ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }

    #[tracing::instrument(skip(self), fields(db.table = "plans", db.record_id = %plan_id))]
    pub async fn get_by_id(&self, plan_id: Uuid) -> Result<Option<Plan>, AppError> {
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            SELECT id, name, description, price, "interval", is_active, created_at
            FROM plans
            WHERE id = $1
            "#,
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }
}
