use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing interval for a plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "plan_interval", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    Monthly,
    Yearly,
}

/// Billing plan (SKU)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub interval: PlanInterval,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
