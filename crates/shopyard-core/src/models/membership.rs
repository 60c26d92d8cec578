use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rbac::Role;

/// Membership row binding a user to a tenant with a role.
/// At most one row exists per (user_id, tenant_id) pair; the unique
/// constraint is the source of truth, so role lookup is single-row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Membership joined with the member's user record, for team listings.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub name: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
