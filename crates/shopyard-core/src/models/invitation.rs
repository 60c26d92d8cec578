use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rbac::Role;

/// Pending membership offer. The token is single-use: acceptance sets
/// `accepted_at` exactly once, and an expired token is unusable regardless
/// of acceptance state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub tenant_id: Uuid,
    pub role: Role,
    pub invited_by: Uuid,
    #[serde(skip_serializing)]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invitation(expires_at: DateTime<Utc>, accepted_at: Option<DateTime<Utc>>) -> Invitation {
        Invitation {
            id: Uuid::new_v4(),
            email: "member@example.com".to_string(),
            tenant_id: Uuid::new_v4(),
            role: Role::Staff,
            invited_by: Uuid::new_v4(),
            token: "tok".to_string(),
            expires_at,
            accepted_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn expiry_is_checked_against_the_given_instant() {
        let now = Utc::now();
        let inv = invitation(now + Duration::days(7), None);
        assert!(!inv.is_expired(now));
        assert!(inv.is_expired(now + Duration::days(8)));
    }

    #[test]
    fn expired_invitation_stays_expired_even_if_accepted() {
        let now = Utc::now();
        let inv = invitation(now - Duration::hours(1), Some(now - Duration::days(1)));
        assert!(inv.is_expired(now));
        assert!(inv.is_accepted());
    }
}
