use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription lifecycle status.
/// A subscription is created `trialing` and only becomes `active` once the
/// gateway confirms payment; `past_due` is reserved for lapsed periods but
/// is never auto-applied (callers re-check the period end every time).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Cancelled,
}

/// A tenant's binding to a plan for a billing period.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invoice status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

/// A billable instance. One invoice is created per subscription creation;
/// renewal invoicing is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub due_date: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Payment transaction status, kept as a direct pass-through of the
/// gateway's vocabulary rather than a collapsed internal enum, preserving
/// gateway-specific nuance for audit purposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Settlement,
    Capture,
    Deny,
    Cancel,
    Expire,
    Failure,
}

impl PaymentStatus {
    /// Map the gateway's `transaction_status` vocabulary onto ours.
    /// Unrecognized values are recorded as `pending` (with the raw payload
    /// kept for audit) instead of rejecting the delivery, so a permanently
    /// malformed payload is not retried forever.
    pub fn from_provider(transaction_status: &str) -> Self {
        match transaction_status {
            "settlement" => PaymentStatus::Settlement,
            "capture" => PaymentStatus::Capture,
            "deny" => PaymentStatus::Deny,
            "cancel" => PaymentStatus::Cancel,
            "expire" => PaymentStatus::Expire,
            "failure" => PaymentStatus::Failure,
            _ => PaymentStatus::Pending,
        }
    }

    /// Both `settlement` and `capture` denote a successful payment.
    pub fn is_success(self) -> bool {
        matches!(self, PaymentStatus::Settlement | PaymentStatus::Capture)
    }
}

/// Record of one gateway payment attempt. `order_id` is the unique
/// correlation key the webhook uses to find this row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub order_id: String,
    pub gateway_transaction_id: Option<String>,
    pub payment_type: Option<String>,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub transaction_time: Option<DateTime<Utc>>,
    pub settlement_time: Option<DateTime<Utc>>,
    /// Raw gateway payload, stored opaquely for audit.
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_is_passed_through() {
        assert_eq!(
            PaymentStatus::from_provider("settlement"),
            PaymentStatus::Settlement
        );
        assert_eq!(
            PaymentStatus::from_provider("capture"),
            PaymentStatus::Capture
        );
        assert_eq!(PaymentStatus::from_provider("deny"), PaymentStatus::Deny);
        assert_eq!(PaymentStatus::from_provider("cancel"), PaymentStatus::Cancel);
        assert_eq!(PaymentStatus::from_provider("expire"), PaymentStatus::Expire);
        assert_eq!(
            PaymentStatus::from_provider("failure"),
            PaymentStatus::Failure
        );
        assert_eq!(
            PaymentStatus::from_provider("pending"),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn unknown_provider_status_is_recorded_as_pending() {
        assert_eq!(
            PaymentStatus::from_provider("refund_in_progress"),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn only_settlement_and_capture_are_success() {
        assert!(PaymentStatus::Settlement.is_success());
        assert!(PaymentStatus::Capture.is_success());
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Deny,
            PaymentStatus::Cancel,
            PaymentStatus::Expire,
            PaymentStatus::Failure,
        ] {
            assert!(!status.is_success(), "{:?} must not be success", status);
        }
    }
}
