//! Billing state machine integration tests.
//!
//! Run with: `cargo test -p shopyard-db --test billing_test`. Requires
//! Docker for testcontainers (Postgres).

mod helpers;

use chrono::{DateTime, Utc};
use helpers::{create_test_tenant, create_test_user, first_active_plan, setup_test_db};
use serde_json::json;
use shopyard_core::models::{InvoiceStatus, PaymentStatus, SubscriptionStatus};
use shopyard_core::AppError;
use shopyard_db::{with_transaction, BillingRepository, GatewayPaymentUpdate};
use uuid::Uuid;

fn settlement_update(gateway_transaction_id: &str) -> GatewayPaymentUpdate {
    GatewayPaymentUpdate {
        status: PaymentStatus::Settlement,
        gateway_transaction_id: Some(gateway_transaction_id.to_string()),
        payment_type: Some("qris".to_string()),
        transaction_time: Some(Utc::now()),
        settlement_time: Some(Utc::now()),
        metadata: json!({ "transaction_status": "settlement" }),
    }
}

async fn invoice_state(
    pool: &sqlx::PgPool,
    invoice_id: Uuid,
) -> (String, Option<DateTime<Utc>>) {
    sqlx::query_as("SELECT status::text, paid_at FROM invoices WHERE id = $1")
        .bind(invoice_id)
        .fetch_one(pool)
        .await
        .expect("invoice lookup")
}

#[tokio::test]
async fn subscription_and_invoice_are_created_atomically() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db.pool, "owner@example.com").await;
    let tenant = create_test_tenant(&db.pool, owner.id, "pet-paradise").await;
    let plan = first_active_plan(&db.pool).await;

    // A failure after the subscription insert must roll the insert back.
    let tenant_id = tenant.id;
    let plan_id = plan.id;
    let result: Result<(), AppError> = with_transaction(&db.pool, move |tx| {
        Box::pin(async move {
            sqlx::query(
                r#"
                INSERT INTO subscriptions
                    (tenant_id, plan_id, status, current_period_start, current_period_end)
                VALUES ($1, $2, 'trialing', NOW(), NOW() + INTERVAL '1 month')
                "#,
            )
            .bind(tenant_id)
            .bind(plan_id)
            .execute(&mut **tx)
            .await?;
            Err(AppError::Internal("invoice insert failed".to_string()))
        })
    })
    .await;
    assert!(result.is_err());

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions")
        .fetch_one(&db.pool)
        .await
        .expect("count subscriptions");
    assert_eq!(count, 0, "rolled-back subscription must not persist");

    let billing = BillingRepository::new(db.pool.clone());
    let (subscription, invoice) = billing
        .create_subscription(tenant.id, &plan)
        .await
        .expect("create subscription");
    assert_eq!(subscription.status, SubscriptionStatus::Trialing);
    assert_eq!(invoice.status, InvoiceStatus::Pending);
    assert_eq!(invoice.subscription_id, subscription.id);
    assert_eq!(invoice.amount, plan.price);
}

#[tokio::test]
async fn redelivered_settlement_is_idempotent() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db.pool, "owner@example.com").await;
    let tenant = create_test_tenant(&db.pool, owner.id, "pet-paradise").await;
    let plan = first_active_plan(&db.pool).await;

    let billing = BillingRepository::new(db.pool.clone());
    let (_subscription, invoice) = billing
        .create_subscription(tenant.id, &plan)
        .await
        .expect("create subscription");
    billing
        .create_payment_transaction(invoice.id, "SHOP-idem-1", invoice.amount)
        .await
        .expect("create payment transaction");

    billing
        .apply_gateway_update("SHOP-idem-1", settlement_update("gw-1"))
        .await
        .expect("first delivery");
    billing
        .activate_subscription(invoice.id)
        .await
        .expect("first activation");

    let (status, paid_at) = invoice_state(&db.pool, invoice.id).await;
    assert_eq!(status, "paid");
    let paid_at = paid_at.expect("paid_at stamped");
    let active = billing
        .get_active_subscription(tenant.id)
        .await
        .expect("active lookup")
        .expect("subscription active after settlement");
    let period_end = active.current_period_end;

    // The gateway redelivers the identical notification.
    billing
        .apply_gateway_update("SHOP-idem-1", settlement_update("gw-1"))
        .await
        .expect("redelivery");
    billing
        .activate_subscription(invoice.id)
        .await
        .expect("redelivered activation");

    let (status_after, paid_at_after) = invoice_state(&db.pool, invoice.id).await;
    assert_eq!(status_after, "paid");
    assert_eq!(paid_at_after, Some(paid_at), "paid_at must not move");

    let active_after = billing
        .get_active_subscription(tenant.id)
        .await
        .expect("active lookup")
        .expect("still active");
    assert_eq!(
        active_after.current_period_end, period_end,
        "redelivery must not extend the billing period"
    );

    let (invoices,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM invoices WHERE subscription_id = $1")
            .bind(active_after.id)
            .fetch_one(&db.pool)
            .await
            .expect("count invoices");
    assert_eq!(invoices, 1);
}

#[tokio::test]
async fn late_notification_does_not_regress_settled_status() {
    let db = setup_test_db().await;
    let owner = create_test_user(&db.pool, "owner@example.com").await;
    let tenant = create_test_tenant(&db.pool, owner.id, "pet-paradise").await;
    let plan = first_active_plan(&db.pool).await;

    let billing = BillingRepository::new(db.pool.clone());
    let (_subscription, invoice) = billing
        .create_subscription(tenant.id, &plan)
        .await
        .expect("create subscription");
    billing
        .create_payment_transaction(invoice.id, "SHOP-late-1", invoice.amount)
        .await
        .expect("create payment transaction");

    billing
        .apply_gateway_update("SHOP-late-1", settlement_update("gw-1"))
        .await
        .expect("settlement delivery");

    // A queued earlier notification arrives after the terminal one.
    let stale = GatewayPaymentUpdate {
        status: PaymentStatus::Pending,
        gateway_transaction_id: None,
        payment_type: None,
        transaction_time: None,
        settlement_time: None,
        metadata: json!({ "transaction_status": "pending" }),
    };
    let returned = billing
        .apply_gateway_update("SHOP-late-1", stale)
        .await
        .expect("late delivery");
    assert_eq!(returned.status, PaymentStatus::Settlement);

    let stored = billing
        .get_transaction_by_order_id("SHOP-late-1")
        .await
        .expect("lookup")
        .expect("transaction exists");
    assert_eq!(stored.status, PaymentStatus::Settlement);
    assert_eq!(stored.gateway_transaction_id.as_deref(), Some("gw-1"));

    // Unknown order ids still surface as NotFound.
    let missing = billing
        .apply_gateway_update("SHOP-nope", settlement_update("gw-2"))
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}
