//! Billing repository: subscriptions, invoices and payment transactions.
//!
//! State transitions here follow the gateway-driven lifecycle: a checkout
//! creates a `trialing` subscription with a `pending` invoice, and only a
//! verified webhook promotes them to `active`/`paid`.

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use shopyard_core::error::is_unique_violation;
use shopyard_core::models::{
    Invoice, PaymentStatus, PaymentTransaction, Plan, PlanInterval, Subscription,
};
use shopyard_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::transaction::with_transaction;

/// Fields a gateway notification carries onto an existing transaction row.
#[derive(Debug, Clone)]
pub struct GatewayPaymentUpdate {
    pub status: PaymentStatus,
    pub gateway_transaction_id: Option<String>,
    pub payment_type: Option<String>,
    pub transaction_time: Option<DateTime<Utc>>,
    pub settlement_time: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

#[derive(Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Start a subscription for a tenant on a plan. The subscription and
    /// its first invoice are created together; the invoice is what the
    /// checkout charges against.
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions"))]
    pub async fn create_subscription(
        &self,
        tenant_id: Uuid,
        plan: &Plan,
    ) -> Result<(Subscription, Invoice), AppError> {
        let now = Utc::now();
        let months = match plan.interval {
            PlanInterval::Monthly => Months::new(1),
            PlanInterval::Yearly => Months::new(12),
        };
        let period_end = now
            .checked_add_months(months)
            .ok_or_else(|| AppError::Internal("Billing period end out of range".to_string()))?;

        let plan_id = plan.id;
        let amount = plan.price;

        let (subscription, invoice) = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let subscription = sqlx::query_as::<_, Subscription>(
                    r#"
                    INSERT INTO subscriptions
                        (tenant_id, plan_id, status, current_period_start, current_period_end)
                    VALUES ($1, $2, 'trialing', $3, $4)
                    RETURNING id, tenant_id, plan_id, status,
                              current_period_start, current_period_end,
                              cancelled_at, created_at, updated_at
                    "#,
                )
                .bind(tenant_id)
                .bind(plan_id)
                .bind(now)
                .bind(period_end)
                .fetch_one(&mut **tx)
                .await?;

                let invoice = sqlx::query_as::<_, Invoice>(
                    r#"
                    INSERT INTO invoices (subscription_id, amount, status, due_date)
                    VALUES ($1, $2, 'pending', $3)
                    RETURNING id, subscription_id, amount, status, due_date, paid_at, created_at
                    "#,
                )
                .bind(subscription.id)
                .bind(amount)
                .bind(now)
                .fetch_one(&mut **tx)
                .await?;

                Ok((subscription, invoice))
            })
        })
        .await?;

        tracing::info!(
            subscription_id = %subscription.id,
            invoice_id = %invoice.id,
            tenant_id = %tenant_id,
            "Created subscription with initial invoice"
        );
        Ok((subscription, invoice))
    }

    /// Record the start of one gateway payment attempt. `order_id` is the
    /// correlation key the webhook will look up, unique by constraint.
    #[tracing::instrument(skip(self), fields(db.table = "payment_transactions"))]
    pub async fn create_payment_transaction(
        &self,
        invoice_id: Uuid,
        order_id: &str,
        amount: Decimal,
    ) -> Result<PaymentTransaction, AppError> {
        let transaction = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            INSERT INTO payment_transactions (invoice_id, order_id, amount, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id, invoice_id, order_id, gateway_transaction_id, payment_type,
                      amount, status, transaction_time, settlement_time, metadata,
                      created_at, updated_at
            "#,
        )
        .bind(invoice_id)
        .bind(order_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Payment already initiated for this order".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(transaction)
    }

    #[tracing::instrument(skip(self), fields(db.table = "payment_transactions"))]
    pub async fn get_transaction_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<PaymentTransaction>, AppError> {
        let transaction = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            SELECT id, invoice_id, order_id, gateway_transaction_id, payment_type,
                   amount, status, transaction_time, settlement_time, metadata,
                   created_at, updated_at
            FROM payment_transactions
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    /// Apply a gateway notification to a transaction row, keeping the raw
    /// payload for audit.
    ///
    /// The update is conditional on the row still being `pending`: under
    /// at-least-once delivery a delayed retry of an earlier notification
    /// can arrive after the terminal one, and must not regress the stored
    /// status. When the guard misses the existing row is returned
    /// unchanged.
    #[tracing::instrument(skip(self, update), fields(db.table = "payment_transactions"))]
    pub async fn apply_gateway_update(
        &self,
        order_id: &str,
        update: GatewayPaymentUpdate,
    ) -> Result<PaymentTransaction, AppError> {
        let transaction = sqlx::query_as::<_, PaymentTransaction>(
            r#"
            UPDATE payment_transactions
            SET status = $2,
                gateway_transaction_id = $3,
                payment_type = $4,
                transaction_time = $5,
                settlement_time = $6,
                metadata = $7,
                updated_at = NOW()
            WHERE order_id = $1 AND status = 'pending'
            RETURNING id, invoice_id, order_id, gateway_transaction_id, payment_type,
                      amount, status, transaction_time, settlement_time, metadata,
                      created_at, updated_at
            "#,
        )
        .bind(order_id)
        .bind(update.status)
        .bind(update.gateway_transaction_id)
        .bind(update.payment_type)
        .bind(update.transaction_time)
        .bind(update.settlement_time)
        .bind(update.metadata)
        .fetch_optional(&self.pool)
        .await?;

        match transaction {
            Some(transaction) => {
                tracing::info!(
                    order_id = %order_id,
                    status = ?transaction.status,
                    "Applied gateway payment update"
                );
                Ok(transaction)
            }
            None => {
                let existing = self
                    .get_transaction_by_order_id(order_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound("Payment transaction not found".to_string())
                    })?;
                tracing::debug!(
                    order_id = %order_id,
                    status = ?existing.status,
                    "Transaction already settled, keeping recorded status"
                );
                Ok(existing)
            }
        }
    }

    /// Mark an invoice paid and activate its subscription, atomically.
    ///
    /// The conditional `status = 'pending'` update makes this idempotent:
    /// a redelivered success notification finds zero pending rows and the
    /// whole call is a no-op. A missing invoice is `NotFound`.
    #[tracing::instrument(skip(self), fields(db.table = "invoices", db.record_id = %invoice_id))]
    pub async fn activate_subscription(&self, invoice_id: Uuid) -> Result<(), AppError> {
        let activated = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let claimed = sqlx::query(
                    r#"
                    UPDATE invoices
                    SET status = 'paid', paid_at = NOW()
                    WHERE id = $1 AND status = 'pending'
                    "#,
                )
                .bind(invoice_id)
                .execute(&mut **tx)
                .await?;

                if claimed.rows_affected() == 0 {
                    let exists = sqlx::query_as::<_, (Uuid,)>(
                        "SELECT id FROM invoices WHERE id = $1",
                    )
                    .bind(invoice_id)
                    .fetch_optional(&mut **tx)
                    .await?;

                    if exists.is_none() {
                        return Err(AppError::NotFound("Invoice not found".to_string()));
                    }
                    // Already paid; a redelivered notification is harmless.
                    return Ok(false);
                }

                sqlx::query(
                    r#"
                    UPDATE subscriptions
                    SET status = 'active', updated_at = NOW()
                    WHERE id = (SELECT subscription_id FROM invoices WHERE id = $1)
                    "#,
                )
                .bind(invoice_id)
                .execute(&mut **tx)
                .await?;

                Ok(true)
            })
        })
        .await?;

        if activated {
            tracing::info!(invoice_id = %invoice_id, "Activated subscription");
        } else {
            tracing::debug!(invoice_id = %invoice_id, "Invoice already settled, skipping");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "subscriptions"))]
    pub async fn get_current_subscription(
        &self,
        tenant_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, tenant_id, plan_id, status,
                   current_period_start, current_period_end,
                   cancelled_at, created_at, updated_at
            FROM subscriptions
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    #[tracing::instrument(skip(self), fields(db.table = "subscriptions"))]
    pub async fn get_active_subscription(
        &self,
        tenant_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, tenant_id, plan_id, status,
                   current_period_start, current_period_end,
                   cancelled_at, created_at, updated_at
            FROM subscriptions
            WHERE tenant_id = $1 AND status = 'active'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    /// Whether the tenant currently has a usable subscription: status must
    /// be exactly `active` and the period must not have lapsed. A lapsed
    /// subscription is reported inactive without mutating its stored
    /// status, so callers must re-check every time.
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions"))]
    pub async fn is_subscription_active(&self, tenant_id: Uuid) -> Result<bool, AppError> {
        let subscription = self.get_active_subscription(tenant_id).await?;
        Ok(subscription
            .map(|s| Utc::now() <= s.current_period_end)
            .unwrap_or(false))
    }

    /// Cancel the tenant's current subscription. Access continues until
    /// the period end; this only records the decision.
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions"))]
    pub async fn cancel_subscription(&self, tenant_id: Uuid) -> Result<Subscription, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET status = 'cancelled', cancelled_at = NOW(), updated_at = NOW()
            WHERE id = (
                SELECT id FROM subscriptions
                WHERE tenant_id = $1 AND status IN ('trialing', 'active')
                ORDER BY created_at DESC
                LIMIT 1
            )
            RETURNING id, tenant_id, plan_id, status,
                      current_period_start, current_period_end,
                      cancelled_at, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No active subscription to cancel".to_string()))?;

        tracing::info!(
            subscription_id = %subscription.id,
            tenant_id = %tenant_id,
            "Cancelled subscription"
        );
        Ok(subscription)
    }
}
