//! Checkout, gateway webhook, and subscription management.
//!
//! The checkout path creates the pending subscription, invoice, and
//! payment transaction, then opens a gateway session. The webhook path is
//! the only writer that advances payment state afterwards; it is
//! authenticated solely by the payload signature and must stay idempotent
//! under at-least-once delivery.

use axum::extract::{Path, State};
use axum::{response::IntoResponse, Json};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shopyard_core::models::{PaymentStatus, Subscription};
use shopyard_core::{AppError, Permission};
use shopyard_db::GatewayPaymentUpdate;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::middleware::TenantContext;
use crate::rbac::require_permission;
use crate::services::payments::{generate_order_id, CheckoutCustomer, CheckoutItem};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub plan_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub token: String,
    pub redirect_url: String,
    pub order_id: String,
}

pub async fn checkout(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    tenant: TenantContext,
    ValidatedJson(body): ValidatedJson<CheckoutRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_permission(
        Some(&user),
        Some(&tenant),
        &state.db.memberships,
        Permission::ManageBilling,
    )
    .await?;

    let plan = state
        .db
        .plans
        .get_by_id(body.plan_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))?;

    let (_subscription, invoice) = state.db.billing.create_subscription(tenant.tenant_id, &plan).await?;

    let order_id = generate_order_id();
    state
        .db
        .billing
        .create_payment_transaction(invoice.id, &order_id, invoice.amount)
        .await?;

    let customer = CheckoutCustomer {
        first_name: user.0.name.clone().unwrap_or_else(|| user.0.email.clone()),
        email: user.0.email.clone(),
    };
    let items = [CheckoutItem {
        id: plan.id.to_string(),
        name: plan.name.clone(),
        price: plan.price,
        quantity: 1,
    }];

    let session = state
        .gateway
        .create_payment_session(&order_id, invoice.amount, &customer, &items)
        .await?;

    tracing::info!(
        tenant_id = %tenant.tenant_id,
        order_id = %order_id,
        plan = %plan.name,
        "Checkout session opened"
    );
    Ok(Json(CheckoutResponse {
        token: session.token,
        redirect_url: session.redirect_url,
        order_id,
    }))
}

/// Parse the gateway's `YYYY-MM-DD HH:MM:SS` timestamps. Unparseable
/// values are dropped rather than failing the delivery.
fn parse_gateway_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = value?;
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t.and_utc())
}

/// Gateway payment notification. Authentication is the payload signature;
/// there is no session on this endpoint.
///
/// Processing order is fixed: verify the signature before touching any
/// state, then record the status pass-through with the raw payload as
/// audit metadata, then activate on success. Redelivery of an already
/// processed event is a no-op, and permanently malformed payloads are
/// accepted with an error logged so the gateway does not retry forever.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, HttpAppError> {
    let order_id = payload.get("order_id").and_then(Value::as_str);
    let status_code = payload.get("status_code").and_then(Value::as_str);
    let gross_amount = payload.get("gross_amount").and_then(Value::as_str);
    let signature = payload.get("signature_key").and_then(Value::as_str);

    let (Some(order_id), Some(status_code), Some(gross_amount), Some(signature)) =
        (order_id, status_code, gross_amount, signature)
    else {
        // A payload missing signature fields cannot be authenticated.
        return Err(AppError::SignatureInvalid.into());
    };

    if !crate::services::payments::verify_signature(
        order_id,
        status_code,
        gross_amount,
        state.config.gateway_server_key(),
        signature,
    ) {
        return Err(AppError::SignatureInvalid.into());
    }

    let transaction_status = payload
        .get("transaction_status")
        .and_then(Value::as_str)
        .unwrap_or("");
    let status = PaymentStatus::from_provider(transaction_status);

    let Some(_existing) = state.db.billing.get_transaction_by_order_id(order_id).await? else {
        tracing::error!(order_id = %order_id, "Webhook for unknown order id, acknowledging");
        return Ok(Json(json!({ "success": true })));
    };

    let update = GatewayPaymentUpdate {
        status,
        gateway_transaction_id: payload
            .get("transaction_id")
            .and_then(Value::as_str)
            .map(String::from),
        payment_type: payload
            .get("payment_type")
            .and_then(Value::as_str)
            .map(String::from),
        transaction_time: parse_gateway_time(
            payload.get("transaction_time").and_then(Value::as_str),
        ),
        settlement_time: parse_gateway_time(
            payload.get("settlement_time").and_then(Value::as_str),
        ),
        metadata: payload.clone(),
    };

    let transaction = state.db.billing.apply_gateway_update(order_id, update).await?;

    if status.is_success() {
        state
            .db
            .billing
            .activate_subscription(transaction.invoice_id)
            .await?;
    }

    tracing::info!(
        order_id = %order_id,
        status = ?status,
        "Processed gateway notification"
    );
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Option<Subscription>,
    pub active: bool,
}

pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, HttpAppError> {
    require_permission(
        Some(&user),
        Some(&tenant),
        &state.db.memberships,
        Permission::ViewBilling,
    )
    .await?;

    let subscription = state.db.billing.get_current_subscription(tenant.tenant_id).await?;
    let active = state.db.billing.is_subscription_active(tenant.tenant_id).await?;

    Ok(Json(SubscriptionResponse {
        subscription,
        active,
    }))
}

pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, HttpAppError> {
    require_permission(
        Some(&user),
        Some(&tenant),
        &state.db.memberships,
        Permission::ManageBilling,
    )
    .await?;

    let subscription = state.db.billing.cancel_subscription(tenant.tenant_id).await?;
    Ok(Json(subscription))
}

/// Look up one payment transaction by order id, for billing history views.
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    tenant: TenantContext,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    require_permission(
        Some(&user),
        Some(&tenant),
        &state.db.memberships,
        Permission::ViewBilling,
    )
    .await?;

    let transaction = state
        .db
        .billing
        .get_transaction_by_order_id(&order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment transaction not found".to_string()))?;
    Ok(Json(transaction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_timestamps_parse_or_drop() {
        let parsed = parse_gateway_time(Some("2026-08-26 10:15:00")).expect("parse");
        assert_eq!(parsed.to_rfc3339(), "2026-08-26T10:15:00+00:00");
        assert!(parse_gateway_time(Some("yesterday")).is_none());
        assert!(parse_gateway_time(None).is_none());
    }
}
