//! Payment gateway client and webhook signature verification.
//!
//! The gateway is injected as a trait object built at startup so checkout
//! and webhook handlers never touch process-wide state, and tests can
//! substitute a fake.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use shopyard_core::{AppError, Config};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::constants::MAX_ORDER_ID_LEN;

const SANDBOX_BASE_URL: &str = "https://app.sandbox.midtrans.com";
const PRODUCTION_BASE_URL: &str = "https://app.midtrans.com";

/// Result of opening a payment session with the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    pub token: String,
    pub redirect_url: String,
}

/// Customer details forwarded to the gateway's checkout page.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutCustomer {
    pub first_name: String,
    pub email: String,
}

/// A single line item on the gateway checkout page.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutItem {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted payment session for the given order.
    async fn create_payment_session(
        &self,
        order_id: &str,
        amount: Decimal,
        customer: &CheckoutCustomer,
        items: &[CheckoutItem],
    ) -> Result<PaymentSession, AppError>;
}

/// Snap-style hosted checkout client. Authenticates with HTTP basic auth
/// using the server key as username and an empty password.
pub struct SnapGateway {
    client: reqwest::Client,
    server_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct SnapTransactionRequest<'a> {
    transaction_details: SnapTransactionDetails<'a>,
    customer_details: &'a CheckoutCustomer,
    item_details: &'a [CheckoutItem],
}

#[derive(Serialize)]
struct SnapTransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: Decimal,
}

impl SnapGateway {
    pub fn from_config(config: &Config) -> Self {
        let base_url = if config.gateway_is_production() {
            PRODUCTION_BASE_URL
        } else {
            SANDBOX_BASE_URL
        };
        Self {
            client: reqwest::Client::new(),
            server_key: config.gateway_server_key().to_string(),
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for SnapGateway {
    #[tracing::instrument(skip(self, customer, items))]
    async fn create_payment_session(
        &self,
        order_id: &str,
        amount: Decimal,
        customer: &CheckoutCustomer,
        items: &[CheckoutItem],
    ) -> Result<PaymentSession, AppError> {
        let request = SnapTransactionRequest {
            transaction_details: SnapTransactionDetails {
                order_id,
                gross_amount: amount,
            },
            customer_details: customer,
            item_details: items,
        };

        let response = self
            .client
            .post(format!("{}/snap/v1/transactions", self.base_url))
            .basic_auth(&self.server_key, Some(""))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Payment session request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Payment session rejected ({}): {}",
                status, body
            )));
        }

        let session = response
            .json::<PaymentSession>()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid gateway response: {}", e)))?;

        tracing::info!(order_id = %order_id, "Payment session created");
        Ok(session)
    }
}

/// Generate an order id for one payment attempt. The gateway limits order
/// ids to 50 characters; `SHOP-` plus a simple uuid is 37.
pub fn generate_order_id() -> String {
    let order_id = format!("SHOP-{}", Uuid::new_v4().simple());
    debug_assert!(order_id.len() <= MAX_ORDER_ID_LEN);
    order_id
}

/// Verify a webhook signature: `hex(sha512(order_id || status_code ||
/// gross_amount || server_key))` compared in constant time. This is the
/// sole authentication on the webhook endpoint.
pub fn verify_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
    signature: &str,
) -> bool {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    let expected = hex::encode(hasher.finalize());

    if expected.len() != signature.len() {
        return false;
    }
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(order_id: &str, status_code: &str, gross_amount: &str, key: &str) -> String {
        let mut hasher = Sha512::new();
        hasher.update(order_id.as_bytes());
        hasher.update(status_code.as_bytes());
        hasher.update(gross_amount.as_bytes());
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    #[test]
    fn accepts_matching_signature() {
        let sig = sign("SHOP-abc", "200", "49000.00", "server-key");
        assert!(verify_signature(
            "SHOP-abc",
            "200",
            "49000.00",
            "server-key",
            &sig
        ));
    }

    #[test]
    fn rejects_tampered_amount() {
        let sig = sign("SHOP-abc", "200", "49000.00", "server-key");
        assert!(!verify_signature(
            "SHOP-abc",
            "200",
            "1.00",
            "server-key",
            &sig
        ));
    }

    #[test]
    fn rejects_wrong_key_and_malformed_signature() {
        let sig = sign("SHOP-abc", "200", "49000.00", "server-key");
        assert!(!verify_signature(
            "SHOP-abc",
            "200",
            "49000.00",
            "other-key",
            &sig
        ));
        assert!(!verify_signature(
            "SHOP-abc",
            "200",
            "49000.00",
            "server-key",
            "not-hex"
        ));
    }

    #[test]
    fn order_ids_fit_the_gateway_limit() {
        let id = generate_order_id();
        assert!(id.len() <= MAX_ORDER_ID_LEN);
        assert!(id.starts_with("SHOP-"));
        assert_ne!(generate_order_id(), generate_order_id());
    }
}
