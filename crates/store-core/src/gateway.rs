//! # Payment Gateway Trait
//!
//! Seam between the storefront and the external payment provider.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   PaymentGateway (trait)                    │
//! │  ├── create_payment_intent()                                │
//! │  ├── create_refund()                                        │
//! │  ├── list_payment_methods()                                 │
//! │  ├── verify_webhook()                                       │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                  ┌─────────┴─────────┐
//!                  │   StripeGateway   │
//!                  │  (store-stripe)   │
//!                  └───────────────────┘
//! ```

use crate::error::ShopResult;
use crate::money::Price;
use crate::payment::RefundReason;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Core trait for payment provider implementations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for an order total.
    async fn create_payment_intent(&self, request: &IntentRequest) -> ShopResult<PaymentIntent>;

    /// Refund all or part of a captured intent.
    async fn create_refund(&self, request: &RefundRequest) -> ShopResult<GatewayRefund>;

    /// List saved cards for a gateway-side customer.
    async fn list_payment_methods(&self, gateway_customer_id: &str)
        -> ShopResult<Vec<PaymentMethod>>;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Arguments
    /// * `payload` - Raw webhook body bytes
    /// * `signature` - Signature header from the request
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<GatewayEvent>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// Parameters for a new payment intent
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub order_id: String,
    pub customer_id: String,
    pub amount: Price,
    /// Prevents duplicate intents when a request is retried
    pub idempotency_key: String,
}

/// A payment intent created by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Secret the client uses to confirm the payment
    pub client_secret: String,
    pub status: String,
}

/// Parameters for a refund
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub payment_intent_id: String,
    /// `None` refunds whatever remains on the intent
    pub amount: Option<Price>,
    pub reason: RefundReason,
}

/// A refund as reported by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub status: String,
    /// Smallest currency unit
    pub amount: i64,
}

/// A saved card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_year: Option<u32>,
}

/// Webhook event types the storefront reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayEventKind {
    /// Payment intent succeeded
    PaymentSucceeded,
    /// Payment intent failed
    PaymentFailed,
    /// Anything else (acknowledged, ignored)
    Other(String),
}

/// A verified, parsed webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Event ID from provider
    pub event_id: String,

    pub kind: GatewayEventKind,

    /// Related payment intent ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,

    /// Provider's failure message for failed payments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl GatewayEvent {
    pub fn new(event_id: impl Into<String>, kind: GatewayEventKind) -> Self {
        Self {
            event_id: event_id.into(),
            kind,
            payment_intent_id: None,
            failure_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_payment_intent(mut self, id: impl Into<String>) -> Self {
        self.payment_intent_id = Some(id.into());
        self
    }

    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = GatewayEvent::new("evt_1", GatewayEventKind::PaymentFailed)
            .with_payment_intent("pi_1")
            .with_failure_message("Your card was declined.");

        assert_eq!(event.payment_intent_id.as_deref(), Some("pi_1"));
        assert_eq!(event.failure_message.as_deref(), Some("Your card was declined."));
    }
}
