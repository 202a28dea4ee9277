//! # Stripe Payment Intents
//!
//! `PaymentGateway` implementation backed by the Stripe REST API.
//! Requests are form-encoded, responses JSON.

use crate::config::StripeConfig;
use crate::webhook;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use store_core::{
    GatewayEvent, GatewayRefund, IntentRequest, PaymentGateway, PaymentIntent, PaymentMethod,
    RefundReason, RefundRequest, ShopError, ShopResult,
};
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe payment gateway
///
/// Creates payment intents the client confirms with Stripe.js, issues
/// refunds and lists saved cards.
pub struct StripeGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeGateway {
    /// Create a new Stripe gateway
    pub fn new(config: StripeConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ShopError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
    }

    /// Send a request and decode the body, mapping Stripe errors.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ShopResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            let message = match serde_json::from_str::<StripeErrorResponse>(&body) {
                Ok(parsed) => parsed.error.message,
                Err(_) => format!("HTTP {}: {}", status, body),
            };
            return Err(ShopError::ProviderError {
                provider: PROVIDER.to_string(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

/// Stripe only accepts a subset of reasons on refund creation
fn stripe_refund_reason(reason: RefundReason) -> Option<&'static str> {
    match reason {
        RefundReason::Duplicate | RefundReason::Fraudulent | RefundReason::RequestedByCustomer => {
            Some(reason.as_str())
        }
        RefundReason::Abandoned => None,
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_payment_intent(&self, request: &IntentRequest) -> ShopResult<PaymentIntent> {
        if request.amount.amount <= 0 {
            return Err(ShopError::InvalidRequest(
                "Payment amount must be greater than zero".to_string(),
            ));
        }

        let form_params: Vec<(String, String)> = vec![
            ("amount".to_string(), request.amount.amount.to_string()),
            (
                "currency".to_string(),
                request.amount.currency.as_str().to_string(),
            ),
            ("metadata[order_id]".to_string(), request.order_id.clone()),
            ("metadata[customer_id]".to_string(), request.customer_id.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];

        debug!("Creating Stripe payment intent for {}", request.amount.display());

        let intent: StripePaymentIntent = self
            .send(
                self.authorized(self.client.post(self.url("/v1/payment_intents")))
                    .header("Idempotency-Key", &request.idempotency_key)
                    .form(&form_params),
            )
            .await?;

        info!("Created Stripe payment intent: id={}", intent.id);

        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret.unwrap_or_default(),
            status: intent.status,
        })
    }

    #[instrument(skip(self, request), fields(payment_intent_id = %request.payment_intent_id))]
    async fn create_refund(&self, request: &RefundRequest) -> ShopResult<GatewayRefund> {
        let mut form_params: Vec<(String, String)> = vec![(
            "payment_intent".to_string(),
            request.payment_intent_id.clone(),
        )];
        if let Some(amount) = request.amount {
            form_params.push(("amount".to_string(), amount.amount.to_string()));
        }
        if let Some(reason) = stripe_refund_reason(request.reason) {
            form_params.push(("reason".to_string(), reason.to_string()));
        }

        let refund: StripeRefund = self
            .send(
                self.authorized(self.client.post(self.url("/v1/refunds")))
                    .form(&form_params),
            )
            .await?;

        info!("Created Stripe refund: id={}, status={}", refund.id, refund.status);

        Ok(GatewayRefund {
            id: refund.id,
            status: refund.status,
            amount: refund.amount,
        })
    }

    async fn list_payment_methods(
        &self,
        gateway_customer_id: &str,
    ) -> ShopResult<Vec<PaymentMethod>> {
        let list: StripeList<StripePaymentMethod> = self
            .send(
                self.authorized(self.client.get(self.url("/v1/payment_methods")))
                    .query(&[("customer", gateway_customer_id), ("type", "card")]),
            )
            .await?;

        Ok(list
            .data
            .into_iter()
            .map(|method| {
                let card = method.card.unwrap_or_default();
                PaymentMethod {
                    id: method.id,
                    brand: card.brand,
                    last4: card.last4,
                    exp_month: card.exp_month,
                    exp_year: card.exp_year,
                }
            })
            .collect())
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<GatewayEvent> {
        webhook::construct_event(payload, signature, &self.config.webhook_secret)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeRefund {
    id: String,
    status: String,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripePaymentMethod {
    id: String,
    #[serde(default)]
    card: Option<StripeCard>,
}

#[derive(Debug, Default, Deserialize)]
struct StripeCard {
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    last4: Option<String>,
    #[serde(default)]
    exp_month: Option<u32>,
    #[serde(default)]
    exp_year: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use store_core::{Currency, Price};
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gateway(server: &MockServer) -> StripeGateway {
        let config =
            StripeConfig::new("sk_test_abc123", "whsec_secret").with_api_base_url(server.uri());
        StripeGateway::new(config).unwrap()
    }

    fn intent_request() -> IntentRequest {
        IntentRequest {
            order_id: "order_1".into(),
            customer_id: "user_1".into(),
            amount: Price::from_cents(2599, Currency::USD),
            idempotency_key: "idem_1".into(),
        }
    }

    #[tokio::test]
    async fn test_create_payment_intent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("Authorization", "Bearer sk_test_abc123"))
            .and(header("Idempotency-Key", "idem_1"))
            .and(body_string_contains("amount=2599"))
            .and(body_string_contains("currency=usd"))
            .and(body_string_contains("metadata%5Border_id%5D=order_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_123",
                "client_secret": "pi_123_secret_abc",
                "status": "requires_payment_method"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let intent = gateway(&server)
            .await
            .create_payment_intent(&intent_request())
            .await
            .unwrap();

        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.client_secret, "pi_123_secret_abc");
    }

    #[tokio::test]
    async fn test_stripe_error_maps_to_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": { "message": "Your card was declined.", "type": "card_error" }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .await
            .create_payment_intent(&intent_request())
            .await
            .unwrap_err();

        match err {
            ShopError::ProviderError { provider, message } => {
                assert_eq!(provider, "stripe");
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_amount_not_sent() {
        let server = MockServer::start().await;
        let mut request = intent_request();
        request.amount = Price::zero(Currency::USD);

        let err = gateway(&server)
            .await
            .create_payment_intent(&request)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_partial_refund() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/refunds"))
            .and(body_string_contains("payment_intent=pi_123"))
            .and(body_string_contains("amount=500"))
            .and(body_string_contains("reason=duplicate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "re_1",
                "status": "succeeded",
                "amount": 500
            })))
            .expect(1)
            .mount(&server)
            .await;

        let refund = gateway(&server)
            .await
            .create_refund(&RefundRequest {
                payment_intent_id: "pi_123".into(),
                amount: Some(Price::from_cents(500, Currency::USD)),
                reason: RefundReason::Duplicate,
            })
            .await
            .unwrap();

        assert_eq!(refund.id, "re_1");
        assert_eq!(refund.amount, 500);
    }

    #[tokio::test]
    async fn test_list_payment_methods() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_methods"))
            .and(query_param("customer", "cus_1"))
            .and(query_param("type", "card"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [
                    { "id": "pm_1", "card": { "brand": "visa", "last4": "4242", "exp_month": 12, "exp_year": 2030 } },
                    { "id": "pm_2" }
                ]
            })))
            .mount(&server)
            .await;

        let methods = gateway(&server)
            .await
            .list_payment_methods("cus_1")
            .await
            .unwrap();

        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].last4.as_deref(), Some("4242"));
        assert_eq!(methods[0].exp_year, Some(2030));
        assert!(methods[1].brand.is_none());
    }

    #[tokio::test]
    async fn test_verify_webhook_uses_endpoint_secret() {
        let server = MockServer::start().await;
        let gateway = gateway(&server).await;
        let payload = br#"{"id":"evt_1","type":"payment_intent.succeeded","created":1700000000,"data":{"object":{"id":"pi_1"}}}"#;

        let now = chrono::Utc::now().timestamp();
        let good = webhook::signature_header("whsec_secret", now, payload).unwrap();
        let bad = webhook::signature_header("whsec_wrong", now, payload).unwrap();

        let event = gateway.verify_webhook(payload, &good).await.unwrap();
        assert_eq!(event.payment_intent_id.as_deref(), Some("pi_1"));
        assert!(gateway.verify_webhook(payload, &bad).await.is_err());
    }

    #[test]
    fn test_refund_reason_mapping() {
        assert_eq!(stripe_refund_reason(RefundReason::Fraudulent), Some("fraudulent"));
        assert_eq!(stripe_refund_reason(RefundReason::Abandoned), None);
    }
}
