//! Payment intents, the gateway webhook, refunds and history.

use crate::auth::AuthUser;
use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use store_core::billing::{self, Reconciliation, Transaction};
use store_core::{GatewayRefund, Payment, PaymentMethod, RefundReason, ShopError};
use tracing::{error, info, instrument};

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    #[serde(alias = "orderId")]
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateIntentResponse {
    pub client_secret: String,
    pub payment_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundBody {
    /// Decimal amount; omitted means the full remaining balance
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub reason: Option<RefundReason>,
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub refund: GatewayRefund,
    pub payment: Payment,
}

#[instrument(skip(state, user, request), fields(customer_id = %user.id))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<CreateIntentRequest>,
) -> ApiResult<Json<CreateIntentResponse>> {
    let started = billing::start_payment(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &user,
        &request.order_id,
    )
    .await?;

    Ok(Json(CreateIntentResponse {
        client_secret: started.intent.client_secret,
        payment_id: started.payment.id,
    }))
}

/// Gateway webhook; authenticated by signature only
#[instrument(skip(state, headers, body))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ShopError::WebhookVerificationFailed("Missing Stripe-Signature header".to_string())
        })?;

    let event = state
        .gateway
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| {
            error!("Webhook verification failed: {}", e);
            e
        })?;

    info!(
        "Received webhook: kind={:?}, id={}",
        event.kind, event.event_id
    );

    match billing::reconcile_event(state.store.as_ref(), &event).await? {
        Reconciliation::Applied { payment, .. } => {
            info!(payment_id = %payment.id, status = ?payment.status, "Webhook applied");
        }
        Reconciliation::UnknownIntent(intent) => {
            info!("No local payment for intent {}", intent);
        }
        Reconciliation::Ignored => {}
    }

    Ok(Json(serde_json::json!({ "received": true })))
}

pub async fn payment_methods(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<PaymentMethod>>> {
    Ok(Json(
        billing::payment_methods(state.gateway.as_ref(), &user).await?,
    ))
}

#[instrument(skip(state, user, body), fields(caller_id = %user.id))]
pub async fn refund(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(payment_id): Path<String>,
    ApiJson(body): ApiJson<RefundBody>,
) -> ApiResult<Json<RefundResponse>> {
    let issued = billing::refund_payment(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &user,
        &payment_id,
        body.amount,
        body.reason,
    )
    .await?;

    Ok(Json(RefundResponse {
        refund: issued.refund,
        payment: issued.payment,
    }))
}

pub async fn transactions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<Transaction>>> {
    Ok(Json(
        billing::transaction_history(state.store.as_ref(), &user).await?,
    ))
}
