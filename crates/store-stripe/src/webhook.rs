//! # Stripe Webhook Verification
//!
//! Stripe signs every delivery with a `Stripe-Signature` header of the form
//! `t=<unix seconds>,v1=<hex hmac>[,v1=...]`. The HMAC-SHA256 is computed
//! with the endpoint secret over `"<t>.<raw body>"`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use store_core::{GatewayEvent, GatewayEventKind, ShopError, ShopResult};
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed delivery, in seconds
pub const SIGNATURE_TOLERANCE_SECS: u64 = 300;

/// Events the storefront acts on; enable these on the Stripe endpoint
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] =
    &["payment_intent.succeeded", "payment_intent.payment_failed"];

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> ShopResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        ShopError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(ShopError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> ShopResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ShopError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Build a valid `Stripe-Signature` header for a payload.
///
/// Used by tests and local tooling that replay events.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> ShopResult<String> {
    Ok(format!(
        "t={},v1={}",
        timestamp,
        compute_signature(secret, timestamp, payload)?
    ))
}

/// Check a signature header against the payload at time `now`.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: DateTime<Utc>,
) -> ShopResult<()> {
    let parsed = parse_signature_header(header)?;

    // `t` is unauthenticated and may be any i64
    if now.timestamp().abs_diff(parsed.timestamp) > SIGNATURE_TOLERANCE_SECS {
        return Err(ShopError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let expected = compute_signature(secret, parsed.timestamp, payload)?;
    let valid = parsed
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected));

    if !valid {
        return Err(ShopError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

/// Parse a (verified) Stripe event body.
pub fn parse_event(payload: &[u8]) -> ShopResult<GatewayEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| ShopError::WebhookParseError(format!("Failed to parse webhook: {}", e)))?;

    debug!("Parsed Stripe webhook: type={}", event.event_type);

    let kind = match event.event_type.as_str() {
        "payment_intent.succeeded" => GatewayEventKind::PaymentSucceeded,
        "payment_intent.payment_failed" => GatewayEventKind::PaymentFailed,
        other => GatewayEventKind::Other(other.to_string()),
    };

    let object = &event.data.object;
    let payment_intent_id = match kind {
        // the object of a payment_intent.* event is the intent itself
        GatewayEventKind::PaymentSucceeded | GatewayEventKind::PaymentFailed => object.get("id"),
        GatewayEventKind::Other(_) => object.get("payment_intent"),
    }
    .and_then(|v| v.as_str())
    .map(String::from);

    let failure_message = object
        .get("last_payment_error")
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .map(String::from);

    Ok(GatewayEvent {
        event_id: event.id,
        kind,
        payment_intent_id,
        failure_message,
        created_at: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
    })
}

/// Verify the signature and parse the event in one step.
pub fn construct_event(payload: &[u8], header: &str, secret: &str) -> ShopResult<GatewayEvent> {
    verify_signature(secret, payload, header, Utc::now())?;
    parse_event(payload)
}
