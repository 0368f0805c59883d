//! # Stripe Webhook Verification
//!
//! Signature verification and event parsing for Stripe webhooks. The
//! reconciler only ever finalizes orders from events that pass this
//! verification — the browser redirect alone is never trusted as proof
//! of payment.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use store_core::{PaymentEvent, PaymentEventKind, StoreError, StoreResult};
use uuid::Uuid;

/// Signature timestamp tolerance, in seconds
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

pub(crate) struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

/// Parse Stripe's `Stripe-Signature` header: `t=<ts>,v1=<sig>[,v1=<sig>...]`
pub(crate) fn parse_signature_header(header: &str) -> StoreResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let kv: Vec<&str> = part.split('=').collect();
        if kv.len() != 2 {
            continue;
        }
        match kv[0] {
            "t" => {
                timestamp = kv[1].parse().ok();
            }
            "v1" => {
                signatures.push(kv[1].to_string());
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        StoreError::WebhookVerification("missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(StoreError::WebhookVerification(
            "no v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

pub(crate) fn compute_hmac_sha256(secret: &str, message: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Verify the signature header against the payload, then parse the event.
pub(crate) fn verify_and_parse(
    webhook_secret: &str,
    payload: &[u8],
    signature: &str,
) -> StoreResult<PaymentEvent> {
    let sig_parts = parse_signature_header(signature)?;

    let now = Utc::now().timestamp();
    if (now - sig_parts.timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(StoreError::WebhookVerification(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let signed_payload = format!(
        "{}.{}",
        sig_parts.timestamp,
        String::from_utf8_lossy(payload)
    );
    let expected = compute_hmac_sha256(webhook_secret, &signed_payload);

    let valid = sig_parts
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected));

    if !valid {
        return Err(StoreError::WebhookVerification(
            "signature mismatch".to_string(),
        ));
    }

    parse_event(payload)
}

/// Parse a verified webhook payload into a `PaymentEvent`
pub(crate) fn parse_event(payload: &[u8]) -> StoreResult<PaymentEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| StoreError::WebhookParse(format!("failed to parse webhook: {}", e)))?;

    let kind = match event.event_type.as_str() {
        "checkout.session.completed" => PaymentEventKind::SessionCompleted,
        "checkout.session.expired" => PaymentEventKind::SessionExpired,
        "payment_intent.payment_failed" => PaymentEventKind::PaymentFailed,
        other => PaymentEventKind::Unknown(other.to_string()),
    };

    let object = &event.data.object;

    let session_id = object.get("id").and_then(|v| v.as_str()).map(String::from);

    // the order id the orchestrator stashed in session metadata
    let order_id = object
        .get("metadata")
        .and_then(|m| m.get("order_id"))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok());

    let amount_total = object.get("amount_total").and_then(|v| v.as_i64());

    let payment_status = object
        .get("payment_status")
        .and_then(|v| v.as_str())
        .map(String::from);

    Ok(PaymentEvent {
        event_id: event.id,
        kind,
        session_id,
        order_id,
        amount_total,
        payment_status,
        timestamp: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
    })
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
