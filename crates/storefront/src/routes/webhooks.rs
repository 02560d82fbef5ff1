//! Order webhook endpoint.
//!
//! `POST /webhooks/{source}/orders` with the event name in `X-Shopify-Topic`.
//! When a webhook secret is configured, the raw body must carry a valid
//! base64 HMAC-SHA256 in `X-Shopify-Hmac-Sha256`.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;
use tracing::instrument;

use souq_core::OrderSource;

use crate::error::{AppError, Result};
use crate::services::reconcile::{self, OrderPayload, PgLedger, ReconcileOutcome};
use crate::state::AppState;

const TOPIC_HEADER: &str = "x-shopify-topic";
const SIGNATURE_HEADER: &str = "x-shopify-hmac-sha256";

type HmacSha256 = Hmac<Sha256>;

/// POST /webhooks/{source}/orders
///
/// Always acknowledges unknown topics. Storage failures return `500` so the
/// sender retries; every step is safe to repeat.
#[instrument(skip(state, headers, body))]
pub async fn orders(
    State(state): State<AppState>,
    Path(source): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ReconcileOutcome>> {
    let source: OrderSource = source.parse().map_err(AppError::NotFound)?;

    if let Some(secret) = &state.config().webhook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(secret.expose_secret().as_bytes(), &body, signature) {
            tracing::warn!("Rejected webhook with bad signature");
            return Err(AppError::Unauthorized("Invalid webhook signature".to_string()));
        }
    }

    let topic = headers
        .get(TOPIC_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("missing webhook topic".to_string()))?;

    let payload: OrderPayload = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid order payload: {e}")))?;

    let ledger = PgLedger::new(state.pool());
    let outcome = reconcile::reconcile(&ledger, &state.notifier(), source, topic, &payload).await?;

    Ok(Json(outcome))
}

/// Check a base64 HMAC-SHA256 of the raw body in constant time.
fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Ok(expected) = BASE64.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sign(secret: &[u8], body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_signature_accepts_valid() {
        let body = br#"{"id":1}"#;
        let signature = sign(b"secret", body);
        assert!(verify_signature(b"secret", body, &signature));
    }

    #[test]
    fn test_verify_signature_rejects_tampered_body() {
        let signature = sign(b"secret", br#"{"id":1}"#);
        assert!(!verify_signature(b"secret", br#"{"id":2}"#, &signature));
    }

    #[test]
    fn test_verify_signature_rejects_wrong_secret_and_garbage() {
        let body = br#"{"id":1}"#;
        assert!(!verify_signature(b"other", body, &sign(b"secret", body)));
        assert!(!verify_signature(b"secret", body, "not base64!"));
        assert!(!verify_signature(b"secret", body, ""));
    }
}
