use axum::{
    extract::{Extension, Json},
    http::HeaderMap,
};
use bytes::Bytes;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, warn};

use super::models::StripeEvent;
use super::services::{WebhookOutcome, WebhookService};
use crate::common::{ApiError, AppState};

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/webhooks/stripe
///
/// Verifies the `Stripe-Signature` header against the raw body before the
/// payload is parsed. Always answers 2xx for verified events, including ones
/// that are ignored or already processed, so Stripe stops redelivering them.
pub async fn stripe_webhook(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("Webhook rejected: missing Stripe-Signature header");
            ApiError::BadRequest("missing signature".to_string())
        })?;

    state.stripe.verify_webhook(&body, signature).map_err(|e| {
        warn!(error = %e, "Webhook signature verification failed");
        ApiError::from(e)
    })?;

    let event: StripeEvent = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "Verified webhook body is not a Stripe event");
        ApiError::BadRequest("malformed event".to_string())
    })?;

    let outcome = WebhookService::new(state.db).process(&event).await?;

    Ok(Json(match outcome {
        WebhookOutcome::Duplicate => json!({ "received": true, "duplicate": true }),
        _ => json!({ "received": true }),
    }))
}
