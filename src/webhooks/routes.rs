use super::handlers;
use axum::{routing::post, Router};

pub const WEBHOOK_PATH_PREFIX: &str = "/api/webhooks/";

/// Payment processor callbacks; authenticated by signature, not by JWT
pub fn webhooks_routes() -> Router {
    Router::new().route("/api/webhooks/stripe", post(handlers::stripe_webhook))
}
