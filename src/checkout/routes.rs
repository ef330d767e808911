use super::handlers;
use axum::{routing::post, Router};

pub fn checkout_routes() -> Router {
    Router::new().route("/api/checkout", post(handlers::create_checkout_session))
}
