use super::handlers;
use axum::{routing::get, Router};

/// Purchase history for the signed-in customer
pub fn orders_routes() -> Router {
    Router::new()
        .route("/api/orders", get(handlers::list_orders))
        .route("/api/subscriptions", get(handlers::list_subscriptions))
        .route("/api/payments", get(handlers::list_payments))
}
