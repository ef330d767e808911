use super::handlers;
use axum::{routing::get, Router};

/// Public catalog routes
pub fn products_routes() -> Router {
    Router::new()
        .route("/api/products", get(handlers::list_products))
        .route("/api/products/:slug", get(handlers::get_product))
}
