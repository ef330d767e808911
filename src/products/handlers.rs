use axum::extract::{Extension, Json, Path, Query};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::models::{Product, ProductFilter};
use super::services::ProductsService;
use crate::common::{ApiError, AppState};

/// GET /api/products?category=&subscription=
pub async fn list_products(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let state = state_lock.read().await.clone();
    let service = ProductsService::new(state.db);
    Ok(Json(service.list_products(&filter).await?))
}

/// GET /api/products/:slug
pub async fn get_product(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(slug): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let state = state_lock.read().await.clone();
    let service = ProductsService::new(state.db);
    Ok(Json(service.get_by_slug(&slug).await?))
}
