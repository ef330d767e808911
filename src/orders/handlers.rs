use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::models::{Order, Payment, Subscription};
use super::services::OrdersService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};

/// GET /api/orders
pub async fn list_orders(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    let state = state_lock.read().await.clone();
    Ok(Json(OrdersService::new(state.db).list_orders(&authed.id).await?))
}

/// GET /api/subscriptions
pub async fn list_subscriptions(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    let state = state_lock.read().await.clone();
    Ok(Json(
        OrdersService::new(state.db)
            .list_subscriptions(&authed.id)
            .await?,
    ))
}

/// GET /api/payments
pub async fn list_payments(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let state = state_lock.read().await.clone();
    Ok(Json(OrdersService::new(state.db).list_payments(&authed.id).await?))
}
