use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::models::{CheckoutRequest, CheckoutResponse};
use super::services::create_checkout;
use super::validators::CheckoutValidator;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState, Validator};

/// POST /api/checkout
///
/// # Request Body
/// ```json
/// {
///   "items": [{ "product_id": "G_4KD9M2QX", "quantity": 2 }],
///   "success_url": "https://shop.example.com/thanks"
/// }
/// ```
///
/// # Response
/// ```json
/// { "id": "cs_test_...", "url": "https://checkout.stripe.com/..." }
/// ```
pub async fn create_checkout_session(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    CheckoutValidator.validate(&payload).into_result()?;

    let state = state_lock.read().await.clone();
    Ok(Json(create_checkout(&state, &authed, &payload).await?))
}
