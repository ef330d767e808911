//! Authentication handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::extractors::AuthedUser;
use super::models::User;
use crate::common::{ApiError, AppState};
use crate::rewards::{RewardsService, Tier};

/// GET /api/me
/// Returns the current authenticated user with a rewards snapshot
///
/// # Response
/// ```json
/// {
///   "user": { ... },
///   "rewards": { "points": 1200, "lifetime_points": 1700, "tier": "Silver" }
/// }
/// ```
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let (points, lifetime_points) = RewardsService::new(state.db.clone())
        .get_balance(&authed.id)
        .await?;
    let rewards = serde_json::json!({
        "points": points,
        "lifetime_points": lifetime_points,
        "tier": Tier::for_points(points),
    });

    // In dev mode, return the dev user directly without database lookup
    if state.dev_mode.is_enabled() {
        let dev_user = state.dev_mode.create_dev_user();
        return Ok(Json(serde_json::json!({
            "user": dev_user,
            "rewards": rewards,
        })));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    debug!(user_id = %user.id, points = points, "Served current user profile");

    Ok(Json(serde_json::json!({
        "user": user,
        "rewards": rewards,
    })))
}

/// POST /api/auth/logout
/// Tokens are issued externally, so logout is a client-side token drop.
/// This endpoint only confirms the request.
pub async fn logout_handler(authed: AuthedUser) -> Result<Json<serde_json::Value>, ApiError> {
    info!(user_id = %authed.id, "User logout successful");
    Ok(Json(serde_json::json!({
        "message": "Logout successful"
    })))
}
