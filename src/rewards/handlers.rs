use axum::extract::{Extension, Json, Query};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::models::{
    RedeemRequest, RedeemResponse, RewardItem, RewardTransaction, RewardsSummary,
    TransactionsQuery,
};
use super::services::{RewardsService, SUMMARY_HISTORY_LIMIT};
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState, ValidationResult};

/// GET /api/rewards
/// Balance, tier, redeemable items and recent history for the caller
pub async fn get_rewards(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<RewardsSummary>, ApiError> {
    let state = state_lock.read().await.clone();
    let service = RewardsService::new(state.db);
    Ok(Json(service.get_summary(&authed.id).await?))
}

/// POST /api/rewards/redeem
///
/// # Request Body
/// ```json
/// { "reward_id": "RI_8MWQT2K1" }
/// ```
///
/// Responds with the redemption and the refreshed rewards summary.
pub async fn redeem_reward(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let mut validation = ValidationResult::new();
    validation.check_not_blank("reward_id", &payload.reward_id);
    validation.into_result()?;

    let state = state_lock.read().await.clone();
    let service = RewardsService::new(state.db);

    info!(user_id = %authed.id, reward_id = %payload.reward_id, "Redemption requested");
    let redemption = service.redeem(&authed.id, payload.reward_id.trim()).await?;
    let rewards = service.get_summary(&authed.id).await?;

    Ok(Json(RedeemResponse {
        redemption,
        rewards,
    }))
}

/// GET /api/rewards/items
pub async fn list_reward_items(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<Json<Vec<RewardItem>>, ApiError> {
    let state = state_lock.read().await.clone();
    let service = RewardsService::new(state.db);
    Ok(Json(service.list_reward_items().await?))
}

/// GET /api/rewards/transactions?limit=&offset=
pub async fn list_transactions(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<RewardTransaction>>, ApiError> {
    let state = state_lock.read().await.clone();
    let service = RewardsService::new(state.db);
    let transactions = service
        .list_transactions(
            &authed.id,
            query.limit.unwrap_or(SUMMARY_HISTORY_LIMIT),
            query.offset.unwrap_or(0),
        )
        .await?;
    Ok(Json(transactions))
}
