use super::handlers;
use axum::{
    routing::{get, post},
    Router,
};

/// Creates the rewards router
pub fn rewards_routes() -> Router {
    Router::new()
        .route("/api/rewards", get(handlers::get_rewards))
        .route("/api/rewards/redeem", post(handlers::redeem_reward))
        .route("/api/rewards/items", get(handlers::list_reward_items))
        .route("/api/rewards/transactions", get(handlers::list_transactions))
}
