//! # Rewards Module
//!
//! Loyalty points ledger:
//! - accrual from payment events (flat amount per event kind)
//! - tier computation from the current balance
//! - redemption against the reward catalog
//! - summary and history queries

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod tiers;


pub use models::AwardReason;
pub use routes::rewards_routes;
pub use services::RewardsService;
pub use tiers::Tier;
