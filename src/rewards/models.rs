use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::tiers::Tier;
use crate::common::helpers::serialize_int_as_bool;

/// Flat award amounts per payment event kind
pub const PURCHASE_POINTS: i64 = 50;
pub const SUBSCRIPTION_CREATED_POINTS: i64 = 500;
pub const SUBSCRIPTION_RENEWAL_POINTS: i64 = 100;

/// Why points were granted; each reason maps to a fixed amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardReason {
    Purchase,
    SubscriptionCreated,
    SubscriptionRenewal,
}

impl AwardReason {
    pub fn points(self) -> i64 {
        match self {
            AwardReason::Purchase => PURCHASE_POINTS,
            AwardReason::SubscriptionCreated => SUBSCRIPTION_CREATED_POINTS,
            AwardReason::SubscriptionRenewal => SUBSCRIPTION_RENEWAL_POINTS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AwardReason::Purchase => "purchase",
            AwardReason::SubscriptionCreated => "subscription_created",
            AwardReason::SubscriptionRenewal => "subscription_renewal",
        }
    }

    pub fn default_description(self) -> &'static str {
        match self {
            AwardReason::Purchase => "Points earned on purchase",
            AwardReason::SubscriptionCreated => "Welcome bonus for subscribing",
            AwardReason::SubscriptionRenewal => "Subscription renewal bonus",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RewardTransaction {
    pub id: String,
    pub user_id: String,
    pub points: i64, // signed: positive for earned, negative for redeemed
    pub kind: String, // 'earned' | 'redeemed'
    pub reason: String,
    pub source_event_id: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RewardItem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub points_cost: i64,
    #[serde(serialize_with = "serialize_int_as_bool")]
    pub is_active: i64,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RewardRedemption {
    pub id: String,
    pub user_id: String,
    pub reward_item_id: String,
    pub reward_name: String,
    pub points_spent: i64,
    pub status: String,
    pub created_at: String,
}

/// Everything the rewards page needs in one response
#[derive(Debug, Clone, Serialize)]
pub struct RewardsSummary {
    pub points: i64,
    pub lifetime_points: i64,
    pub tier: Tier,
    pub next_tier: Option<Tier>,
    pub points_to_next_tier: Option<i64>,
    pub redeemable_items: Vec<RewardItem>,
    pub recent_transactions: Vec<RewardTransaction>,
    pub recent_redemptions: Vec<RewardRedemption>,
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub redemption: RewardRedemption,
    pub rewards: RewardsSummary,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub reward_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
