use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Mirror of a completed Stripe Checkout Session
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: String,
    pub user_id: Option<String>,
    pub stripe_session_id: String,
    pub stripe_payment_intent_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub amount_total_cents: i64,
    pub currency: String,
    pub status: String, // 'paid' | 'pending' | 'failed'
    pub customer_email: Option<String>,
    pub created_at: String,
}

/// Mirror of a Stripe subscription; lifecycle is driven by webhook events
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: String,
    pub user_id: Option<String>,
    pub stripe_subscription_id: String,
    pub stripe_customer_id: Option<String>,
    pub status: String,
    pub current_period_end: Option<i64>, // unix seconds, as Stripe reports it
    pub created_at: String,
    pub updated_at: String,
}

/// Mirror of a paid Stripe invoice
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: String,
    pub user_id: Option<String>,
    pub stripe_invoice_id: String,
    pub stripe_subscription_id: Option<String>,
    pub amount_paid_cents: i64,
    pub currency: String,
    pub billing_reason: Option<String>,
    pub created_at: String,
}
