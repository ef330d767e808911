use sqlx::SqlitePool;

use super::models::{Order, Payment, Subscription};
use crate::common::ApiError;

pub struct OrdersService {
    db: SqlitePool,
}

impl OrdersService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn list_orders(&self, user_id: &str) -> Result<Vec<Order>, ApiError> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, stripe_session_id, stripe_payment_intent_id, stripe_customer_id,
                   amount_total_cents, currency, status, customer_email, created_at
            FROM orders
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(orders)
    }

    pub async fn list_subscriptions(&self, user_id: &str) -> Result<Vec<Subscription>, ApiError> {
        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, user_id, stripe_subscription_id, stripe_customer_id, status,
                   current_period_end, created_at, updated_at
            FROM subscriptions
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(subscriptions)
    }

    pub async fn list_payments(&self, user_id: &str) -> Result<Vec<Payment>, ApiError> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, user_id, stripe_invoice_id, stripe_subscription_id, amount_paid_cents,
                   currency, billing_reason, created_at
            FROM payments
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(payments)
    }
}
