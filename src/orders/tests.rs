//! Tests for orders module

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::test_support::setup_test_db;

    async fn insert_order(pool: &sqlx::SqlitePool, id: &str, user_id: &str, created_at: &str) {
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, user_id, stripe_session_id, amount_total_cents, status, created_at)
            VALUES (?, ?, ?, 1000, 'paid', ?)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(format!("cs_{}", id))
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_orders_are_scoped_and_newest_first() {
        let pool = setup_test_db().await;
        insert_order(&pool, "O_OLD", "U_1", "2024-01-01T00:00:00.000000Z").await;
        insert_order(&pool, "O_NEW", "U_1", "2024-02-01T00:00:00.000000Z").await;
        insert_order(&pool, "O_OTHER", "U_2", "2024-03-01T00:00:00.000000Z").await;

        let orders = OrdersService::new(pool).list_orders("U_1").await.unwrap();
        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["O_NEW", "O_OLD"]);
    }

    #[tokio::test]
    async fn test_empty_history() {
        let pool = setup_test_db().await;
        let service = OrdersService::new(pool);

        assert!(service.list_orders("U_1").await.unwrap().is_empty());
        assert!(service.list_subscriptions("U_1").await.unwrap().is_empty());
        assert!(service.list_payments("U_1").await.unwrap().is_empty());
    }
}
