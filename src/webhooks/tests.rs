//! Tests for webhooks module

#[cfg(test)]
mod tests {
    use super::super::handlers::{stripe_webhook, STRIPE_SIGNATURE_HEADER};
    use super::super::models::StripeEvent;
    use super::super::services::WebhookError;
    use super::super::*;
    use crate::common::test_support::{insert_user, setup_file_db, setup_test_db, test_state};
    use crate::common::ApiError;
    use crate::orders::OrdersService;
    use crate::rewards::RewardsService;
    use crate::services::stripe::sign_payload;
    use axum::{extract::Extension, http::HeaderMap};
    use bytes::Bytes;
    use serde_json::{json, Value};
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn event(id: &str, event_type: &str, object: Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": id,
            "type": event_type,
            "livemode": false,
            "data": { "object": object }
        }))
        .unwrap()
    }

    fn subscription_created(event_id: &str, user_id: &str) -> StripeEvent {
        event(
            event_id,
            "customer.subscription.created",
            json!({
                "id": "sub_test000001",
                "customer": "cus_test000001",
                "status": "active",
                "current_period_end": 1_800_000_000i64,
                "metadata": { "user_id": user_id }
            }),
        )
    }

    async fn points(pool: &SqlitePool, user_id: &str) -> i64 {
        RewardsService::new(pool.clone())
            .get_balance(user_id)
            .await
            .unwrap()
            .0
    }

    async fn count(pool: &SqlitePool, sql: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(sql).fetch_one(pool).await.unwrap();
        n
    }

    #[tokio::test]
    async fn test_subscription_created_awards_500() {
        let pool = setup_test_db().await;
        insert_user(&pool, "U_1", "member@example.com").await;
        let service = WebhookService::new(pool.clone());

        let outcome = service
            .process(&subscription_created("evt_sub_1", "U_1"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Processed {
                user_id: Some("U_1".to_string()),
                points_awarded: 500
            }
        );
        assert_eq!(points(&pool, "U_1").await, 500);

        let subs = OrdersService::new(pool.clone())
            .list_subscriptions("U_1")
            .await
            .unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].status, "active");
    }

    #[tokio::test]
    async fn test_redelivered_event_is_not_awarded_twice() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());
        let evt = subscription_created("evt_sub_1", "U_1");

        service.process(&evt).await.unwrap();
        let second = service.process(&evt).await.unwrap();

        assert_eq!(second, WebhookOutcome::Duplicate);
        assert_eq!(points(&pool, "U_1").await, 500);
        assert_eq!(
            count(&pool, "SELECT COUNT(*) FROM reward_transactions").await,
            1
        );
    }

    #[tokio::test]
    async fn test_concurrent_redelivery_awards_once() {
        let (pool, _dir) = setup_file_db().await;
        let service = WebhookService::new(pool.clone());
        let evt = subscription_created("evt_sub_1", "U_1");

        let (a, b, c) = tokio::join!(
            service.process(&evt),
            service.process(&evt),
            service.process(&evt)
        );
        let outcomes = [a.unwrap(), b.unwrap(), c.unwrap()];

        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == WebhookOutcome::Duplicate)
                .count(),
            2
        );
        assert_eq!(points(&pool, "U_1").await, 500);
        assert_eq!(
            count(&pool, "SELECT COUNT(*) FROM reward_transactions").await,
            1
        );
    }

    #[tokio::test]
    async fn test_one_time_checkout_awards_purchase_points() {
        let pool = setup_test_db().await;
        insert_user(&pool, "U_1", "buyer@example.com").await;
        let service = WebhookService::new(pool.clone());

        service
            .process(&event(
                "evt_cs_1",
                "checkout.session.completed",
                json!({
                    "id": "cs_test_000001",
                    "mode": "payment",
                    "client_reference_id": "U_1",
                    "customer": "cus_test000001",
                    "amount_total": 4900,
                    "currency": "usd",
                    "payment_status": "paid"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(points(&pool, "U_1").await, 50);
        let orders = OrdersService::new(pool.clone())
            .list_orders("U_1")
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].amount_total_cents, 4900);
        assert_eq!(orders[0].status, "paid");
    }

    #[tokio::test]
    async fn test_checkout_resolves_user_by_email() {
        let pool = setup_test_db().await;
        insert_user(&pool, "U_1", "Buyer@Example.com").await;
        let service = WebhookService::new(pool.clone());

        service
            .process(&event(
                "evt_cs_1",
                "checkout.session.completed",
                json!({
                    "id": "cs_test_000001",
                    "mode": "payment",
                    "customer_details": { "email": "buyer@example.com" },
                    "amount_total": 2400
                }),
            ))
            .await
            .unwrap();

        assert_eq!(points(&pool, "U_1").await, 50);
    }

    #[tokio::test]
    async fn test_subscription_checkout_does_not_award_purchase() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());

        let outcome = service
            .process(&event(
                "evt_cs_1",
                "checkout.session.completed",
                json!({
                    "id": "cs_test_000001",
                    "mode": "subscription",
                    "client_reference_id": "U_1",
                    "amount_total": 5900,
                    "payment_status": "paid"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Processed {
                user_id: Some("U_1".to_string()),
                points_awarded: 0
            }
        );
        assert_eq!(points(&pool, "U_1").await, 0);
    }

    #[tokio::test]
    async fn test_unpaid_checkout_records_pending_order() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());

        service
            .process(&event(
                "evt_cs_1",
                "checkout.session.completed",
                json!({
                    "id": "cs_test_000001",
                    "mode": "payment",
                    "client_reference_id": "U_1",
                    "payment_status": "unpaid"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(points(&pool, "U_1").await, 0);
        let orders = OrdersService::new(pool).list_orders("U_1").await.unwrap();
        assert_eq!(orders[0].status, "pending");
    }

    fn delayed_session(payment_status: &str) -> Value {
        json!({
            "id": "cs_test_000002",
            "mode": "payment",
            "client_reference_id": "U_1",
            "amount_total": 2500,
            "currency": "usd",
            "payment_intent": "pi_test000002",
            "payment_status": payment_status
        })
    }

    #[tokio::test]
    async fn test_async_payment_success_settles_pending_order() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());

        service
            .process(&event(
                "evt_cs_2",
                "checkout.session.completed",
                delayed_session("unpaid"),
            ))
            .await
            .unwrap();
        assert_eq!(points(&pool, "U_1").await, 0);

        let settled = service
            .process(&event(
                "evt_cs_2_settled",
                "checkout.session.async_payment_succeeded",
                delayed_session("paid"),
            ))
            .await
            .unwrap();

        assert_eq!(
            settled,
            WebhookOutcome::Processed {
                user_id: Some("U_1".to_string()),
                points_awarded: 50
            }
        );
        assert_eq!(points(&pool, "U_1").await, 50);
        let orders = OrdersService::new(pool.clone())
            .list_orders("U_1")
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, "paid");
    }

    #[tokio::test]
    async fn test_async_payment_success_after_paid_does_not_award_again() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());

        service
            .process(&event(
                "evt_cs_2",
                "checkout.session.completed",
                delayed_session("paid"),
            ))
            .await
            .unwrap();
        service
            .process(&event(
                "evt_cs_2_settled",
                "checkout.session.async_payment_succeeded",
                delayed_session("paid"),
            ))
            .await
            .unwrap();

        assert_eq!(points(&pool, "U_1").await, 50);
        assert_eq!(
            count(&pool, "SELECT COUNT(*) FROM reward_transactions").await,
            1
        );
    }

    #[tokio::test]
    async fn test_async_payment_failure_marks_order_failed() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());

        service
            .process(&event(
                "evt_cs_2",
                "checkout.session.completed",
                delayed_session("unpaid"),
            ))
            .await
            .unwrap();
        service
            .process(&event(
                "evt_cs_2_failed",
                "checkout.session.async_payment_failed",
                delayed_session("unpaid"),
            ))
            .await
            .unwrap();

        assert_eq!(points(&pool, "U_1").await, 0);
        let orders = OrdersService::new(pool.clone())
            .list_orders("U_1")
            .await
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, "failed");

        // A late failure never downgrades a settled order
        service
            .process(&event(
                "evt_cs_2_settled",
                "checkout.session.async_payment_succeeded",
                delayed_session("paid"),
            ))
            .await
            .unwrap();
        service
            .process(&event(
                "evt_cs_2_failed_again",
                "checkout.session.async_payment_failed",
                delayed_session("unpaid"),
            ))
            .await
            .unwrap();
        let orders = OrdersService::new(pool).list_orders("U_1").await.unwrap();
        assert_eq!(orders[0].status, "paid");
    }

    #[tokio::test]
    async fn test_unknown_user_records_order_without_points() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());

        let outcome = service
            .process(&event(
                "evt_cs_1",
                "checkout.session.completed",
                json!({
                    "id": "cs_test_000001",
                    "mode": "payment",
                    "customer_email": "stranger@example.com",
                    "amount_total": 1000
                }),
            ))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Processed {
                user_id: None,
                points_awarded: 0
            }
        );
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM orders").await, 1);
        assert_eq!(
            count(&pool, "SELECT COUNT(*) FROM reward_transactions").await,
            0
        );
    }

    #[tokio::test]
    async fn test_renewal_invoice_awards_via_subscription_lookup() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());
        service
            .process(&subscription_created("evt_sub_1", "U_1"))
            .await
            .unwrap();

        service
            .process(&event(
                "evt_inv_1",
                "invoice.paid",
                json!({
                    "id": "in_test_000001",
                    "customer": "cus_test000001",
                    "subscription": "sub_test000001",
                    "amount_paid": 5900,
                    "currency": "usd",
                    "billing_reason": "subscription_cycle"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(points(&pool, "U_1").await, 600);
        let payments = OrdersService::new(pool.clone())
            .list_payments("U_1")
            .await
            .unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount_paid_cents, 5900);
    }

    #[tokio::test]
    async fn test_paid_and_succeeded_for_same_invoice_award_once() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());
        service
            .process(&subscription_created("evt_sub_1", "U_1"))
            .await
            .unwrap();

        let invoice = json!({
            "id": "in_test_000001",
            "subscription": "sub_test000001",
            "amount_paid": 5900,
            "billing_reason": "subscription_cycle"
        });
        service
            .process(&event("evt_inv_1", "invoice.paid", invoice.clone()))
            .await
            .unwrap();
        service
            .process(&event("evt_inv_2", "invoice.payment_succeeded", invoice))
            .await
            .unwrap();

        assert_eq!(points(&pool, "U_1").await, 600);
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM payments").await, 1);
    }

    #[tokio::test]
    async fn test_first_invoice_is_not_a_renewal() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());
        service
            .process(&subscription_created("evt_sub_1", "U_1"))
            .await
            .unwrap();

        service
            .process(&event(
                "evt_inv_1",
                "invoice.paid",
                json!({
                    "id": "in_test_000001",
                    "subscription": "sub_test000001",
                    "amount_paid": 5900,
                    "billing_reason": "subscription_create"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(points(&pool, "U_1").await, 500);
    }

    #[tokio::test]
    async fn test_subscription_update_refreshes_status() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());
        service
            .process(&subscription_created("evt_sub_1", "U_1"))
            .await
            .unwrap();

        service
            .process(&event(
                "evt_sub_2",
                "customer.subscription.deleted",
                json!({
                    "id": "sub_test000001",
                    "customer": "cus_test000001",
                    "status": "canceled"
                }),
            ))
            .await
            .unwrap();

        let subs = OrdersService::new(pool.clone())
            .list_subscriptions("U_1")
            .await
            .unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].status, "canceled");
        assert_eq!(points(&pool, "U_1").await, 500);
    }

    #[tokio::test]
    async fn test_unhandled_event_type_is_ignored() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());

        let outcome = service
            .process(&event("evt_x", "customer.created", json!({ "id": "cus_1" })))
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Ignored);
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM stripe_events").await, 1);
    }

    #[tokio::test]
    async fn test_malformed_object_rolls_back() {
        let pool = setup_test_db().await;
        let service = WebhookService::new(pool.clone());

        let result = service
            .process(&event(
                "evt_bad",
                "customer.subscription.created",
                json!({ "customer": "cus_1" }),
            ))
            .await;

        assert!(matches!(result, Err(WebhookError::Malformed { .. })));
        // Not recorded, so a corrected redelivery is still processed
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM stripe_events").await, 0);
    }

    type SharedState = Extension<Arc<RwLock<crate::common::AppState>>>;

    async fn shared_state() -> (SharedState, SqlitePool) {
        let state = test_state().await;
        let pool = state.db.clone();
        (Extension(Arc::new(RwLock::new(state))), pool)
    }

    #[tokio::test]
    async fn test_handler_rejects_missing_signature() {
        let (state, _) = shared_state().await;

        let result = stripe_webhook(state, HeaderMap::new(), Bytes::from_static(b"{}")).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_handler_rejects_bad_signature() {
        let (state, pool) = shared_state().await;
        let body = serde_json::to_vec(&json!({
            "id": "evt_sub_1",
            "type": "customer.subscription.created",
            "data": {
                "object": { "id": "sub_1", "status": "active", "metadata": { "user_id": "U_1" } }
            }
        }))
        .unwrap();

        let mut headers = HeaderMap::new();
        let header = sign_payload(&body, "whsec_wrong", chrono::Utc::now().timestamp());
        headers.insert(STRIPE_SIGNATURE_HEADER, header.parse().unwrap());

        let result = stripe_webhook(state, headers, Bytes::from(body)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert_eq!(points(&pool, "U_1").await, 0);
    }

    #[tokio::test]
    async fn test_handler_processes_signed_event() {
        let (state, pool) = shared_state().await;
        let body = serde_json::to_vec(&json!({
            "id": "evt_sub_1",
            "type": "customer.subscription.created",
            "data": {
                "object": { "id": "sub_1", "status": "active", "metadata": { "user_id": "U_1" } }
            }
        }))
        .unwrap();

        let mut headers = HeaderMap::new();
        let header = sign_payload(&body, "whsec_test_secret", chrono::Utc::now().timestamp());
        headers.insert(STRIPE_SIGNATURE_HEADER, header.parse().unwrap());

        let first = stripe_webhook(state.clone(), headers.clone(), Bytes::from(body.clone()))
            .await
            .unwrap();
        assert_eq!(first.0, json!({ "received": true }));

        let second = stripe_webhook(state, headers, Bytes::from(body))
            .await
            .unwrap();
        assert_eq!(second.0, json!({ "received": true, "duplicate": true }));
        assert_eq!(points(&pool, "U_1").await, 500);
    }
}
