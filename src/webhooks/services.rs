use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::models::{
    CheckoutSessionObject, InvoiceObject, StripeEvent, SubscriptionObject, UserHints,
    CHECKOUT_SESSION_ASYNC_PAYMENT_FAILED, CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED,
    CHECKOUT_SESSION_COMPLETED, INVOICE_PAID, INVOICE_PAYMENT_SUCCEEDED, SUBSCRIPTION_CREATED,
    SUBSCRIPTION_DELETED, SUBSCRIPTION_UPDATED,
};
use crate::common::helpers::safe_stripe_id_log;
use crate::common::{
    generate_order_id, generate_payment_id, generate_subscription_id, now_rfc3339, ApiError,
};
use crate::rewards::services::{award_points_in, AwardOutcome};
use crate::rewards::AwardReason;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed {object} object: {source}")]
    Malformed {
        object: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<WebhookError> for ApiError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::Malformed { .. } => ApiError::BadRequest(e.to_string()),
            // Surfaced as 500 so Stripe redelivers the event
            WebhookError::Database(err) => ApiError::DatabaseError(err),
        }
    }
}

/// What processing an event did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Processed {
        user_id: Option<String>,
        points_awarded: i64,
    },
    Duplicate,
    Ignored,
}

impl WebhookOutcome {
    fn processed(user_id: Option<String>, award: Option<AwardOutcome>) -> Self {
        WebhookOutcome::Processed {
            user_id,
            points_awarded: award.map(|a| a.points_awarded).unwrap_or(0),
        }
    }
}

pub struct WebhookService {
    db: SqlitePool,
}

impl WebhookService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Apply one verified event.
    ///
    /// The event id, the mirrored rows and any points award commit together;
    /// a redelivered event id is acknowledged without side effects.
    pub async fn process(&self, event: &StripeEvent) -> Result<WebhookOutcome, WebhookError> {
        let mut tx = self.db.begin().await?;

        let recorded = sqlx::query(
            r#"
            INSERT OR IGNORE INTO stripe_events (event_id, event_type, processed_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.event_type)
        .bind(now_rfc3339())
        .execute(&mut *tx)
        .await?;

        if recorded.rows_affected() == 0 {
            info!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Duplicate webhook event ignored"
            );
            tx.rollback().await?;
            return Ok(WebhookOutcome::Duplicate);
        }

        let outcome = match event.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED | CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED => {
                let session: CheckoutSessionObject = parse_object(event, "checkout session")?;
                let status = if session.is_paid() { "paid" } else { "pending" };
                handle_checkout_session(&mut tx, &event.id, &session, status).await?
            }
            CHECKOUT_SESSION_ASYNC_PAYMENT_FAILED => {
                let session: CheckoutSessionObject = parse_object(event, "checkout session")?;
                handle_checkout_session(&mut tx, &event.id, &session, "failed").await?
            }
            SUBSCRIPTION_CREATED => {
                let subscription: SubscriptionObject = parse_object(event, "subscription")?;
                handle_subscription_created(&mut tx, &event.id, &subscription).await?
            }
            SUBSCRIPTION_UPDATED | SUBSCRIPTION_DELETED => {
                let subscription: SubscriptionObject = parse_object(event, "subscription")?;
                let user_id = upsert_subscription(&mut tx, &subscription).await?;
                WebhookOutcome::processed(user_id, None)
            }
            INVOICE_PAID | INVOICE_PAYMENT_SUCCEEDED => {
                let invoice: InvoiceObject = parse_object(event, "invoice")?;
                handle_invoice_paid(&mut tx, &event.id, &invoice).await?
            }
            other => {
                debug!(event_id = %event.id, event_type = %other, "Unhandled webhook event type");
                WebhookOutcome::Ignored
            }
        };

        tx.commit().await?;

        info!(
            event_id = %event.id,
            event_type = %event.event_type,
            livemode = event.livemode,
            outcome = ?outcome,
            "Webhook event processed"
        );

        Ok(outcome)
    }
}

fn parse_object<T: DeserializeOwned>(
    event: &StripeEvent,
    object: &'static str,
) -> Result<T, WebhookError> {
    serde_json::from_value(event.data.object.clone()).map_err(|source| {
        error!(
            event_id = %event.id,
            object = object,
            error = %source,
            "Failed to parse webhook object"
        );
        WebhookError::Malformed { object, source }
    })
}

/// Mirror a checkout session at `status` (`paid`, `pending` or `failed`).
///
/// Delayed payment methods complete as `pending` and settle later through an
/// async payment event; the Purchase award fires on the first transition to
/// `paid`, whichever event carries it.
async fn handle_checkout_session(
    conn: &mut SqliteConnection,
    event_id: &str,
    session: &CheckoutSessionObject,
    status: &str,
) -> Result<WebhookOutcome, WebhookError> {
    let resolved = resolve_user(
        conn,
        UserHints {
            user_id: session
                .metadata
                .get("user_id")
                .map(String::as_str)
                .or(session.client_reference_id.as_deref()),
            stripe_customer_id: session.customer.as_deref(),
            email: session.email(),
            ..UserHints::default()
        },
    )
    .await?;

    let previous: Option<(String,)> =
        sqlx::query_as("SELECT status FROM orders WHERE stripe_session_id = ?")
            .bind(&session.id)
            .fetch_optional(&mut *conn)
            .await?;
    let was_paid = matches!(&previous, Some((s,)) if s.as_str() == "paid");

    // A paid order never moves back to pending or failed
    let (order_id, user_id, stored_status): (String, Option<String>, String) = sqlx::query_as(
        r#"
        INSERT INTO orders (
            id, user_id, stripe_session_id, stripe_payment_intent_id, stripe_customer_id,
            amount_total_cents, currency, status, customer_email, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(stripe_session_id) DO UPDATE SET
            status = CASE WHEN orders.status = 'paid' THEN orders.status ELSE excluded.status END,
            stripe_payment_intent_id =
                COALESCE(excluded.stripe_payment_intent_id, orders.stripe_payment_intent_id),
            user_id = COALESCE(orders.user_id, excluded.user_id)
        RETURNING id, user_id, status
        "#,
    )
    .bind(generate_order_id())
    .bind(resolved.as_deref())
    .bind(&session.id)
    .bind(session.payment_intent.as_deref())
    .bind(session.customer.as_deref())
    .bind(session.amount_total.unwrap_or(0))
    .bind(session.currency.as_deref().unwrap_or("usd"))
    .bind(status)
    .bind(session.email())
    .bind(now_rfc3339())
    .fetch_one(&mut *conn)
    .await?;

    let newly_paid = stored_status == "paid" && !was_paid;

    // Subscription checkouts are rewarded by the subscription event instead
    let description = format!("Order {}", order_id);
    let award = match (&user_id, session.is_subscription(), newly_paid) {
        (Some(uid), false, true) => Some(
            award_points_in(
                conn,
                uid,
                AwardReason::Purchase,
                Some(event_id),
                Some(description.as_str()),
            )
            .await?,
        ),
        (None, _, _) => {
            warn!(
                session_id = %session.id,
                status = %stored_status,
                "Checkout for unknown user, order recorded without points"
            );
            None
        }
        _ => None,
    };

    debug!(
        session_id = %session.id,
        previous = ?previous.map(|(s,)| s),
        status = %stored_status,
        "Order mirror updated"
    );

    Ok(WebhookOutcome::processed(user_id, award))
}

async fn handle_subscription_created(
    conn: &mut SqliteConnection,
    event_id: &str,
    subscription: &SubscriptionObject,
) -> Result<WebhookOutcome, WebhookError> {
    let user_id = upsert_subscription(conn, subscription).await?;

    let award = match &user_id {
        Some(uid) => Some(
            award_points_in(
                conn,
                uid,
                AwardReason::SubscriptionCreated,
                Some(event_id),
                None,
            )
            .await?,
        ),
        None => {
            warn!(
                subscription = %safe_stripe_id_log(&subscription.id),
                "Subscription created for unknown user, no points awarded"
            );
            None
        }
    };

    Ok(WebhookOutcome::processed(user_id, award))
}

/// Insert or refresh the subscription mirror, returning its resolved user
async fn upsert_subscription(
    conn: &mut SqliteConnection,
    subscription: &SubscriptionObject,
) -> Result<Option<String>, WebhookError> {
    let user_id = resolve_user(
        conn,
        UserHints {
            user_id: subscription.metadata.get("user_id").map(String::as_str),
            stripe_subscription_id: Some(subscription.id.as_str()),
            stripe_customer_id: subscription.customer.as_deref(),
            email: None,
        },
    )
    .await?;

    let now = now_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO subscriptions (
            id, user_id, stripe_subscription_id, stripe_customer_id, status,
            current_period_end, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(stripe_subscription_id) DO UPDATE SET
            status = excluded.status,
            current_period_end = excluded.current_period_end,
            user_id = COALESCE(subscriptions.user_id, excluded.user_id),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(generate_subscription_id())
    .bind(user_id.as_deref())
    .bind(&subscription.id)
    .bind(subscription.customer.as_deref())
    .bind(&subscription.status)
    .bind(subscription.current_period_end)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    debug!(
        subscription = %safe_stripe_id_log(&subscription.id),
        status = %subscription.status,
        user_id = ?user_id,
        "Subscription mirror updated"
    );

    Ok(user_id)
}

async fn handle_invoice_paid(
    conn: &mut SqliteConnection,
    event_id: &str,
    invoice: &InvoiceObject,
) -> Result<WebhookOutcome, WebhookError> {
    let user_id = resolve_user(
        conn,
        UserHints {
            user_id: None,
            stripe_subscription_id: invoice.subscription.as_deref(),
            stripe_customer_id: invoice.customer.as_deref(),
            email: invoice.customer_email.as_deref(),
        },
    )
    .await?;

    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO payments (
            id, user_id, stripe_invoice_id, stripe_subscription_id, amount_paid_cents,
            currency, billing_reason, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(generate_payment_id())
    .bind(user_id.as_deref())
    .bind(&invoice.id)
    .bind(invoice.subscription.as_deref())
    .bind(invoice.amount_paid)
    .bind(invoice.currency.as_deref().unwrap_or("usd"))
    .bind(invoice.billing_reason.as_deref())
    .bind(now_rfc3339())
    .execute(&mut *conn)
    .await?;

    // `invoice.paid` and `invoice.payment_succeeded` both fire for one invoice;
    // only the first one to record the payment may award.
    if inserted.rows_affected() == 0 {
        debug!(invoice = %safe_stripe_id_log(&invoice.id), "Invoice already recorded");
        return Ok(WebhookOutcome::processed(user_id, None));
    }

    let award = match (&user_id, invoice.is_renewal()) {
        (Some(uid), true) => Some(
            award_points_in(
                conn,
                uid,
                AwardReason::SubscriptionRenewal,
                Some(event_id),
                None,
            )
            .await?,
        ),
        (None, true) => {
            warn!(
                invoice = %safe_stripe_id_log(&invoice.id),
                "Renewal paid for unknown user, no points awarded"
            );
            None
        }
        _ => None,
    };

    Ok(WebhookOutcome::processed(user_id, award))
}

/// Map Stripe identifiers back to a local user id
pub(crate) async fn resolve_user(
    conn: &mut SqliteConnection,
    hints: UserHints<'_>,
) -> Result<Option<String>, sqlx::Error> {
    if let Some(user_id) = hints.user_id.filter(|id| !id.trim().is_empty()) {
        return Ok(Some(user_id.to_string()));
    }

    if let Some(subscription_id) = hints.stripe_subscription_id {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT user_id FROM subscriptions
            WHERE stripe_subscription_id = ? AND user_id IS NOT NULL
            "#,
        )
        .bind(subscription_id)
        .fetch_optional(&mut *conn)
        .await?;
        if let Some((user_id,)) = row {
            return Ok(Some(user_id));
        }
    }

    if let Some(customer_id) = hints.stripe_customer_id {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT user_id FROM subscriptions WHERE stripe_customer_id = ? AND user_id IS NOT NULL
            UNION ALL
            SELECT user_id FROM orders WHERE stripe_customer_id = ? AND user_id IS NOT NULL
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;
        if let Some((user_id,)) = row {
            return Ok(Some(user_id));
        }
    }

    if let Some(email) = hints.email {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = ? COLLATE NOCASE")
                .bind(email)
                .fetch_optional(&mut *conn)
                .await?;
        if let Some((user_id,)) = row {
            return Ok(Some(user_id));
        }
    }

    Ok(None)
}
