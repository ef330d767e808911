use std::collections::HashMap;
use tracing::{info, warn};

use super::models::{CheckoutItem, CheckoutRequest, CheckoutResponse};
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};
use crate::products::{Product, ProductsService};

/// Resolve the requested products, create a Stripe Checkout Session and
/// return where to send the shopper.
pub async fn create_checkout(
    state: &AppState,
    user: &AuthedUser,
    request: &CheckoutRequest,
) -> Result<CheckoutResponse, ApiError> {
    if state.stripe.config().secret_key.is_none() {
        warn!("Checkout requested but STRIPE_SECRET_KEY is not configured");
        return Err(ApiError::ServiceUnavailable(
            "payments are not configured".to_string(),
        ));
    }

    let ids: Vec<String> = request
        .items
        .iter()
        .map(|i| i.product_id.trim().to_string())
        .collect();
    let products: HashMap<String, Product> = ProductsService::new(state.db.clone())
        .get_by_ids(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let mut lines = Vec::with_capacity(request.items.len());
    for item in &request.items {
        let product = products
            .get(item.product_id.trim())
            .filter(|p| p.is_active())
            .ok_or_else(|| {
                ApiError::BadRequest(format!("product '{}' is not available", item.product_id))
            })?;
        lines.push((product, item));
    }

    let subscription = match lines.first() {
        Some((product, _)) => product.is_subscription(),
        None => return Err(ApiError::BadRequest("cart is empty".to_string())),
    };
    if lines.iter().any(|(p, _)| p.is_subscription() != subscription) {
        return Err(ApiError::BadRequest(
            "subscription and one-time products must be checked out separately".to_string(),
        ));
    }

    let params = build_checkout_params(
        &lines,
        user,
        &state.config.site_url,
        request.success_url.as_deref(),
        request.cancel_url.as_deref(),
    );

    let session = state.stripe.create_checkout_session(&params).await?;
    info!(
        user_id = %user.id,
        session_id = %session.id,
        line_items = lines.len(),
        subscription = subscription,
        "Checkout session created"
    );

    Ok(CheckoutResponse {
        id: session.id,
        url: session.url,
    })
}

/// Form fields for `POST /v1/checkout/sessions`.
///
/// Products with a `stripe_price_id` reference it; others are priced inline.
pub fn build_checkout_params(
    lines: &[(&Product, &CheckoutItem)],
    user: &AuthedUser,
    site_url: &str,
    success_url: Option<&str>,
    cancel_url: Option<&str>,
) -> Vec<(String, String)> {
    let subscription = lines.iter().any(|(p, _)| p.is_subscription());
    let mode = if subscription { "subscription" } else { "payment" };

    let mut params: Vec<(String, String)> = vec![
        ("mode".into(), mode.into()),
        (
            "success_url".into(),
            success_url
                .map(str::to_string)
                .unwrap_or_else(|| {
                    format!("{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}", site_url)
                }),
        ),
        (
            "cancel_url".into(),
            cancel_url
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}/cart", site_url)),
        ),
        ("client_reference_id".into(), user.id.clone()),
        ("customer_email".into(), user.email.clone()),
        ("metadata[user_id]".into(), user.id.clone()),
    ];

    if subscription {
        // Carried onto the subscription so later events resolve the user directly
        params.push(("subscription_data[metadata][user_id]".into(), user.id.clone()));
    }

    for (i, (product, item)) in lines.iter().enumerate() {
        let key = |field: &str| format!("line_items[{}]{}", i, field);
        match product.stripe_price_id.as_deref() {
            Some(price) => params.push((key("[price]"), price.to_string())),
            None => {
                params.push((key("[price_data][currency]"), product.currency.clone()));
                params.push((
                    key("[price_data][unit_amount]"),
                    product.price_cents.to_string(),
                ));
                params.push((key("[price_data][product_data][name]"), product.name.clone()));
                if product.is_subscription() {
                    params.push((key("[price_data][recurring][interval]"), "month".into()));
                }
            }
        }
        params.push((key("[quantity]"), item.quantity.to_string()));
    }

    params
}
