// rate_limit_middleware.rs
use crate::services::rate_limit::{RateLimitResult, RateLimitService};
use crate::webhooks::WEBHOOK_PATH_PREFIX;
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Serialize)]
struct RateLimitErrorResponse {
    error: String,
    code: String,
    retry_after: u32,
}

/// Client IP used for per-IP limits and the whitelist.
///
/// Forwarding headers are client-controlled unless a proxy rewrites them, so
/// they are only consulted when `trust_proxy_headers` is set. The proxy appends
/// the address it saw, so the right-most `X-Forwarded-For` hop is used.
fn extract_ip_address(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> Option<String> {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').map(str::trim).find(|hop| !hop.is_empty()));
        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }

        if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
            return Some(real_ip.trim().to_string());
        }
    }

    connect_info.map(|info| info.0.ip().to_string())
}

/// Bucket key for a bearer token. Tokens share a JWT header prefix, so the
/// whole token is hashed rather than truncated.
fn extract_user_identifier(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            let digest = Sha256::digest(token.as_bytes());
            format!("token:{}", hex::encode(&digest[..12]))
        })
}

/// Rate limiting middleware
///
/// Stripe webhook deliveries are exempt: they are signed, and a 429 would only
/// push Stripe into its retry schedule.
pub async fn rate_limit_middleware(
    Extension(rate_limit_service): Extension<Arc<RateLimitService>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if path.starts_with(WEBHOOK_PATH_PREFIX) {
        return next.run(request).await;
    }

    let ip_address = extract_ip_address(
        request.headers(),
        connect_info.as_ref(),
        rate_limit_service.config().trust_proxy_headers,
    );
    let user_identifier = extract_user_identifier(request.headers());
    let is_authenticated = user_identifier.is_some();

    // Use IP as identifier if no user token is present
    let identifier = user_identifier
        .or_else(|| ip_address.clone().map(|ip| format!("anon:{}", ip)))
        .unwrap_or_else(|| "unknown".to_string());

    match rate_limit_service
        .check_rate_limit(&identifier, ip_address.as_deref(), is_authenticated)
        .await
    {
        RateLimitResult::Allowed => {
            debug!(
                identifier = %identifier,
                ip = ?ip_address,
                path = %path,
                "Request allowed by rate limiter"
            );
            next.run(request).await
        }
        RateLimitResult::Limited { retry_after } => {
            warn!(
                identifier = %identifier,
                ip = ?ip_address,
                path = %path,
                retry_after = retry_after,
                "Request blocked by rate limiter"
            );
            rate_limited_response(retry_after)
        }
    }
}

fn rate_limited_response(retry_after: u32) -> Response {
    let error_response = RateLimitErrorResponse {
        error: "Rate limit exceeded. Please try again later.".to_string(),
        code: "RATE_LIMIT_EXCEEDED".to_string(),
        retry_after,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(error_response)).into_response();
    response
        .headers_mut()
        .insert("retry-after", HeaderValue::from(retry_after));
    response
}
