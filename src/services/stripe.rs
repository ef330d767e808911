// src/services/stripe.rs
//! Minimal Stripe client: webhook signature verification and Checkout
//! Session creation over the REST API.

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::common::config::StripeConfig;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age (and clock skew) accepted for a signed webhook, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("stripe {0} is not configured")]
    NotConfigured(&'static str),
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(&'static str),
    #[error("webhook timestamp outside tolerance ({age}s)")]
    TimestampOutOfTolerance { age: i64 },
    #[error("stripe request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("stripe api error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// The subset of a Checkout Session returned to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    http: Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(http: Client, config: StripeConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Verify a `Stripe-Signature` header against the raw request body
    pub fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<(), StripeError> {
        let secret = self
            .config
            .webhook_secret
            .as_deref()
            .ok_or(StripeError::NotConfigured("webhook secret"))?;

        verify_signature(
            payload,
            signature_header,
            secret,
            chrono::Utc::now().timestamp(),
        )
    }

    /// POST /v1/checkout/sessions with an already-encoded parameter list
    pub async fn create_checkout_session(
        &self,
        params: &[(String, String)],
    ) -> Result<CheckoutSession, StripeError> {
        let secret_key = self
            .config
            .secret_key
            .as_deref()
            .ok_or(StripeError::NotConfigured("secret key"))?;

        let url = format!("{}/v1/checkout/sessions", self.config.api_base);
        debug!(param_count = params.len(), "Creating Stripe checkout session");

        let response = self
            .http
            .post(&url)
            .bearer_auth(secret_key)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "unknown error".to_string());
            error!(
                http_status = %status,
                message = %message,
                "Stripe rejected checkout session request"
            );
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<CheckoutSession>().await?)
    }
}

/// Parsed `t=...,v1=...` header. Stripe may send several `v1` entries while
/// a secret is being rolled.
struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_signature_header(header: &str) -> Result<SignatureHeader<'_>, StripeError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(StripeError::InvalidSignature("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature("missing v1 signature"));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// HMAC-SHA256 over `"{timestamp}.{payload}"`, compared in constant time
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), StripeError> {
    let header = parse_signature_header(signature_header)?;

    // `t` is attacker-controlled and checked before the HMAC, so no raw arithmetic
    let age = now.checked_sub(header.timestamp).unwrap_or(i64::MAX);
    if age.unsigned_abs() > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        warn!(timestamp = header.timestamp, now = now, "Webhook timestamp too old");
        return Err(StripeError::TimestampOutOfTolerance { age });
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| StripeError::InvalidSignature("unusable secret"))?;
    mac.update(header.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = header.signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(StripeError::InvalidSignature("signature mismatch"))
    }
}

/// Produce a header the way Stripe does
#[cfg(test)]
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}
