//! # Webhooks Module
//!
//! Stripe event receiver. Mirrors checkout sessions, subscriptions and
//! invoices into local tables and awards rewards points for them.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
mod tests;

pub use routes::{webhooks_routes, WEBHOOK_PATH_PREFIX};
pub use services::{WebhookOutcome, WebhookService};
