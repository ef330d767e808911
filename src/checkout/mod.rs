//! # Checkout Module
//!
//! Turns a cart into a hosted Stripe Checkout Session. Payment results come
//! back later through the webhooks module.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use routes::checkout_routes;
