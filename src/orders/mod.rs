//! # Orders Module
//!
//! Read side of the Stripe mirrors (orders, subscriptions, invoice
//! payments). Rows are written by the webhook processor.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(test)]
mod tests;

pub use routes::orders_routes;
pub use services::OrdersService;
