//! # Products Module
//!
//! Read-only storefront catalog.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;


pub use models::Product;
pub use routes::products_routes;
pub use services::ProductsService;
