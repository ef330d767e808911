//! # Auth Module
//!
//! Identity is owned by an external provider that issues HS256 JWTs.
//! This module verifies those tokens, mirrors the user locally and
//! exposes the `AuthedUser` extractor for protected routes.

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;


pub use extractors::AuthedUser;
pub use routes::auth_routes;
