// src/services/mod.rs
//
// Shared services used across the domain modules

pub mod rate_limit;
pub mod stripe;

// Re-export commonly used types for convenience
pub use rate_limit::RateLimitService;
pub use stripe::{StripeClient, StripeError};
