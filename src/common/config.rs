// src/common/config.rs
//! Environment-driven application configuration

use std::env;
use tracing::warn;

use super::id_generator::generate_raw_secret;

const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub stripe: StripeConfig,
    pub site_url: String,
    pub cors_origins: Vec<String>,
    pub reset_db: bool,
    pub seed_catalog: bool,
}

/// Stripe credentials. Either secret may be absent, which disables the
/// endpoints that need it instead of falling back to a baked-in value.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = match non_empty_var("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                warn!(
                    "JWT_SECRET not set - using a random per-process secret, \
                     issued tokens will not survive restarts"
                );
                generate_raw_secret()
            }
        };

        let cors_origins = split_list(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
        );

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://wellness.db".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(8080),
            jwt_secret,
            stripe: StripeConfig {
                secret_key: non_empty_var("STRIPE_SECRET_KEY"),
                webhook_secret: non_empty_var("STRIPE_WEBHOOK_SECRET"),
                api_base: env::var("STRIPE_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string()),
            },
            site_url: env::var("SITE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            cors_origins,
            reset_db: flag("RESET_DB"),
            seed_catalog: flag("SEED_CATALOG"),
        }
    }
}

/// Comma-separated list with blanks dropped
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn flag(key: &str) -> bool {
    env::var(key)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false)
}

#[cfg(test)]
impl AppConfig {
    /// Config for unit tests that never touches the process environment
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            jwt_secret: "test_secret_key".to_string(),
            stripe: StripeConfig {
                secret_key: None,
                webhook_secret: Some("whsec_test_secret".to_string()),
                api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            },
            site_url: "http://localhost:3000".to_string(),
            cors_origins: vec![],
            reset_db: false,
            seed_catalog: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(
            split_list(" http://a.test , ,http://b.test,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_default_cors_origins() {
        assert_eq!(split_list(DEFAULT_CORS_ORIGINS).len(), 2);
    }
}
