// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::common::config::AppConfig;
use crate::common::dev_mode::DevModeConfig;
use crate::services::{RateLimitService, StripeClient};

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: AppConfig,
    pub dev_mode: DevModeConfig,
    pub rate_limit_service: Arc<RateLimitService>,
    pub stripe: StripeClient,
}
