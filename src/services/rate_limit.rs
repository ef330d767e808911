// src/services/rate_limit.rs
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub authenticated_limit: u32,
    pub anonymous_limit: u32,
    pub per_ip_limit: u32,
    pub window_seconds: u32,
    pub whitelist_ips: Vec<String>,
    /// Read the client IP from `X-Forwarded-For` / `X-Real-IP`. Only safe
    /// behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            authenticated_limit: 120, // per window, keyed by bearer token
            anonymous_limit: 60,      // catalog browsing without a session
            per_ip_limit: 200,
            window_seconds: 60,
            whitelist_ips: vec!["127.0.0.1".to_string(), "::1".to_string()],
            trust_proxy_headers: false,
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from `RATE_LIMIT_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(enabled) = env::var("RATE_LIMIT_ENABLED") {
            config.enabled = enabled.to_lowercase() != "false";
        }

        if let Some(val) = parse_env_u32("RATE_LIMIT_AUTHENTICATED") {
            config.authenticated_limit = val;
        }

        if let Some(val) = parse_env_u32("RATE_LIMIT_ANONYMOUS") {
            config.anonymous_limit = val;
        }

        if let Some(val) = parse_env_u32("RATE_LIMIT_PER_IP") {
            config.per_ip_limit = val;
        }

        if let Some(val) = parse_env_u32("RATE_LIMIT_WINDOW_SECONDS") {
            config.window_seconds = val.max(1);
        }

        if let Ok(trust) = env::var("RATE_LIMIT_TRUST_PROXY_HEADERS") {
            config.trust_proxy_headers = trust.to_lowercase() == "true";
        }

        if let Ok(whitelist) = env::var("RATE_LIMIT_WHITELIST_IPS") {
            config.whitelist_ips = whitelist
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config
    }
}

fn parse_env_u32(key: &str) -> Option<u32> {
    let raw = env::var(key).ok()?;
    match raw.parse::<u32>() {
        Ok(val) => Some(val),
        Err(_) => {
            warn!(key = %key, value = %raw, "Ignoring non-numeric rate limit setting");
            None
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitState {
    count: u32,
    window_start: Instant,
}

impl RateLimitState {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }

    fn reset(&mut self) {
        self.count = 0;
        self.window_start = Instant::now();
    }

    fn is_expired(&self, window_duration: Duration) -> bool {
        self.window_start.elapsed() > window_duration
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed,
    Limited { retry_after: u32 },
}

/// Fixed-window limiter keyed by caller identity and by client IP
#[derive(Debug, Clone)]
pub struct RateLimitService {
    config: RateLimitConfig,
    rate_limiter: Arc<RwLock<HashMap<String, RateLimitState>>>,
}

impl Default for RateLimitService {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitService {
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::from_env())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        info!(
            enabled = config.enabled,
            authenticated_limit = config.authenticated_limit,
            anonymous_limit = config.anonymous_limit,
            per_ip_limit = config.per_ip_limit,
            window_seconds = config.window_seconds,
            whitelist_ips = ?config.whitelist_ips,
            trust_proxy_headers = config.trust_proxy_headers,
            "Initializing RateLimitService"
        );
        Self {
            config,
            rate_limiter: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_seconds as u64)
    }

    fn is_whitelisted(&self, ip: &str) -> bool {
        self.config.whitelist_ips.iter().any(|allowed| allowed == ip)
    }

    /// Check rate limit for a given identifier
    pub async fn check_rate_limit(
        &self,
        identifier: &str,
        ip_address: Option<&str>,
        is_authenticated: bool,
    ) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::Allowed;
        }

        if let Some(ip) = ip_address {
            if self.is_whitelisted(ip) {
                return RateLimitResult::Allowed;
            }
        }

        let limit = if is_authenticated {
            self.config.authenticated_limit
        } else {
            self.config.anonymous_limit
        };

        let window_duration = self.window();

        if let limited @ RateLimitResult::Limited { .. } = self
            .check_limit_for_key(identifier, limit, window_duration)
            .await
        {
            return limited;
        }

        if let Some(ip) = ip_address {
            let ip_key = format!("ip:{}", ip);
            if let limited @ RateLimitResult::Limited { .. } = self
                .check_limit_for_key(&ip_key, self.config.per_ip_limit, window_duration)
                .await
            {
                return limited;
            }
        }

        RateLimitResult::Allowed
    }

    async fn check_limit_for_key(
        &self,
        key: &str,
        limit: u32,
        window_duration: Duration,
    ) -> RateLimitResult {
        let mut limiter = self.rate_limiter.write().await;

        let state = limiter
            .entry(key.to_string())
            .or_insert_with(RateLimitState::new);

        if state.is_expired(window_duration) {
            state.reset();
        }

        if state.count >= limit {
            let elapsed = state.window_start.elapsed().as_secs();
            let retry_after = window_duration.as_secs().saturating_sub(elapsed).max(1) as u32;
            return RateLimitResult::Limited { retry_after };
        }

        state.count += 1;
        RateLimitResult::Allowed
    }

    /// Drop windows that have expired; run periodically from a background task
    pub async fn cleanup_expired(&self) {
        let window = self.window();
        let mut limiter = self.rate_limiter.write().await;
        let before = limiter.len();
        limiter.retain(|_, state| !state.is_expired(window));
        debug!(
            removed = before - limiter.len(),
            remaining = limiter.len(),
            "Cleaned up expired rate limit entries"
        );
    }
}
