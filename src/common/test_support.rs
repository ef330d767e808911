// Shared fixtures for module tests

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use super::config::AppConfig;
use super::dev_mode::DevModeConfig;
use super::migrations::run_migrations;
use super::state::AppState;
use crate::services::{RateLimitService, StripeClient};

/// Single-connection in-memory database with the production schema.
///
/// `sqlite::memory:` is per connection, so the pool must not open a second one.
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    run_migrations(&pool, false).await.unwrap();
    pool
}

/// File-backed database with several connections, configured like production.
///
/// Use this where writers must actually race. Keep the `TempDir` alive for
/// the duration of the test.
pub async fn setup_file_db() -> (SqlitePool, TempDir) {
    let dir = TempDir::new().unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("wellness.db"))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .unwrap();

    run_migrations(&pool, false).await.unwrap();
    (pool, dir)
}

/// Talks to local mock servers only, so ignore any proxy in the environment
pub fn test_http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub async fn test_state() -> AppState {
    let config = AppConfig::for_tests();
    AppState {
        db: setup_test_db().await,
        stripe: StripeClient::new(test_http_client(), config.stripe.clone()),
        config,
        dev_mode: DevModeConfig::disabled(),
        rate_limit_service: Arc::new(RateLimitService::new()),
    }
}

pub async fn insert_user(pool: &SqlitePool, id: &str, email: &str) {
    sqlx::query("INSERT INTO users (id, email) VALUES (?, ?)")
        .bind(id)
        .bind(email)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn insert_reward_item(pool: &SqlitePool, id: &str, name: &str, cost: i64) {
    sqlx::query("INSERT INTO reward_items (id, name, points_cost) VALUES (?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(cost)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn insert_product(
    pool: &SqlitePool,
    id: &str,
    slug: &str,
    price_cents: i64,
    is_subscription: bool,
) {
    sqlx::query(
        r#"
        INSERT INTO products (id, slug, name, category, price_cents, is_subscription)
        VALUES (?, ?, ?, 'supplements', ?, ?)
        "#,
    )
    .bind(id)
    .bind(slug)
    .bind(format!("Product {}", slug))
    .bind(price_cents)
    .bind(is_subscription)
    .execute(pool)
    .await
    .unwrap();
}
