// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use tracing::{info, warn};

use super::id_generator::{generate_product_id, generate_reward_item_id};

/// Run all database migrations
///
/// Tables are created with `IF NOT EXISTS`, so running this on every startup
/// is safe. Passing `reset = true` drops everything first.
pub async fn run_migrations(pool: &SqlitePool, reset: bool) -> Result<(), sqlx::Error> {
    if reset {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    } else {
        info!("ℹ️  Skipping table drop (RESET_DB not set). Missing tables will be created.");
    }

    create_core_tables(pool).await?;
    create_catalog_tables(pool).await?;
    create_rewards_tables(pool).await?;
    create_billing_tables(pool).await?;
    create_indexes(pool).await?;

    info!("✅ Database migration completed successfully!");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Reverse dependency order
    let tables = vec![
        "stripe_events",
        "payments",
        "subscriptions",
        "orders",
        "reward_redemptions",
        "reward_transactions",
        "reward_items",
        "rewards_balances",
        "products",
        "users",
    ];

    for table in tables {
        let _ = sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await;
    }

    Ok(())
}

async fn create_core_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            name TEXT,
            created_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_catalog_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            slug TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            category TEXT,
            price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
            currency TEXT NOT NULL DEFAULT 'usd',
            image_url TEXT,
            is_subscription INTEGER NOT NULL DEFAULT 0,
            stripe_price_id TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_rewards_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Balance never goes negative: redemption decrements are conditional
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rewards_balances (
            user_id TEXT PRIMARY KEY,
            points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
            lifetime_points INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reward_transactions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            points INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('earned', 'redeemed')),
            reason TEXT NOT NULL,
            source_event_id TEXT,
            description TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reward_items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            points_cost INTEGER NOT NULL CHECK (points_cost > 0),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reward_redemptions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            reward_item_id TEXT NOT NULL,
            reward_name TEXT NOT NULL,
            points_spent INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'completed',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_billing_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            stripe_session_id TEXT UNIQUE NOT NULL,
            stripe_payment_intent_id TEXT,
            stripe_customer_id TEXT,
            amount_total_cents INTEGER NOT NULL DEFAULT 0,
            currency TEXT NOT NULL DEFAULT 'usd',
            status TEXT NOT NULL,
            customer_email TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            stripe_subscription_id TEXT UNIQUE NOT NULL,
            stripe_customer_id TEXT,
            status TEXT NOT NULL,
            current_period_end INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            stripe_invoice_id TEXT UNIQUE NOT NULL,
            stripe_subscription_id TEXT,
            amount_paid_cents INTEGER NOT NULL DEFAULT 0,
            currency TEXT NOT NULL DEFAULT 'usd',
            billing_reason TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stripe_events (
            event_id TEXT PRIMARY KEY,
            event_type TEXT NOT NULL,
            processed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = vec![
        "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category, is_active)",
        "CREATE INDEX IF NOT EXISTS idx_reward_tx_user ON reward_transactions(user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_redemptions_user \
         ON reward_redemptions(user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_reward_items_cost \
         ON reward_items(is_active, points_cost)",
        "CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(stripe_customer_id)",
        "CREATE INDEX IF NOT EXISTS idx_subscriptions_customer \
         ON subscriptions(stripe_customer_id)",
        "CREATE INDEX IF NOT EXISTS idx_payments_user ON payments(user_id, created_at)",
    ];

    for index in indexes {
        sqlx::query(index).execute(pool).await?;
    }

    Ok(())
}

/// Insert the default product and reward catalogs when the tables are empty
pub async fn seed_default_catalog(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let (product_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;

    if product_count == 0 {
        let products = vec![
            ("daily-greens", "Daily Greens", "supplements", 4900, false),
            ("magnesium-sleep", "Magnesium Sleep Blend", "supplements", 3200, false),
            ("adaptogen-tea", "Adaptogen Tea", "tea", 2400, false),
            ("wellness-box-monthly", "Monthly Wellness Box", "subscriptions", 5900, true),
        ];

        for (slug, name, category, price_cents, is_subscription) in products {
            sqlx::query(
                r#"
                INSERT INTO products
                    (id, slug, name, category, price_cents, currency, is_subscription)
                VALUES (?, ?, ?, ?, ?, 'usd', ?)
                "#,
            )
            .bind(generate_product_id())
            .bind(slug)
            .bind(name)
            .bind(category)
            .bind(price_cents)
            .bind(is_subscription)
            .execute(pool)
            .await?;
        }
        info!("🌱 Seeded default product catalog");
    }

    let (item_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reward_items")
        .fetch_one(pool)
        .await?;

    if item_count == 0 {
        let items = vec![
            ("$5 off your next order", 500),
            ("Free shipping", 750),
            ("$15 off your next order", 1500),
            ("Free Adaptogen Tea", 2400),
            ("Free month of the Wellness Box", 5000),
        ];

        for (name, cost) in items {
            sqlx::query("INSERT INTO reward_items (id, name, points_cost) VALUES (?, ?, ?)")
                .bind(generate_reward_item_id())
                .bind(name)
                .bind(cost)
                .execute(pool)
                .await?;
        }
        info!("🌱 Seeded default reward catalog");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = memory_pool().await;
        run_migrations(&pool, false).await.unwrap();
        run_migrations(&pool, false).await.unwrap();

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'rewards_balances'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_seed_only_fills_empty_tables() {
        let pool = memory_pool().await;
        run_migrations(&pool, false).await.unwrap();
        seed_default_catalog(&pool).await.unwrap();
        seed_default_catalog(&pool).await.unwrap();

        let (products,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&pool)
            .await
            .unwrap();
        let (items,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reward_items")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(products, 4);
        assert_eq!(items, 5);
    }

    #[tokio::test]
    async fn test_balance_cannot_go_negative() {
        let pool = memory_pool().await;
        run_migrations(&pool, false).await.unwrap();

        let result =
            sqlx::query("INSERT INTO rewards_balances (user_id, points) VALUES ('U_1', -5)")
                .execute(&pool)
                .await;
        assert!(result.is_err());
    }
}
