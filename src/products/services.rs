use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use super::models::{Product, ProductFilter};
use crate::common::ApiError;

const PRODUCT_COLUMNS: &str = "id, slug, name, description, category, price_cents, currency, \
    image_url, is_subscription, stripe_price_id, is_active, created_at";

pub struct ProductsService {
    db: SqlitePool,
}

impl ProductsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Active products ordered by name, optionally narrowed by category and kind
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM products WHERE is_active = 1",
            PRODUCT_COLUMNS
        ));

        if let Some(category) = filter.category.as_deref().filter(|c| !c.trim().is_empty()) {
            query.push(" AND category = ").push_bind(category.trim().to_string());
        }
        if let Some(subscription) = filter.subscription {
            query.push(" AND is_subscription = ").push_bind(subscription);
        }
        query.push(" ORDER BY name ASC");

        let products = query.build_query_as::<Product>().fetch_all(&self.db).await?;
        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Product, ApiError> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE slug = ? AND is_active = 1",
            PRODUCT_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product '{}' not found", slug)))
    }

    /// Fetch products by id, including inactive ones so callers can report them
    pub async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM products WHERE id IN (",
            PRODUCT_COLUMNS
        ));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        Ok(query.build_query_as::<Product>().fetch_all(&self.db).await?)
    }
}
