use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::helpers::serialize_int_as_bool;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub image_url: Option<String>,
    #[serde(serialize_with = "serialize_int_as_bool")]
    pub is_subscription: i64,
    pub stripe_price_id: Option<String>,
    #[serde(serialize_with = "serialize_int_as_bool")]
    pub is_active: i64,
    pub created_at: Option<String>,
}

impl Product {
    pub fn is_subscription(&self) -> bool {
        self.is_subscription != 0
    }

    pub fn is_active(&self) -> bool {
        self.is_active != 0
    }
}

/// Query parameters for GET /api/products
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub subscription: Option<bool>,
}
