use serde::{Deserialize, Serialize};

pub const MAX_CHECKOUT_ITEMS: usize = 50;
pub const MAX_ITEM_QUANTITY: i64 = 99;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub id: String,
    pub url: Option<String>,
}
