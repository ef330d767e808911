use super::models::{CheckoutRequest, MAX_CHECKOUT_ITEMS, MAX_ITEM_QUANTITY};
use crate::common::{ValidationResult, Validator};

/// Shape checks that need no database access
pub struct CheckoutValidator;

impl Validator<CheckoutRequest> for CheckoutValidator {
    fn validate(&self, data: &CheckoutRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.items.is_empty() {
            result.add_error("items", "At least one item is required");
        } else if data.items.len() > MAX_CHECKOUT_ITEMS {
            result.add_error(
                "items",
                &format!("Cannot check out more than {} items", MAX_CHECKOUT_ITEMS),
            );
        }

        for (index, item) in data.items.iter().enumerate() {
            result.check_not_blank(&format!("items[{}].product_id", index), &item.product_id);
            result.check_range(
                &format!("items[{}].quantity", index),
                item.quantity,
                1,
                MAX_ITEM_QUANTITY,
            );
        }

        for (field, url) in [
            ("success_url", &data.success_url),
            ("cancel_url", &data.cancel_url),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    result.add_error(field, "Must be an absolute http(s) URL");
                }
            }
        }

        result
    }
}
