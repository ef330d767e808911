// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXXXX (e.g., O_K7NP3XQ2 for orders)
//!
//! The alphabet excludes I, L, O and U so ids can be read back over the
//! phone by customer support.

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Random characters after the prefix
const ID_LENGTH: usize = 8;

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User (U_)
    User,
    /// Catalog product (G_) - G for Goods
    Product,
    /// Order (O_)
    Order,
    /// Subscription (S_)
    Subscription,
    /// Invoice payment (P_)
    Payment,
    /// Reward ledger transaction (T_)
    RewardTransaction,
    /// Reward redemption (D_) - D for reDeem
    Redemption,
    /// Reward catalog item (RI_)
    RewardItem,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Product => "G",
            EntityPrefix::Order => "O",
            EntityPrefix::Subscription => "S",
            EntityPrefix::Payment => "P",
            EntityPrefix::RewardTransaction => "T",
            EntityPrefix::Redemption => "D",
            EntityPrefix::RewardItem => "RI",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
///
/// # Example
/// ```
/// let order_id = generate_id(EntityPrefix::Order);
/// // Returns something like "O_K7NP3XQ2"
/// ```
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(ID_LENGTH))
}

/// Unprefixed random string long enough to serve as an ephemeral HMAC key
pub fn generate_raw_secret() -> String {
    generate_crockford_string(48)
}

pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

pub fn generate_product_id() -> String {
    generate_id(EntityPrefix::Product)
}

pub fn generate_order_id() -> String {
    generate_id(EntityPrefix::Order)
}

pub fn generate_subscription_id() -> String {
    generate_id(EntityPrefix::Subscription)
}

pub fn generate_payment_id() -> String {
    generate_id(EntityPrefix::Payment)
}

pub fn generate_reward_transaction_id() -> String {
    generate_id(EntityPrefix::RewardTransaction)
}

pub fn generate_redemption_id() -> String {
    generate_id(EntityPrefix::Redemption)
}

pub fn generate_reward_item_id() -> String {
    generate_id(EntityPrefix::RewardItem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_id_format() {
        let order_id = generate_order_id();
        assert!(order_id.starts_with("O_"));
        assert_eq!(order_id.len(), 2 + ID_LENGTH);

        let item_id = generate_reward_item_id();
        assert!(item_id.starts_with("RI_"));
        assert_eq!(item_id.len(), 3 + ID_LENGTH);
    }

    #[test]
    fn test_crockford_alphabet_only() {
        let id = generate_payment_id();
        let random_part = &id[2..];

        for c in random_part.chars() {
            assert!(
                CROCKFORD_ALPHABET.contains(&(c as u8)),
                "Character '{}' not in Crockford alphabet",
                c
            );
        }

        assert!(!random_part.contains('I'));
        assert!(!random_part.contains('L'));
        assert!(!random_part.contains('O'));
        assert!(!random_part.contains('U'));
    }

    #[test]
    fn test_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            let id = generate_reward_transaction_id();
            assert!(ids.insert(id), "Duplicate ID generated");
        }
    }

    #[test]
    fn test_all_prefixes() {
        assert!(generate_user_id().starts_with("U_"));
        assert!(generate_product_id().starts_with("G_"));
        assert!(generate_order_id().starts_with("O_"));
        assert!(generate_subscription_id().starts_with("S_"));
        assert!(generate_payment_id().starts_with("P_"));
        assert!(generate_reward_transaction_id().starts_with("T_"));
        assert!(generate_redemption_id().starts_with("D_"));
        assert!(generate_reward_item_id().starts_with("RI_"));
    }
}
