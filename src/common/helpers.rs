// Helper functions for safe logging and serialization

use chrono::SecondsFormat;
use serde::Serializer;

/// Masks email addresses for safe logging
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 && !parts[0].is_empty() {
            format!("{}***@{}", &parts[0][..1], parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks Stripe ids (`cus_...`, `sub_...`) down to their type prefix and last 4 characters
pub fn safe_stripe_id_log(id: &str) -> String {
    match id.split_once('_') {
        Some((prefix, rest)) if rest.len() > 4 => {
            format!("{}_...{}", prefix, &rest[rest.len() - 4..])
        }
        _ => "***".to_string(),
    }
}

/// SQLite stores booleans as 0/1 integers; expose them as JSON booleans
pub fn serialize_int_as_bool<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_bool(*value != 0)
}

/// Current UTC time as fixed-width RFC 3339, so timestamp columns sort lexically
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
