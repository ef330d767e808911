// Common validation types and traits

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Record an error unless `value` lies within `min..=max`
    pub fn check_range(&mut self, field: &str, value: i64, min: i64, max: i64) {
        if value < min || value > max {
            self.add_error(field, &format!("must be between {} and {}", min, max));
        }
    }

    /// Record an error if `value` is blank after trimming
    pub fn check_not_blank(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add_error(field, "must not be empty");
        }
    }

    /// Convert into a `Result`, so callers can use `?`
    pub fn into_result(self) -> Result<(), super::ApiError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range_bounds_are_inclusive() {
        let mut result = ValidationResult::new();
        result.check_range("quantity", 1, 1, 99);
        result.check_range("quantity", 99, 1, 99);
        assert!(result.is_valid);

        result.check_range("quantity", 100, 1, 99);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "quantity");
    }

    #[test]
    fn test_check_not_blank() {
        let mut result = ValidationResult::new();
        result.check_not_blank("reward_id", "   ");
        assert!(result.into_result().is_err());
    }
}
