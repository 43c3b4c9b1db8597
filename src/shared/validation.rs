use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// Regex for validating category names used in department mappings
    /// Any printable text; must not start or end with whitespace
    /// - Valid: "Pothole", "Fallen Tree / Landscaping", "Pothole (Minor)", "Kid's_Park, North"
    /// - Invalid: " Pothole", "Pothole ", "Road\nDamage", ""
    pub static ref CATEGORY_NAME_REGEX: Regex =
        Regex::new(r"^[^\s\p{Cc}](?:[^\p{Cc}]*[^\s\p{Cc}])?$").unwrap();
}

/// Rejects NaN and infinities, which slip through `range` checks
pub fn validate_finite<T: std::borrow::Borrow<f64>>(value: T) -> Result<(), ValidationError> {
    if value.borrow().is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("finite").with_message("must be a finite number".into()))
    }
}
