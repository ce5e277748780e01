//! Profile and group validation rules, shared between the HTTP handlers and
//! the typed client so the two cannot drift apart.

use lazy_static::lazy_static;
use regex::Regex;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Names (user and group) need at least two characters.
pub fn validate_name(name: &str) -> Option<String> {
    if name.chars().count() < 2 {
        return Some("Name must be at least 2 characters".into());
    }
    None
}

pub fn validate_age(age: i32) -> Option<String> {
    if (18..=99).contains(&age) {
        None
    } else {
        Some("Invalid age: acceptable values are from 18 to 99 years-old".into())
    }
}

/// Height is optional; when present it must fall in 100..=300 cm.
pub fn validate_height(value: Option<f64>) -> Option<String> {
    match value {
        None => None,
        Some(v) if v > 99.0 && v < 301.0 => None,
        Some(_) => Some("Invalid height: acceptable values are from 100 cm to 300 cm".into()),
    }
}

/// Weight is optional; anything at or above 301 kg is rejected.
pub fn validate_weight(value: Option<f64>) -> Option<String> {
    match value {
        None => None,
        Some(v) if v < 301.0 => None,
        Some(_) => Some("Invalid weight: acceptable values are from 30 kg to 300 kg".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[test]
    fn name_needs_two_characters() {
        assert!(validate_name("a").is_some());
        assert!(validate_name("").is_some());
        assert!(validate_name("ab").is_none());
    }

    #[test]
    fn age_bounds_are_inclusive() {
        assert!(validate_age(17).is_some());
        assert!(validate_age(18).is_none());
        assert!(validate_age(99).is_none());
        assert!(validate_age(100).is_some());
    }

    #[test]
    fn height_is_optional_with_bounds() {
        assert!(validate_height(None).is_none());
        assert!(validate_height(Some(99.0)).is_some());
        assert!(validate_height(Some(100.0)).is_none());
        assert!(validate_height(Some(300.0)).is_none());
        assert!(validate_height(Some(301.0)).is_some());
    }

    #[test]
    fn weight_is_optional_with_upper_bound() {
        assert!(validate_weight(None).is_none());
        assert!(validate_weight(Some(300.0)).is_none());
        assert!(validate_weight(Some(301.0)).is_some());
    }
}
