//! Input validation utilities

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Regex for validating email addresses
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// Validate an email address
pub fn validate_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Validate a backend identifier used as a path segment
pub fn validate_resource_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 128 && !id.chars().any(|c| c == '/' || c.is_whitespace())
}

/// Parse a `YYYY-MM-DD` query date
pub fn parse_query_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
