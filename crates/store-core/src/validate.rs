//! Input validation shared by the request types.

use crate::error::{ShopError, ShopResult};

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn require_non_empty(field: &str, value: &str) -> ShopResult<()> {
    if value.trim().is_empty() {
        return Err(ShopError::InvalidRequest(format!("{} is required", field)));
    }
    Ok(())
}

/// Structural email check: one `@`, non-empty local part, dotted domain
pub fn email(value: &str) -> ShopResult<()> {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !value.contains(char::is_whitespace)
                && domain
                    .split('.')
                    .filter(|label| !label.is_empty())
                    .count()
                    >= 2
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ShopError::InvalidRequest(
            "Please enter a valid email".to_string(),
        ))
    }
}

pub fn password(value: &str) -> ShopResult<()> {
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ShopError::InvalidRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
