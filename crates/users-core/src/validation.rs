//! Input validation for registration and device requests

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

use crate::config::PasswordConfig;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static DEVICE_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:-]{1,64}$").unwrap());

static COMMON_PASSWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "password", "123456", "12345678", "123456789", "1234567890", "password1",
        "password123", "qwerty", "qwertyuiop", "abc123", "111111", "letmein",
        "welcome", "iloveyou", "admin", "changeme", "trustno1", "sunshine",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password must be at least {0} characters")]
    TooShort(usize),

    #[error("Password must not exceed {0} characters")]
    TooLong(usize),

    #[error("This password is too common")]
    CommonPassword,
}

/// Length bounds count characters, not bytes.
pub fn validate_password(password: &str, policy: &PasswordConfig) -> Result<(), PasswordError> {
    let length = password.chars().count();
    if length < policy.min_length {
        return Err(PasswordError::TooShort(policy.min_length));
    }
    if length > policy.max_length {
        return Err(PasswordError::TooLong(policy.max_length));
    }
    if COMMON_PASSWORDS.contains(password.to_lowercase().as_str()) {
        return Err(PasswordError::CommonPassword);
    }
    Ok(())
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::new("invalid_email_format"));
    }

    if email.contains(['<', '>', '"', '\'']) {
        return Err(ValidationError::new("email_contains_dangerous_chars"));
    }

    Ok(())
}

/// Lookups are case-insensitive on email.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Client-supplied device identifiers end up inside topic names, so keep
/// them free of `/`, `#`, `+` and whitespace.
pub fn validate_device_id(device_id: &str) -> Result<(), ValidationError> {
    if DEVICE_ID_REGEX.is_match(device_id) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_device_id"))
    }
}

pub fn validate_device_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("device_name_empty"));
    }
    if trimmed.chars().count() > 100 {
        return Err(ValidationError::new("device_name_too_long"));
    }
    if trimmed.contains(['<', '>']) {
        return Err(ValidationError::new("device_name_invalid_chars"));
    }
    Ok(())
}
