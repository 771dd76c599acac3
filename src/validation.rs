//! Form input validation
//!
//! Client-side checks are advisory: they block a submit early with a usable
//! message, but the backend remains the authority on every field.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;

/// Maximum size for free-text fields (summaries, prompts)
pub const MAX_TEXT_BYTES: usize = 10_000;
/// Maximum size for short identifier/name fields
pub const MAX_FIELD_BYTES: usize = 200;
/// Minimum password length accepted by the backend
pub const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{0} cannot be empty")]
    EmptyInput(&'static str),
    #[error("{field} exceeds size limit: {size} bytes (max: {max} bytes)")]
    InputTooLarge {
        field: &'static str,
        size: usize,
        max: usize,
    },
    #[error("Invalid input format: {0}")]
    InvalidFormat(String),
    #[error("Passwords do not match")]
    PasswordMismatch,
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

// Korean mobile/landline style: 2-3 digit prefix, optional dashes
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0\d{1,2}-?\d{3,4}-?\d{4}$").unwrap());

// Login ids: letters, digits, dot/dash/underscore, 3-30 chars
static USER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{3,30}$").unwrap());

/// Validate non-empty input (whitespace-only counts as empty)
pub fn validate_non_empty(text: &str, field: &'static str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyInput(field));
    }
    Ok(())
}

/// Validate text size
pub fn validate_text_size(
    text: &str,
    field: &'static str,
    max_bytes: usize,
) -> Result<(), ValidationError> {
    let size = text.len();
    if size > max_bytes {
        return Err(ValidationError::InputTooLarge {
            field,
            size,
            max: max_bytes,
        });
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    validate_non_empty(email, "Email")?;
    if !EMAIL_RE.is_match(email.trim()) {
        return Err(ValidationError::InvalidFormat(
            "Invalid email address".into(),
        ));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    validate_non_empty(phone, "Phone number")?;
    if !PHONE_RE.is_match(phone.trim()) {
        return Err(ValidationError::InvalidFormat(
            "Invalid phone number. Expected: 010-1234-5678".into(),
        ));
    }
    Ok(())
}

pub fn validate_user_id(user_id: &str) -> Result<(), ValidationError> {
    validate_non_empty(user_id, "User ID")?;
    if !USER_ID_RE.is_match(user_id.trim()) {
        return Err(ValidationError::InvalidFormat(
            "User ID must be 3-30 characters: letters, digits, '.', '-', '_'".into(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    validate_non_empty(password, "Password")?;
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::InvalidFormat(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    Ok(())
}

/// Password + confirmation pair
pub fn validate_password_pair(
    password: &str,
    confirmation: &str,
) -> Result<(), ValidationError> {
    validate_password(password)?;
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// ISO calendar date as entered in the birth-date field
pub fn validate_birth_date(raw: &str) -> Result<chrono::NaiveDate, ValidationError> {
    validate_non_empty(raw, "Birth date")?;
    chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidFormat("Birth date must be YYYY-MM-DD".into()))
}
