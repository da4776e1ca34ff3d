/// Input validators for account fields
///
/// Presence, length and format checks applied before anything reaches the
/// account store. Values are returned trimmed (and normalised where noted).

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MIN_USER_NAME_LENGTH: usize = 3;
const MAX_USER_NAME_LENGTH: usize = 30;
const MAX_FULL_NAME_LENGTH: usize = 256;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    static ref USER_NAME_REGEX: Regex = Regex::new(r"^[a-z0-9_.]+$").unwrap();
}

/// Require a non-blank value and return it trimmed
pub fn required(field: &str, value: Option<&str>) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::EmptyField(field.to_string())),
    }
}

/// Validates email address format and length
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a user name; returns it lower-cased
pub fn is_valid_user_name(user_name: &str) -> Result<String, ValidationError> {
    let normalised = user_name.trim().to_lowercase();

    if normalised.is_empty() {
        return Err(ValidationError::EmptyField("user_name".to_string()));
    }

    if normalised.len() < MIN_USER_NAME_LENGTH {
        return Err(ValidationError::TooShort(
            "user_name".to_string(),
            MIN_USER_NAME_LENGTH,
        ));
    }

    if normalised.len() > MAX_USER_NAME_LENGTH {
        return Err(ValidationError::TooLong(
            "user_name".to_string(),
            MAX_USER_NAME_LENGTH,
        ));
    }

    if !USER_NAME_REGEX.is_match(&normalised) {
        return Err(ValidationError::InvalidFormat("user_name".to_string()));
    }

    Ok(normalised)
}

/// Validates a display name
pub fn is_valid_full_name(full_name: &str) -> Result<String, ValidationError> {
    let trimmed = full_name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("full_name".to_string()));
    }

    if trimmed.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(ValidationError::TooLong(
            "full_name".to_string(),
            MAX_FULL_NAME_LENGTH,
        ));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat("full_name".to_string()));
    }

    Ok(trimmed.to_string())
}
