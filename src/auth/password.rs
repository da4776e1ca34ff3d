/// Password Hashing and Verification (bcrypt)
///
/// Request handlers use the `*_blocking` variants, which run bcrypt on the
/// blocking thread pool instead of the worker serving other requests.

use actix_web::web;
use bcrypt::{hash, verify};

use crate::error::{AppError, ValidationError};

// bcrypt ignores everything past 72 bytes
const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password with the given bcrypt cost
///
/// # Errors
/// Returns error if the password is blank or too long, or if bcrypt fails
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    if password.trim().is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "password".to_string(),
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    hash(password, cost)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against its bcrypt hash
///
/// A hash that cannot be parsed never matches.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match verify(password, password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash could not be verified");
            false
        }
    }
}

/// `hash_password` on the blocking thread pool
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, AppError> {
    web::block(move || hash_password(&password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

/// `verify_password` on the blocking thread pool
pub async fn verify_password_blocking(password: String, password_hash: String) -> bool {
    match web::block(move || verify_password(&password, &password_hash)).await {
        Ok(valid) => valid,
        Err(e) => {
            tracing::error!(error = %e, "Password verification task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_password() {
        let password = "ValidPassword123";
        let hash = hash_password(password, TEST_COST).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("ValidPassword123", TEST_COST).expect("Failed to hash password");

        assert!(verify_password("ValidPassword123", &hash));
        assert!(!verify_password("WrongPassword123", &hash));
    }

    #[test]
    fn test_blank_password_is_rejected() {
        assert!(hash_password("   ", TEST_COST).is_err());
    }

    #[test]
    fn test_too_long_password_is_rejected() {
        let long_password = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(hash_password(&long_password, TEST_COST).is_err());
    }

    #[tokio::test]
    async fn test_blocking_variants_agree_with_sync() {
        let hash = hash_password_blocking("ValidPassword123".to_string(), TEST_COST)
            .await
            .expect("Failed to hash password");

        assert!(verify_password("ValidPassword123", &hash));
        assert!(verify_password_blocking("ValidPassword123".to_string(), hash.clone()).await);
        assert!(!verify_password_blocking("WrongPassword123".to_string(), hash).await);
    }

    #[tokio::test]
    async fn test_blocking_hash_keeps_validation() {
        let result = hash_password_blocking("  ".to_string(), TEST_COST).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_garbage_hash_never_matches() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }
}
