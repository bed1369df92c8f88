/// Password Hashing and Verification
///
/// Handles credential hashing with bcrypt and password strength validation.
/// The cost factor comes from configuration so operators can tune it; a
/// hashing failure is fatal to the calling operation and never degrades to
/// a weaker scheme.

use bcrypt::{hash, verify};

use crate::error::AuthError;
use crate::validators::ValidationError;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a password using bcrypt with the configured cost.
///
/// # Errors
/// Returns error if:
/// - Password fails the strength requirements
/// - Bcrypt hashing fails (e.g. OS entropy unavailable)
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    validate_password_strength(password)?;

    hash(password, cost).map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its stored bcrypt hash.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, AuthError> {
    verify(password, hashed)
        .map_err(|e| AuthError::Internal(format!("Password verification failed: {}", e)))
}

/// Off-pool variant for request handlers. Bcrypt is CPU-bound, so it runs
/// on the blocking pool rather than stalling the async workers under
/// concurrent logins.
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AuthError::Internal(format!("Hashing task failed: {}", e)))?
}

/// Off-pool variant of [`verify_password`].
pub async fn verify_password_blocking(
    password: String,
    hashed: String,
) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hashed))
        .await
        .map_err(|e| AuthError::Internal(format!("Verification task failed: {}", e)))?
}

/// Validate password strength requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters (bcrypt limitation and DoS prevention)
/// - At least one digit, one lowercase, and one uppercase letter
fn validate_password_strength(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(ValidationError::TooShort(
            "password",
            MIN_PASSWORD_LENGTH,
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::Validation(ValidationError::TooLong(
            "password",
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AuthError::Validation(ValidationError::WeakPassword));
    }

    Ok(())
}
