/// Error handling for the authentication core.
///
/// The externally observable taxonomy is deliberately narrow: failed logins,
/// bad tokens, and locked accounts all collapse into `Unauthenticated`, and
/// every flavor of unusable reset link collapses into `InvalidResetLink`.
/// The distinguishing detail is written to the `security` log target only,
/// never returned to the caller.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::validators::ValidationError;

/// Central error type for every operation in the crate.
#[derive(Debug)]
pub enum AuthError {
    /// Bad, missing, or expired access token, a failed login, or a locked
    /// account. Intentionally indistinguishable from the outside.
    Unauthenticated,
    /// Expired, absent, or tampered reset token, or an email mismatch.
    InvalidResetLink,
    /// The identity exists but its account status is not active.
    AccountInactive,
    /// The caller is authenticated but lacks the required capability.
    Forbidden,
    /// An expected single-row update affected zero rows.
    UpdateConflict,
    /// Rejected input (email format, password strength).
    Validation(ValidationError),
    /// Hashing, crypto, or database failure. Aborts the operation; no
    /// partial state is committed.
    Internal(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Unauthenticated => write!(f, "authentication failed"),
            AuthError::InvalidResetLink => write!(f, "reset link is invalid or has expired"),
            AuthError::AccountInactive => write!(f, "account is inactive"),
            AuthError::Forbidden => write!(f, "insufficient permissions"),
            AuthError::UpdateConflict => write!(f, "update affected no rows"),
            AuthError::Validation(e) => write!(f, "{}", e),
            AuthError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl StdError for AuthError {}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        AuthError::Validation(err)
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Internal(format!("database error: {}", err))
    }
}

/// Error envelope returned to HTTP callers.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique id for correlating the response with server-side logs.
    pub error_id: String,
    pub message: String,
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AuthError {
    /// Maps the error to its HTTP rendering. Messages here are generic by
    /// construction; `Internal` never exposes the underlying cause.
    fn render(&self) -> (StatusCode, &'static str, String) {
        match self {
            AuthError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Authentication failed".to_string(),
            ),
            AuthError::InvalidResetLink => (
                StatusCode::BAD_REQUEST,
                "INVALID_RESET_LINK",
                "Reset link is invalid or has expired".to_string(),
            ),
            AuthError::AccountInactive => (
                StatusCode::FORBIDDEN,
                "ACCOUNT_INACTIVE",
                "Account is inactive".to_string(),
            ),
            AuthError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Insufficient permissions".to_string(),
            ),
            AuthError::UpdateConflict => (
                StatusCode::CONFLICT,
                "UPDATE_CONFLICT",
                "The update could not be applied, please retry".to_string(),
            ),
            AuthError::Validation(e) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AuthError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AuthError::Internal(msg) => {
                tracing::error!(error_id = error_id, error = %msg, "internal error");
            }
            AuthError::UpdateConflict => {
                tracing::error!(error_id = error_id, "expected single-row update affected no rows");
            }
            AuthError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "validation error");
            }
            other => {
                tracing::warn!(error_id = error_id, error = %other, "request rejected");
            }
        }
    }
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let (status, code, message) = self.render();
        let body = ErrorResponse::new(error_id, message, code.to_string(), status.as_u16());

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.render().0
    }
}
