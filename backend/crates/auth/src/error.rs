//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::PasswordHashError;
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password (never says which)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Email already registered
    #[error("Email already registered")]
    DuplicateEmail,

    /// Input rejected by a value object
    #[error("Validation failed: {0}")]
    Validation(AppError),

    /// User repository could not be reached or failed mid-query
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[source] AppError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials => ErrorKind::Unauthorized,
            AuthError::DuplicateEmail => ErrorKind::Conflict,
            AuthError::Validation(_) => ErrorKind::BadRequest,
            AuthError::StorageUnavailable(_) => ErrorKind::ServiceUnavailable,
            AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Message that is safe to flash back to the visitor
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password",
            AuthError::DuplicateEmail => "Email already registered",
            AuthError::Validation(_) => "Please check the form and try again",
            AuthError::StorageUnavailable(_) | AuthError::Internal(_) => {
                "Something went wrong, please try again later"
            }
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::Validation(err) => AppError::new(err.kind(), err.message().to_string()),
            _ => AppError::new(self.kind(), self.user_message()),
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            AuthError::StorageUnavailable(e) => {
                tracing::error!(error = %e, "Auth storage error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        let app_err = AppError::from(err);
        match app_err.kind() {
            ErrorKind::Conflict => AuthError::DuplicateEmail,
            _ => AuthError::StorageUnavailable(app_err),
        }
    }
}

impl From<PasswordHashError> for AuthError {
    fn from(err: PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_storage_unavailable() {
        let err = AuthError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AuthError::StorageUnavailable(_)));
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AuthError::StorageUnavailable(AppError::service_unavailable("pg down"));
        assert!(!err.user_message().contains("pg"));
        assert_eq!(err.to_app_error().kind(), ErrorKind::ServiceUnavailable);
    }

    #[test]
    fn test_validation_keeps_value_object_message() {
        let err = AuthError::Validation(AppError::bad_request("Invalid email format"));
        assert_eq!(err.to_app_error().message(), "Invalid email format");
    }
}
