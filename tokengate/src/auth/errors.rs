//! Authentication error types.

use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Stored hash was not produced by this hasher
    #[error("Malformed password hash")]
    MalformedHash,

    /// Password did not match the stored hash
    #[error("Incorrect Password")]
    InvalidCredentials,

    /// Account not found
    #[error("User doesn't exist. Please signup")]
    NotFound,

    /// Account email already registered
    #[error("User Already Exists")]
    AlreadyExists,

    /// Token signature, structure or kind is wrong
    #[error("Token in not valid!")]
    TokenInvalid,

    /// Token is correctly signed but past its expiry
    #[error("Token has expired")]
    TokenExpired,

    /// Refresh token was already rotated away
    #[error("Refresh token has already been used")]
    StaleRefreshToken,

    /// Session was revoked, superseded or has expired
    #[error("Session has been revoked")]
    SessionRevoked,

    /// Request carries no usable credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// JWT encoding error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Misconfiguration or other unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database, JWT and internal errors are collapsed into a generic message.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_)
            | AuthError::Jwt(_)
            | AuthError::Internal(_)
            | AuthError::HashingFailed
            | AuthError::MalformedHash => "Internal Server Error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the error is an unexpected server-side failure rather than a
    /// caller-correctable condition.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Database(_)
                | AuthError::Jwt(_)
                | AuthError::Internal(_)
                | AuthError::HashingFailed
                | AuthError::MalformedHash
        )
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_internal_details() {
        let err = AuthError::Internal("signing key missing at /etc/secret".to_string());
        assert_eq!(err.client_message(), "Internal Server Error");
        assert!(err.is_internal());
    }

    #[test]
    fn test_client_message_keeps_caller_errors() {
        assert_eq!(AuthError::AlreadyExists.client_message(), "User Already Exists");
        assert_eq!(
            AuthError::NotFound.client_message(),
            "User doesn't exist. Please signup"
        );
        assert!(!AuthError::StaleRefreshToken.is_internal());
    }
}
