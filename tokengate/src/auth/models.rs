//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier embedded in every issued token
pub type TokenId = Uuid;

/// Canonical form of an account email: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Account model
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Build a new account record, normalizing the email.
    pub fn new(email: &str, name: &str, password_hash: String) -> Self {
        Self {
            email: normalize_email(email),
            name: name.trim().to_string(),
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Distinguishes short-lived access tokens from refresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried by both token kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,       // Account email
    pub jti: TokenId,      // Token id
    pub kind: TokenKind,
    pub iat: i64,          // Issued at timestamp
    pub exp: i64,          // Expiration timestamp
}

/// A freshly signed token together with the claims the registry cares about
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: TokenId,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a logout request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    LoggedOut,
    AlreadyLoggedOut,
}

/// Identity attached to a request after bearer-token authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub email: String,
    pub token_id: TokenId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }

    #[test]
    fn test_account_serialization_omits_hash() {
        let account = Account::new("a@x.com", "Alice", "$argon2id$secret".to_string());
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("a@x.com"));
    }

    #[test]
    fn test_token_kind_wire_format() {
        assert_eq!(serde_json::to_string(&TokenKind::Refresh).unwrap(), "\"refresh\"");
    }
}
