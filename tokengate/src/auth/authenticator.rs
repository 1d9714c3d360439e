//! Bearer-token authentication for protected requests.

use super::{
    errors::{AuthError, AuthResult},
    models::{AuthenticatedUser, TokenKind},
    token::TokenCodec,
};
use crate::session::SessionRegistry;
use std::sync::Arc;

/// Extract the token from an `Authorization` header value of the form `Bearer <token>`
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Verifies access tokens against the codec and the session registry
#[derive(Clone)]
pub struct RequestAuthenticator {
    codec: Arc<TokenCodec>,
    sessions: Arc<dyn SessionRegistry>,
}

impl RequestAuthenticator {
    pub fn new(codec: Arc<TokenCodec>, sessions: Arc<dyn SessionRegistry>) -> Self {
        Self { codec, sessions }
    }

    /// Authenticate a raw access token
    ///
    /// Rejects tokens that fail verification and tokens whose session was
    /// revoked, rotated or superseded. Nothing is mutated.
    ///
    /// # Errors
    ///
    /// * `AuthError::Unauthorized` - Token is not currently honored
    pub async fn authenticate(&self, token: &str) -> AuthResult<AuthenticatedUser> {
        let user = self.identify(token)?;

        if !self.sessions.is_active(&user.email, user.token_id).await? {
            return Err(AuthError::Unauthorized);
        }

        Ok(user)
    }

    /// Check signature, expiry and kind only, without consulting the registry
    pub fn identify(&self, token: &str) -> AuthResult<AuthenticatedUser> {
        let claims = self
            .codec
            .verify_kind(token, TokenKind::Access)
            .map_err(|_| AuthError::Unauthorized)?;

        Ok(AuthenticatedUser {
            email: claims.sub,
            token_id: claims.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionRegistry;
    use chrono::Duration;

    fn setup() -> (Arc<TokenCodec>, Arc<InMemorySessionRegistry>, RequestAuthenticator) {
        let codec = Arc::new(
            TokenCodec::new(
                "test_secret_key_for_jwt_signing_only",
                Duration::minutes(15),
                Duration::hours(48),
            )
            .unwrap(),
        );
        let sessions = Arc::new(InMemorySessionRegistry::default());
        let authenticator = RequestAuthenticator::new(codec.clone(), sessions.clone());
        (codec, sessions, authenticator)
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer   abc"), Some("abc"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc.def.ghi"), None);
    }

    #[tokio::test]
    async fn test_authenticate_registered_token() {
        let (codec, sessions, authenticator) = setup();
        let access = codec.issue_access("a@x.com").unwrap();
        let refresh = codec.issue_refresh("a@x.com").unwrap();
        sessions
            .register("a@x.com", access.token_id, refresh.token_id, refresh.expires_at)
            .await
            .unwrap();

        let user = authenticator.authenticate(&access.token).await.unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.token_id, access.token_id);
    }

    #[tokio::test]
    async fn test_authenticate_unregistered_token() {
        let (codec, _, authenticator) = setup();
        let access = codec.issue_access("a@x.com").unwrap();

        assert!(matches!(
            authenticator.authenticate(&access.token).await,
            Err(AuthError::Unauthorized)
        ));
        // Signature alone is still fine
        assert!(authenticator.identify(&access.token).is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_refresh_token() {
        let (codec, sessions, authenticator) = setup();
        let access = codec.issue_access("a@x.com").unwrap();
        let refresh = codec.issue_refresh("a@x.com").unwrap();
        sessions
            .register("a@x.com", access.token_id, refresh.token_id, refresh.expires_at)
            .await
            .unwrap();

        assert!(matches!(
            authenticator.authenticate(&refresh.token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_revoked_session() {
        let (codec, sessions, authenticator) = setup();
        let access = codec.issue_access("a@x.com").unwrap();
        let refresh = codec.issue_refresh("a@x.com").unwrap();
        sessions
            .register("a@x.com", access.token_id, refresh.token_id, refresh.expires_at)
            .await
            .unwrap();
        sessions.revoke("a@x.com").await.unwrap();

        assert!(matches!(
            authenticator.authenticate(&access.token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_garbage() {
        let (_, _, authenticator) = setup();
        assert!(matches!(
            authenticator.authenticate("garbage").await,
            Err(AuthError::Unauthorized)
        ));
    }
}
