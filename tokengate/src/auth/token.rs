//! Signed, self-contained access and refresh tokens.
//!
//! Tokens are HS256 JWTs. Verification pins the algorithm, so a token whose
//! header names any other algorithm (including `none`) is rejected before its
//! claims are looked at.

use super::{
    config::AuthConfig,
    errors::{AuthError, AuthResult},
    models::{IssuedToken, TokenClaims, TokenKind},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use uuid::Uuid;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and verifies signed tokens
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl TokenCodec {
    /// Create a new codec
    ///
    /// # Arguments
    ///
    /// * `secret` - Secret key for JWT signing
    /// * `access_token_duration` - Lifetime of access tokens
    /// * `refresh_token_duration` - Lifetime of refresh tokens
    ///
    /// # Errors
    ///
    /// * `AuthError::Internal` - Empty secret
    pub fn new(
        secret: &str,
        access_token_duration: Duration,
        refresh_token_duration: Duration,
    ) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::Internal("JWT secret is empty".to_string()));
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_token_duration,
            refresh_token_duration,
        })
    }

    /// Create a codec from the authentication configuration
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        Self::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        )
    }

    /// Issue a short-lived access token for `subject`
    pub fn issue_access(&self, subject: &str) -> AuthResult<IssuedToken> {
        self.issue_at(subject, TokenKind::Access, Utc::now())
    }

    /// Issue a long-lived refresh token for `subject`
    pub fn issue_refresh(&self, subject: &str) -> AuthResult<IssuedToken> {
        self.issue_at(subject, TokenKind::Refresh, Utc::now())
    }

    /// Verify a token's signature, structure and expiry
    ///
    /// # Errors
    ///
    /// * `AuthError::TokenExpired` - Correctly signed but past `exp`
    /// * `AuthError::TokenInvalid` - Any other verification failure
    pub fn verify(&self, token: &str) -> AuthResult<TokenClaims> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })
    }

    /// Verify a token and require it to be of the given kind
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> AuthResult<TokenClaims> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            return Err(AuthError::TokenInvalid);
        }
        Ok(claims)
    }

    fn issue_at(
        &self,
        subject: &str,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let duration = match kind {
            TokenKind::Access => self.access_token_duration,
            TokenKind::Refresh => self.refresh_token_duration,
        };
        let expires_at = issued_at + duration;

        let claims = TokenClaims {
            sub: subject.to_string(),
            jti: Uuid::new_v4(),
            kind,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            &self.encoding_key,
        )?;

        Ok(IssuedToken {
            token,
            token_id: claims.jti,
            expires_at,
        })
    }
}
