//! Authentication manager implementation.

use super::{
    authenticator::RequestAuthenticator,
    config::AuthConfig,
    errors::{AuthError, AuthResult},
    models::{Account, LogoutOutcome, SessionTokens, TokenKind, normalize_email},
    password::PasswordHasher,
    token::TokenCodec,
};
use crate::{
    db::CredentialStore,
    session::{RevokeOutcome, SessionRegistry},
};
use log::{info, warn};
use std::sync::Arc;

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionRegistry>,
    hasher: PasswordHasher,
    codec: Arc<TokenCodec>,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `config` - Secrets, token lifetimes and hashing cost
    /// * `credentials` - Account storage
    /// * `sessions` - Session registry
    ///
    /// # Errors
    ///
    /// * `AuthError::Internal` - Empty JWT secret or invalid hashing parameters
    pub fn new(
        config: &AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionRegistry>,
    ) -> AuthResult<Self> {
        let hasher = PasswordHasher::with_params(config.password_pepper.clone(), config.hash_params)?;
        let codec = TokenCodec::from_config(config)?;

        Ok(Self {
            credentials,
            sessions,
            hasher,
            codec: Arc::new(codec),
        })
    }

    /// Bearer-token authenticator sharing this manager's codec and registry
    pub fn authenticator(&self) -> RequestAuthenticator {
        RequestAuthenticator::new(self.codec.clone(), self.sessions.clone())
    }

    /// Session registry backing this manager
    pub fn sessions(&self) -> Arc<dyn SessionRegistry> {
        self.sessions.clone()
    }

    /// Register a new account
    ///
    /// # Arguments
    ///
    /// * `email` - Account identifier, matched case-insensitively
    /// * `name` - Display name
    /// * `password` - Plaintext password; only its hash is stored
    ///
    /// # Errors
    ///
    /// * `AuthError::AlreadyExists` - Email already registered
    /// * `AuthError::HashingFailed` - Password could not be hashed
    pub async fn signup(&self, email: &str, name: &str, password: &str) -> AuthResult<Account> {
        if self.credentials.exists(email).await? {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.hasher.hash(password)?;
        let account = Account::new(email, name, password_hash);

        // A concurrent signup may still win between `exists` and `create`
        self.credentials.create(account.clone()).await?;

        info!("Created account {}", account.email);
        Ok(account)
    }

    /// Login with email and password
    ///
    /// # Returns
    ///
    /// * `AuthResult<(Account, SessionTokens)>` - Account and a fresh token pair
    ///
    /// # Errors
    ///
    /// * `AuthError::NotFound` - Account doesn't exist
    /// * `AuthError::InvalidCredentials` - Incorrect password
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<(Account, SessionTokens)> {
        let account = self.credentials.get(email).await?;

        if !self.hasher.verify(&account.password_hash, password)? {
            warn!("Failed login for {}", account.email);
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.create_session(&account.email).await?;

        info!("{} logged in", account.email);
        Ok((account, tokens))
    }

    /// Issue a token pair and register it as the subject's session
    async fn create_session(&self, subject: &str) -> AuthResult<SessionTokens> {
        let access = self.codec.issue_access(subject)?;
        let refresh = self.codec.issue_refresh(subject)?;

        self.sessions
            .register(subject, access.token_id, refresh.token_id, refresh.expires_at)
            .await?;

        Ok(SessionTokens {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }

    /// Exchange the current token pair for a new one
    ///
    /// # Arguments
    ///
    /// * `access_token` - Access token of the current pair
    /// * `refresh_token` - Refresh token of the current pair
    ///
    /// # Errors
    ///
    /// * `AuthError::TokenInvalid` / `AuthError::TokenExpired` - A token fails verification,
    ///   has the wrong kind, or the two tokens name different subjects
    /// * `AuthError::StaleRefreshToken` - Refresh token was already rotated away
    /// * `AuthError::SessionRevoked` - Session was logged out, superseded or expired
    pub async fn refresh(&self, access_token: &str, refresh_token: &str) -> AuthResult<SessionTokens> {
        let access = self.codec.verify_kind(access_token, TokenKind::Access)?;
        let refresh = self.codec.verify_kind(refresh_token, TokenKind::Refresh)?;

        if access.sub != refresh.sub {
            return Err(AuthError::TokenInvalid);
        }
        let subject = access.sub.as_str();

        // `rotate` checks liveness and staleness under the registry lock
        let new_access = self.codec.issue_access(subject)?;
        let new_refresh = self.codec.issue_refresh(subject)?;

        self.sessions
            .rotate(
                subject,
                refresh.jti,
                new_access.token_id,
                new_refresh.token_id,
                new_refresh.expires_at,
            )
            .await?;

        Ok(SessionTokens {
            access_token: new_access.token,
            refresh_token: new_refresh.token,
        })
    }

    /// Look up an account by email
    pub async fn account(&self, email: &str) -> AuthResult<Account> {
        self.credentials.get(email).await
    }

    /// Logout the session an access token belongs to
    ///
    /// The token must carry a valid signature and be unexpired. A token that
    /// no longer belongs to the live session (superseded by a later login or
    /// rotated away by a refresh) is refused with `Unauthorized` and leaves
    /// that session alone. A missing or already revoked session is not an
    /// error; the outcome says which case applied.
    pub async fn logout(&self, access_token: &str) -> AuthResult<LogoutOutcome> {
        let claims = self
            .codec
            .verify_kind(access_token, TokenKind::Access)
            .map_err(|_| AuthError::Unauthorized)?;
        let subject = normalize_email(&claims.sub);

        match self.sessions.revoke_holding(&subject, claims.jti).await? {
            RevokeOutcome::Revoked => {
                info!("{} logged out", subject);
                Ok(LogoutOutcome::LoggedOut)
            }
            RevokeOutcome::NotLive => Ok(LogoutOutcome::AlreadyLoggedOut),
            RevokeOutcome::TokenMismatch => {
                warn!("Logout for {} with a token the session no longer holds", subject);
                Err(AuthError::Unauthorized)
            }
        }
    }
}
