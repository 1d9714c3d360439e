//! Authentication module providing signup, login, refresh and logout.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - HS256 JWT access tokens (15-minute expiry by default)
//! - Rotating JWT refresh tokens (48-hour expiry by default) with reuse detection
//! - Bearer-token authentication of protected requests
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokengate::auth::{AuthConfig, AuthManager};
//! use tokengate::db::InMemoryCredentialStore;
//! use tokengate::session::InMemorySessionRegistry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new("jwt_secret_of_at_least_32_characters", "pepper");
//!     let auth = AuthManager::new(
//!         &config,
//!         Arc::new(InMemoryCredentialStore::new()),
//!         Arc::new(InMemorySessionRegistry::from_config(&config)),
//!     )?;
//!
//!     auth.signup("player@example.com", "Player One", "SecurePass123").await?;
//!     let (_, tokens) = auth.login("player@example.com", "SecurePass123").await?;
//!     let user = auth.authenticator().authenticate(&tokens.access_token).await?;
//!     println!("Authenticated {}", user.email);
//!     Ok(())
//! }
//! ```

pub mod authenticator;
pub mod config;
pub mod errors;
pub mod manager;
pub mod models;
pub mod password;
pub mod token;

pub use authenticator::{RequestAuthenticator, bearer_token};
pub use config::{AuthConfig, HashParams};
pub use errors::{AuthError, AuthResult};
pub use manager::AuthManager;
pub use models::{
    Account, AuthenticatedUser, IssuedToken, LogoutOutcome, SessionTokens, TokenClaims, TokenId,
    TokenKind, normalize_email,
};
pub use password::PasswordHasher;
pub use token::TokenCodec;
