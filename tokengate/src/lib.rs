//! # tokengate
//!
//! Credential-and-token core for authenticating end users.
//!
//! The crate hashes passwords, issues and verifies signed access/refresh
//! tokens, and keeps a registry of which token ids are currently honored so
//! that logout, login-elsewhere and refresh-token rotation take effect
//! immediately.
//!
//! ## Core Modules
//!
//! - [`auth`]: password hashing, token codec, [`auth::AuthManager`] and the request authenticator
//! - [`db`]: the [`db::CredentialStore`] seam with PostgreSQL and in-memory stores
//! - [`session`]: the [`session::SessionRegistry`] seam and its in-memory implementation
//!
//! ## Session lifecycle
//!
//! ```text
//! no_session --login--> active --refresh--> rotated --refresh--> rotated ...
//!                          |                    |
//!                          +------logout--------+--> revoked
//!                          +--stale refresh-----+--> revoked
//! ```

pub mod auth;
pub mod db;
pub mod session;

pub use auth::{AuthConfig, AuthError, AuthManager, AuthResult};
