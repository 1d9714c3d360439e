//! Authentication configuration.

use chrono::Duration;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify tokens
    pub jwt_secret: String,

    /// Server-side pepper appended to passwords before hashing
    pub password_pepper: String,

    /// Lifetime of access tokens
    pub access_token_ttl: Duration,

    /// Lifetime of refresh tokens, and therefore of a session
    pub refresh_token_ttl: Duration,

    /// Revoke the whole session when an already-rotated refresh token is presented
    pub revoke_on_refresh_reuse: bool,

    /// Password hashing cost
    pub hash_params: HashParams,
}

impl AuthConfig {
    /// Create a configuration with default lifetimes
    ///
    /// # Arguments
    ///
    /// * `jwt_secret` - Secret key for JWT signing
    /// * `password_pepper` - Server-side pepper for password hashing
    pub fn new(jwt_secret: impl Into<String>, password_pepper: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            password_pepper: password_pepper.into(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::hours(48),
            revoke_on_refresh_reuse: true,
            hash_params: HashParams::default(),
        }
    }

    /// Development configuration with throwaway secrets
    pub fn development() -> Self {
        Self::new(
            "development_jwt_secret_change_in_production",
            "development_pepper",
        )
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::development()
    }
}
