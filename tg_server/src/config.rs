//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use chrono::Duration;
use std::net::{Ipv4Addr, SocketAddr};
use tokengate::{auth::AuthConfig, db::DatabaseConfig};

const DEFAULT_BIND: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 6969);

/// Longest accepted lifetime for either token
const MAX_TOKEN_TTL_DAYS: i64 = 365;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration; `None` selects the in-memory credential store
    pub database: Option<DatabaseConfig>,
    /// Secrets, token lifetimes and reuse policy
    pub auth: AuthConfig,
    /// How often expired sessions are purged
    pub reaper_interval: std::time::Duration,
    /// Prometheus scrape endpoint, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Mark token cookies `Secure`; disable only for plain-HTTP development
    pub secure_cookies: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_opt("SERVER_BIND")?.unwrap_or(DEFAULT_BIND),
        };

        let database = match database_url_override {
            Some(url) => Some(DatabaseConfig {
                database_url: url,
                ..DatabaseConfig::from_env().unwrap_or_else(|| DatabaseConfig::with_url(""))
            }),
            None => DatabaseConfig::from_env(),
        };

        // Security configuration (REQUIRED)
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let password_pepper =
            std::env::var("PASSWORD_PEPPER").map_err(|_| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        let auth = AuthConfig {
            access_token_ttl: parse_ttl_env("ACCESS_TOKEN_TTL_SECS", 900)?,
            refresh_token_ttl: parse_ttl_env("REFRESH_TOKEN_TTL_SECS", 172_800)?,
            revoke_on_refresh_reuse: parse_env_or("REVOKE_ON_REFRESH_REUSE", true),
            ..AuthConfig::new(jwt_secret, password_pepper)
        };

        Ok(ServerConfig {
            bind,
            database,
            auth,
            reaper_interval: std::time::Duration::from_secs(parse_env_or(
                "SESSION_REAPER_INTERVAL_SECS",
                60,
            )),
            metrics_bind: parse_env_opt("METRICS_BIND")?,
            secure_cookies: parse_env_or("SECURE_COOKIES", true),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if self.auth.password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        if self.auth.access_token_ttl <= Duration::zero() {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_TTL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        let max_ttl = Duration::days(MAX_TOKEN_TTL_DAYS);
        for (var, ttl) in [
            ("ACCESS_TOKEN_TTL_SECS", self.auth.access_token_ttl),
            ("REFRESH_TOKEN_TTL_SECS", self.auth.refresh_token_ttl),
        ] {
            if ttl > max_ttl {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: format!("Must be at most {}s", max_ttl.num_seconds()),
                });
            }
        }

        if self.auth.refresh_token_ttl <= self.auth.access_token_ttl {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_TTL_SECS".to_string(),
                reason: format!(
                    "Must be greater than access token TTL ({}s)",
                    self.auth.access_token_ttl.num_seconds()
                ),
            });
        }

        if self.reaper_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "SESSION_REAPER_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let Some(database) = &self.database
            && database.database_url.is_empty()
        {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a token lifetime in seconds, rejecting values too large to represent
fn parse_ttl_env(key: &str, default_secs: i64) -> Result<Duration, ConfigError> {
    let secs = parse_env_or(key, default_secs);

    Duration::try_seconds(secs).ok_or_else(|| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("{secs}s is out of range"),
    })
}

/// Parse an optional variable, rejecting values that are set but malformed
fn parse_env_opt<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("Cannot parse '{value}'"),
        }),
        Err(_) => Ok(None),
    }
}
