//! Credential store trait and its PostgreSQL implementation.
//!
//! The trait is the seam `AuthManager` depends on; the in-memory store in
//! [`super::memory`] implements the same contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::auth::{Account, AuthError, AuthResult, normalize_email};

/// Trait for account credential storage
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new account
    ///
    /// # Errors
    ///
    /// * `AuthError::AlreadyExists` - An account with the same normalized email exists
    async fn create(&self, account: Account) -> AuthResult<()>;

    /// Fetch an account by email
    ///
    /// # Errors
    ///
    /// * `AuthError::NotFound` - No such account
    async fn get(&self, email: &str) -> AuthResult<Account>;

    /// Whether an account exists for `email`
    async fn exists(&self, email: &str) -> AuthResult<bool>;
}

/// Schema for the `accounts` table
pub const ACCOUNTS_SCHEMA: &str = include_str!("../../migrations/001_create_accounts.sql");

/// PostgreSQL implementation of `CredentialStore`
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `accounts` table if it does not exist yet
    pub async fn ensure_schema(&self) -> AuthResult<()> {
        sqlx::raw_sql(ACCOUNTS_SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, account: Account) -> AuthResult<()> {
        let result = sqlx::query(
            "INSERT INTO accounts (email, name, password_hash, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(normalize_email(&account.email))
        .bind(&account.name)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AuthError::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, email: &str) -> AuthResult<Account> {
        let row = sqlx::query(
            "SELECT email, name, password_hash, created_at FROM accounts WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthError::NotFound)?;

        Ok(Account {
            email: row.get("email"),
            name: row.get("name"),
            password_hash: row.get("password_hash"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
        })
    }

    async fn exists(&self, email: &str) -> AuthResult<bool> {
        let row = sqlx::query("SELECT 1 FROM accounts WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
