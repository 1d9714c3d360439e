//! PostgreSQL credential store tests.
//!
//! Require a running database: `DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::Utc;
use sqlx::PgPool;
use tokengate::auth::{Account, AuthError};
use tokengate::db::{CredentialStore, Database, DatabaseConfig, PgCredentialStore};

/// Helper to connect and prepare the schema
async fn setup_store() -> (PgCredentialStore, PgPool) {
    let config = DatabaseConfig::from_env().expect("DATABASE_URL must be set");
    let db = Database::new(&config)
        .await
        .expect("Failed to connect to test database");

    let store = PgCredentialStore::new(db.pool().clone());
    store.ensure_schema().await.expect("Failed to create schema");
    (store, db.pool().clone())
}

/// Remove a test account directly; the store itself never deletes
async fn cleanup(pool: &PgPool, email: &str) {
    sqlx::query("DELETE FROM accounts WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await
        .expect("Failed to clean up test account");
}

fn unique_email(prefix: &str) -> String {
    format!("{}_{}@test.com", prefix, uuid::Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_and_get() {
    let (store, pool) = setup_store().await;
    let email = unique_email("create");

    let account = Account::new(&email, "Alice", "$argon2id$v=19$stub".to_string());
    store.create(account).await.unwrap();

    let loaded = store.get(&email.to_uppercase()).await.unwrap();
    assert_eq!(loaded.email, email);
    assert_eq!(loaded.name, "Alice");
    assert!(loaded.created_at <= Utc::now());
    assert!(store.exists(&email).await.unwrap());

    cleanup(&pool, &email).await;
    assert!(!store.exists(&email).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_create() {
    let (store, pool) = setup_store().await;
    let email = unique_email("dup");

    store
        .create(Account::new(&email, "Alice", "hash".to_string()))
        .await
        .unwrap();
    let result = store
        .create(Account::new(&email, "Alice Again", "hash".to_string()))
        .await;

    assert!(matches!(result, Err(AuthError::AlreadyExists)));
    cleanup(&pool, &email).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_get_missing() {
    let (store, _pool) = setup_store().await;

    let result = store.get(&unique_email("missing")).await;
    assert!(matches!(result, Err(AuthError::NotFound)));
}
