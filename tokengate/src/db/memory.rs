//! In-process credential store.

use async_trait::async_trait;
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};
use tokio::sync::RwLock;

use super::repository::CredentialStore;
use crate::auth::{Account, AuthError, AuthResult, normalize_email};

/// Credential store backed by a `HashMap` keyed by normalized email
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create(&self, mut account: Account) -> AuthResult<()> {
        account.email = normalize_email(&account.email);

        match self.accounts.write().await.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(AuthError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(account);
                Ok(())
            }
        }
    }

    async fn get(&self, email: &str) -> AuthResult<Account> {
        self.accounts
            .read()
            .await
            .get(&normalize_email(email))
            .cloned()
            .ok_or(AuthError::NotFound)
    }

    async fn exists(&self, email: &str) -> AuthResult<bool> {
        Ok(self
            .accounts
            .read()
            .await
            .contains_key(&normalize_email(email)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str) -> Account {
        Account::new(email, "Test User", "$argon2id$v=19$stub".to_string())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryCredentialStore::new();

        store.create(account("a@x.com")).await.unwrap();

        let found = store.get("a@x.com").await.unwrap();
        assert_eq!(found.email, "a@x.com");
        assert_eq!(found.name, "Test User");
        assert!(store.exists("a@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemoryCredentialStore::new();
        assert!(matches!(
            store.get("nobody@x.com").await,
            Err(AuthError::NotFound)
        ));
        assert!(!store.exists("nobody@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_email_is_case_insensitive() {
        let store = InMemoryCredentialStore::new();
        store.create(account("Alice@X.com")).await.unwrap();

        assert!(store.exists("alice@x.com").await.unwrap());
        assert!(store.get("ALICE@x.COM").await.is_ok());
        assert!(matches!(
            store.create(account("alice@x.com")).await,
            Err(AuthError::AlreadyExists)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_single_winner() {
        let store = InMemoryCredentialStore::new();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(account("race@x.com")).await
            }));
        }

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => created += 1,
                Err(AuthError::AlreadyExists) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(conflicts, 9);
        assert_eq!(store.len().await, 1);
    }
}
