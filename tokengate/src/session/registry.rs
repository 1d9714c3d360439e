//! Session registry: which token ids are currently honored for each subject.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use super::models::{RevokeOutcome, Session, SessionStatus};
use crate::auth::{AuthConfig, AuthError, AuthResult, TokenId};

/// Trait for session registry operations
///
/// Implementations must make `register`, `rotate` and `revoke` on the same
/// subject linearizable: of two concurrent rotations presenting the same
/// refresh id, exactly one succeeds.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Create an active session, superseding any prior session for `subject`
    async fn register(
        &self,
        subject: &str,
        access_token_id: TokenId,
        refresh_token_id: TokenId,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Whether `token_id` belongs to the subject's live session
    async fn is_active(&self, subject: &str, token_id: TokenId) -> AuthResult<bool>;

    /// Replace the session's token pair
    ///
    /// # Errors
    ///
    /// * `AuthError::StaleRefreshToken` - `old_refresh_token_id` is not the stored refresh id
    /// * `AuthError::SessionRevoked` - No live session for `subject`
    async fn rotate(
        &self,
        subject: &str,
        old_refresh_token_id: TokenId,
        new_access_token_id: TokenId,
        new_refresh_token_id: TokenId,
        new_expires_at: DateTime<Utc>,
    ) -> AuthResult<()>;

    /// Revoke the subject's session
    ///
    /// Returns `false` when there was no live session to revoke.
    async fn revoke(&self, subject: &str) -> AuthResult<bool>;

    /// Revoke the subject's session only if it currently holds `token_id`
    ///
    /// A live session holding other ids is left untouched.
    async fn revoke_holding(&self, subject: &str, token_id: TokenId) -> AuthResult<RevokeOutcome>;

    /// Remove sessions whose expiry is before `now`, returning how many were removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<usize>;

    /// Number of live sessions
    async fn active_count(&self) -> AuthResult<usize>;
}

/// In-process session registry keyed by subject
#[derive(Clone)]
pub struct InMemorySessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    revoke_on_reuse: bool,
}

impl Default for InMemorySessionRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl InMemorySessionRegistry {
    /// Create a new registry
    ///
    /// # Arguments
    ///
    /// * `revoke_on_reuse` - Revoke the session when a stale refresh token is presented
    pub fn new(revoke_on_reuse: bool) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            revoke_on_reuse,
        }
    }

    /// Create a registry honoring `AuthConfig::revoke_on_refresh_reuse`
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.revoke_on_refresh_reuse)
    }

    /// Snapshot of the subject's session, if any
    pub async fn session(&self, subject: &str) -> Option<Session> {
        self.sessions.read().await.get(subject).cloned()
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn register(
        &self,
        subject: &str,
        access_token_id: TokenId,
        refresh_token_id: TokenId,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        let session = Session::new(subject, access_token_id, refresh_token_id, expires_at);
        let previous = self
            .sessions
            .write()
            .await
            .insert(subject.to_string(), session);

        if previous.is_some_and(|s| s.is_live(Utc::now())) {
            debug!("New login for {} supersedes the previous session", subject);
        }
        Ok(())
    }

    async fn is_active(&self, subject: &str, token_id: TokenId) -> AuthResult<bool> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(subject)
            .is_some_and(|s| s.is_live(Utc::now()) && s.holds(token_id)))
    }

    async fn rotate(
        &self,
        subject: &str,
        old_refresh_token_id: TokenId,
        new_access_token_id: TokenId,
        new_refresh_token_id: TokenId,
        new_expires_at: DateTime<Utc>,
    ) -> AuthResult<()> {
        // Check and swap under one write lock
        let mut sessions = self.sessions.write().await;

        let session = match sessions.get_mut(subject) {
            Some(session) if session.is_live(Utc::now()) => session,
            _ => return Err(AuthError::SessionRevoked),
        };

        if !session.is_current_refresh(old_refresh_token_id) {
            if self.revoke_on_reuse {
                session.status = SessionStatus::Revoked;
                warn!(
                    "Refresh token reuse detected for {}; session revoked",
                    subject
                );
            } else {
                warn!("Stale refresh token presented for {}", subject);
            }
            return Err(AuthError::StaleRefreshToken);
        }

        session.access_token_id = new_access_token_id;
        session.refresh_token_id = new_refresh_token_id;
        session.expires_at = new_expires_at;
        session.status = SessionStatus::Rotated;
        session.rotations += 1;

        Ok(())
    }

    async fn revoke(&self, subject: &str) -> AuthResult<bool> {
        let mut sessions = self.sessions.write().await;

        match sessions.get_mut(subject) {
            Some(session) if session.is_live(Utc::now()) => {
                session.status = SessionStatus::Revoked;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_holding(&self, subject: &str, token_id: TokenId) -> AuthResult<RevokeOutcome> {
        let mut sessions = self.sessions.write().await;

        match sessions.get_mut(subject) {
            Some(session) if session.is_live(Utc::now()) => {
                if session.holds(token_id) {
                    session.status = SessionStatus::Revoked;
                    Ok(RevokeOutcome::Revoked)
                } else {
                    Ok(RevokeOutcome::TokenMismatch)
                }
            }
            _ => Ok(RevokeOutcome::NotLive),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - sessions.len())
    }

    async fn active_count(&self) -> AuthResult<usize> {
        let now = Utc::now();
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_live(now))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn later() -> DateTime<Utc> {
        Utc::now() + Duration::hours(1)
    }

    #[tokio::test]
    async fn test_register_and_is_active() {
        let registry = InMemorySessionRegistry::default();
        let (access, refresh) = (Uuid::new_v4(), Uuid::new_v4());

        registry
            .register("a@x.com", access, refresh, later())
            .await
            .unwrap();

        assert!(registry.is_active("a@x.com", access).await.unwrap());
        assert!(registry.is_active("a@x.com", refresh).await.unwrap());
        assert!(!registry.is_active("a@x.com", Uuid::new_v4()).await.unwrap());
        assert!(!registry.is_active("b@x.com", access).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_supersedes_previous_session() {
        let registry = InMemorySessionRegistry::default();
        let old_access = Uuid::new_v4();
        registry
            .register("a@x.com", old_access, Uuid::new_v4(), later())
            .await
            .unwrap();

        let new_access = Uuid::new_v4();
        registry
            .register("a@x.com", new_access, Uuid::new_v4(), later())
            .await
            .unwrap();

        assert!(!registry.is_active("a@x.com", old_access).await.unwrap());
        assert!(registry.is_active("a@x.com", new_access).await.unwrap());
        assert_eq!(registry.active_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_inactive() {
        let registry = InMemorySessionRegistry::default();
        let access = Uuid::new_v4();
        registry
            .register(
                "a@x.com",
                access,
                Uuid::new_v4(),
                Utc::now() - Duration::seconds(1),
            )
            .await
            .unwrap();

        assert!(!registry.is_active("a@x.com", access).await.unwrap());
        assert_eq!(registry.active_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rotate_swaps_ids() {
        let registry = InMemorySessionRegistry::default();
        let (access, refresh) = (Uuid::new_v4(), Uuid::new_v4());
        registry
            .register("a@x.com", access, refresh, later())
            .await
            .unwrap();

        let (new_access, new_refresh) = (Uuid::new_v4(), Uuid::new_v4());
        registry
            .rotate("a@x.com", refresh, new_access, new_refresh, later())
            .await
            .unwrap();

        assert!(!registry.is_active("a@x.com", access).await.unwrap());
        assert!(!registry.is_active("a@x.com", refresh).await.unwrap());
        assert!(registry.is_active("a@x.com", new_access).await.unwrap());
        assert!(registry.is_active("a@x.com", new_refresh).await.unwrap());

        let session = registry.session("a@x.com").await.unwrap();
        assert_eq!(session.status, SessionStatus::Rotated);
        assert_eq!(session.rotations, 1);
    }

    #[tokio::test]
    async fn test_stale_refresh_revokes_session() {
        let registry = InMemorySessionRegistry::default();
        let refresh = Uuid::new_v4();
        registry
            .register("a@x.com", Uuid::new_v4(), refresh, later())
            .await
            .unwrap();

        let (new_access, new_refresh) = (Uuid::new_v4(), Uuid::new_v4());
        registry
            .rotate("a@x.com", refresh, new_access, new_refresh, later())
            .await
            .unwrap();

        let replay = registry
            .rotate("a@x.com", refresh, Uuid::new_v4(), Uuid::new_v4(), later())
            .await;
        assert!(matches!(replay, Err(AuthError::StaleRefreshToken)));

        // The legitimate holder is cut off too
        assert!(!registry.is_active("a@x.com", new_access).await.unwrap());
        let next = registry
            .rotate("a@x.com", new_refresh, Uuid::new_v4(), Uuid::new_v4(), later())
            .await;
        assert!(matches!(next, Err(AuthError::SessionRevoked)));
    }

    #[tokio::test]
    async fn test_stale_refresh_without_revocation() {
        let registry = InMemorySessionRegistry::new(false);
        let refresh = Uuid::new_v4();
        registry
            .register("a@x.com", Uuid::new_v4(), refresh, later())
            .await
            .unwrap();

        let new_refresh = Uuid::new_v4();
        registry
            .rotate("a@x.com", refresh, Uuid::new_v4(), new_refresh, later())
            .await
            .unwrap();

        let replay = registry
            .rotate("a@x.com", refresh, Uuid::new_v4(), Uuid::new_v4(), later())
            .await;
        assert!(matches!(replay, Err(AuthError::StaleRefreshToken)));
        assert!(registry.is_active("a@x.com", new_refresh).await.unwrap());
    }

    #[tokio::test]
    async fn test_rotate_without_session() {
        let registry = InMemorySessionRegistry::default();
        let result = registry
            .rotate(
                "nobody@x.com",
                Uuid::new_v4(),
                Uuid::new_v4(),
                Uuid::new_v4(),
                later(),
            )
            .await;
        assert!(matches!(result, Err(AuthError::SessionRevoked)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rotation_single_winner() {
        let registry = Arc::new(InMemorySessionRegistry::new(false));
        let refresh = Uuid::new_v4();
        registry
            .register("a@x.com", Uuid::new_v4(), refresh, later())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .rotate("a@x.com", refresh, Uuid::new_v4(), Uuid::new_v4(), later())
                    .await
            }));
        }

        let mut wins = 0;
        let mut stale = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => wins += 1,
                Err(AuthError::StaleRefreshToken) => stale += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(stale, 7);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let registry = InMemorySessionRegistry::default();
        let access = Uuid::new_v4();
        registry
            .register("a@x.com", access, Uuid::new_v4(), later())
            .await
            .unwrap();

        assert!(registry.revoke("a@x.com").await.unwrap());
        assert!(!registry.is_active("a@x.com", access).await.unwrap());
        assert!(!registry.revoke("a@x.com").await.unwrap());
        assert!(!registry.revoke("nobody@x.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_holding_requires_current_ids() {
        let registry = InMemorySessionRegistry::default();
        let (first_access, first_refresh) = (Uuid::new_v4(), Uuid::new_v4());
        registry
            .register("a@x.com", first_access, first_refresh, later())
            .await
            .unwrap();

        // A second login replaces the ids held by the session
        let second_access = Uuid::new_v4();
        registry
            .register("a@x.com", second_access, Uuid::new_v4(), later())
            .await
            .unwrap();

        assert_eq!(
            registry.revoke_holding("a@x.com", first_access).await.unwrap(),
            RevokeOutcome::TokenMismatch
        );
        assert!(registry.is_active("a@x.com", second_access).await.unwrap());

        assert_eq!(
            registry.revoke_holding("a@x.com", second_access).await.unwrap(),
            RevokeOutcome::Revoked
        );
        assert!(!registry.is_active("a@x.com", second_access).await.unwrap());

        assert_eq!(
            registry.revoke_holding("a@x.com", second_access).await.unwrap(),
            RevokeOutcome::NotLive
        );
        assert_eq!(
            registry.revoke_holding("nobody@x.com", first_access).await.unwrap(),
            RevokeOutcome::NotLive
        );
    }

    #[tokio::test]
    async fn test_revoke_holding_ignores_rotated_access_id() {
        let registry = InMemorySessionRegistry::default();
        let (old_access, old_refresh) = (Uuid::new_v4(), Uuid::new_v4());
        registry
            .register("a@x.com", old_access, old_refresh, later())
            .await
            .unwrap();

        let new_access = Uuid::new_v4();
        registry
            .rotate("a@x.com", old_refresh, new_access, Uuid::new_v4(), later())
            .await
            .unwrap();

        assert_eq!(
            registry.revoke_holding("a@x.com", old_access).await.unwrap(),
            RevokeOutcome::TokenMismatch
        );
        assert!(registry.is_active("a@x.com", new_access).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_only_removes_expired() {
        let registry = InMemorySessionRegistry::default();
        let live_access = Uuid::new_v4();
        registry
            .register("live@x.com", live_access, Uuid::new_v4(), later())
            .await
            .unwrap();
        registry
            .register(
                "gone@x.com",
                Uuid::new_v4(),
                Uuid::new_v4(),
                Utc::now() - Duration::minutes(5),
            )
            .await
            .unwrap();

        let removed = registry.purge_expired(Utc::now()).await.unwrap();

        assert_eq!(removed, 1);
        assert!(registry.session("gone@x.com").await.is_none());
        assert!(registry.is_active("live@x.com", live_access).await.unwrap());
    }
}
