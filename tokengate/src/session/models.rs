//! Session data models.

use chrono::{DateTime, Utc};
use subtle::{Choice, ConstantTimeEq};

use crate::auth::TokenId;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Holds the token pair issued at login
    Active,
    /// Holds a token pair issued by a refresh; logically still active
    Rotated,
    /// Terminal until a new login registers a fresh session
    Revoked,
}

/// Result of revoking the session a specific token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The token belonged to the live session, which is now revoked
    Revoked,
    /// No live session: never logged in, logged out, or expired
    NotLive,
    /// A live session exists but holds other token ids; left untouched
    TokenMismatch,
}

/// Session model
#[derive(Debug, Clone)]
pub struct Session {
    pub subject: String,
    pub access_token_id: TokenId,
    pub refresh_token_id: TokenId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub rotations: u32,
}

impl Session {
    /// Create an active session for a freshly issued token pair
    pub fn new(
        subject: &str,
        access_token_id: TokenId,
        refresh_token_id: TokenId,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject: subject.to_string(),
            access_token_id,
            refresh_token_id,
            created_at: Utc::now(),
            expires_at,
            status: SessionStatus::Active,
            rotations: 0,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Not revoked and not expired
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status != SessionStatus::Revoked && !self.is_expired(now)
    }

    /// Whether `token_id` is this session's current access or refresh id
    pub fn holds(&self, token_id: TokenId) -> bool {
        let access = ids_match(&self.access_token_id, &token_id);
        let refresh = ids_match(&self.refresh_token_id, &token_id);
        bool::from(access | refresh)
    }

    pub fn is_current_refresh(&self, token_id: TokenId) -> bool {
        bool::from(ids_match(&self.refresh_token_id, &token_id))
    }
}

fn ids_match(stored: &TokenId, presented: &TokenId) -> Choice {
    stored
        .as_bytes()
        .as_slice()
        .ct_eq(presented.as_bytes().as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    #[test]
    fn test_holds_either_token_id() {
        let access = Uuid::new_v4();
        let refresh = Uuid::new_v4();
        let session = Session::new("a@x.com", access, refresh, Utc::now() + Duration::hours(1));

        assert!(session.holds(access));
        assert!(session.holds(refresh));
        assert!(!session.holds(Uuid::new_v4()));
        assert!(session.is_current_refresh(refresh));
        assert!(!session.is_current_refresh(access));
    }

    #[test]
    fn test_liveness() {
        let now = Utc::now();
        let mut session = Session::new("a@x.com", Uuid::new_v4(), Uuid::new_v4(), now);

        assert!(session.is_live(now));
        assert!(!session.is_live(now + Duration::seconds(1)));

        session.status = SessionStatus::Revoked;
        assert!(!session.is_live(now));
    }
}
