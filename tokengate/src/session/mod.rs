//! Session bookkeeping for issued token pairs.
//!
//! One session is kept per subject. A new login supersedes the previous
//! session, a refresh rotates the session's token ids, and a logout or a
//! replayed refresh token revokes it. Expired sessions are inactive
//! immediately and are dropped by [`SessionRegistry::purge_expired`].

pub mod models;
pub mod registry;

pub use models::{RevokeOutcome, Session, SessionStatus};
pub use registry::{InMemorySessionRegistry, SessionRegistry};
