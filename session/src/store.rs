//! Durable key/value store for wizard sessions: TTL, user->sessions index,
//! and atomic compare-and-swap on state transitions (spec §3, §6).
//!
//! Shaped after the teacher's `SessionRepository`/`SessionStore` split
//! (`backend/src/session/{repository,store}.rs`): a thin trait for the
//! backend, a CAS-aware wrapper the service actually calls through.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{SessionId, WizardSession};

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session not found")]
    NotFound,
    #[error("version conflict: session was concurrently modified")]
    VersionConflict,
    #[error("session store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: SessionId) -> Result<WizardSession, SessionStoreError>;

    /// Creates a brand-new session record. Fails if one already exists at
    /// this id (ids are UUIDv4, collision is not an expected path).
    async fn create(&self, session: &WizardSession, ttl_secs: u64) -> Result<(), SessionStoreError>;

    /// Compare-and-swap update: succeeds only if the stored version still
    /// matches `expected_version`, then persists `session` (whose version
    /// has already been bumped by the caller) and refreshes the TTL.
    async fn save_cas(
        &self,
        session: &WizardSession,
        expected_version: u64,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError>;

    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<SessionId>, SessionStoreError>;

    async fn delete(&self, id: SessionId) -> Result<(), SessionStoreError>;
}

/// Retries a CAS update up to `attempts` times, re-running `mutate` against
/// a freshly loaded session each time. Mirrors spec §9's "retry up to a
/// small bound" guidance for optimistic concurrency.
pub async fn cas_retry<S, F>(
    store: &S,
    id: SessionId,
    ttl_secs: u64,
    attempts: u32,
    mut mutate: F,
) -> Result<WizardSession, SessionStoreError>
where
    S: SessionStore + ?Sized,
    F: FnMut(&mut WizardSession) -> Result<(), SessionStoreError>,
{
    let mut last_err = SessionStoreError::VersionConflict;
    for _ in 0..attempts.max(1) {
        let mut session = store.load(id).await?;
        let expected_version = session.version;
        mutate(&mut session)?;
        session.version = expected_version + 1;

        match store.save_cas(&session, expected_version, ttl_secs).await {
            Ok(()) => return Ok(session),
            Err(SessionStoreError::VersionConflict) => {
                last_err = SessionStoreError::VersionConflict;
                continue;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err)
}
