use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::model::{SessionId, WizardSession};
use crate::store::{SessionStore, SessionStoreError};

/// In-process fake, used by unit/integration tests in place of Redis.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, WizardSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, id: SessionId) -> Result<WizardSession, SessionStoreError> {
        self.sessions.lock().await.get(&id).cloned().ok_or(SessionStoreError::NotFound)
    }

    async fn create(&self, session: &WizardSession, _ttl_secs: u64) -> Result<(), SessionStoreError> {
        let mut guard = self.sessions.lock().await;
        if guard.contains_key(&session.id) {
            return Err(SessionStoreError::Backend(anyhow::anyhow!("session id collision")));
        }
        guard.insert(session.id, session.clone());
        Ok(())
    }

    async fn save_cas(
        &self,
        session: &WizardSession,
        expected_version: u64,
        _ttl_secs: u64,
    ) -> Result<(), SessionStoreError> {
        let mut guard = self.sessions.lock().await;
        let existing = guard.get(&session.id).ok_or(SessionStoreError::NotFound)?;
        if existing.version != expected_version {
            return Err(SessionStoreError::VersionConflict);
        }
        guard.insert(session.id, session.clone());
        Ok(())
    }

    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<SessionId>, SessionStoreError> {
        Ok(self
            .sessions
            .lock()
            .await
            .values()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.id)
            .collect())
    }

    async fn delete(&self, id: SessionId) -> Result<(), SessionStoreError> {
        self.sessions.lock().await.remove(&id);
        Ok(())
    }
}
