//! Advisory exclusion lock keyed by shopping-list id (spec §4.4). Ownership
//! is asserted by session id on every refresh/release; a mismatch is a
//! `Forbidden`-shaped condition the caller surfaces as such.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::SessionId;

#[derive(Debug, Error)]
pub enum ListLockError {
    #[error("list is already locked by another session")]
    AlreadyLocked,
    #[error("lock is not owned by this session")]
    NotOwner,
    #[error("list lock backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait ListLock: Send + Sync {
    /// Atomic set-if-absent. Returns Ok(()) on success,
    /// `Err(AlreadyLocked)` if another session holds it.
    async fn acquire(&self, list_id: &str, session_id: SessionId, ttl_secs: u64) -> Result<(), ListLockError>;

    /// Extends the TTL only if `session_id` still owns the lock.
    async fn refresh(&self, list_id: &str, session_id: SessionId, ttl_secs: u64) -> Result<(), ListLockError>;

    /// Deletes the lock only if owned by `session_id`.
    async fn release(&self, list_id: &str, session_id: SessionId) -> Result<(), ListLockError>;

    async fn current_owner(&self, list_id: &str) -> Result<Option<SessionId>, ListLockError>;
}

pub mod memory {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::{ListLock, ListLockError};
    use crate::model::SessionId;

    #[derive(Default)]
    pub struct InMemoryListLock {
        locks: Arc<Mutex<HashMap<String, SessionId>>>,
    }

    impl InMemoryListLock {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl ListLock for InMemoryListLock {
        async fn acquire(&self, list_id: &str, session_id: SessionId, _ttl_secs: u64) -> Result<(), ListLockError> {
            let mut guard = self.locks.lock().await;
            match guard.get(list_id) {
                Some(_) => Err(ListLockError::AlreadyLocked),
                None => {
                    guard.insert(list_id.to_string(), session_id);
                    Ok(())
                }
            }
        }

        async fn refresh(&self, list_id: &str, session_id: SessionId, _ttl_secs: u64) -> Result<(), ListLockError> {
            let guard = self.locks.lock().await;
            match guard.get(list_id) {
                Some(owner) if *owner == session_id => Ok(()),
                Some(_) => Err(ListLockError::NotOwner),
                None => Err(ListLockError::NotOwner),
            }
        }

        async fn release(&self, list_id: &str, session_id: SessionId) -> Result<(), ListLockError> {
            let mut guard = self.locks.lock().await;
            match guard.get(list_id) {
                Some(owner) if *owner == session_id => {
                    guard.remove(list_id);
                    Ok(())
                }
                Some(_) => Err(ListLockError::NotOwner),
                None => Ok(()),
            }
        }

        async fn current_owner(&self, list_id: &str) -> Result<Option<SessionId>, ListLockError> {
            Ok(self.locks.lock().await.get(list_id).copied())
        }
    }
}

pub mod redis_backed {
    use async_trait::async_trait;
    use redis::AsyncCommands;
    use redis::aio::ConnectionManager;

    use super::{ListLock, ListLockError};
    use crate::model::SessionId;

    pub struct RedisListLock {
        conn: ConnectionManager,
    }

    impl RedisListLock {
        pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
            let client = redis::Client::open(redis_url)?;
            let conn = ConnectionManager::new(client).await?;
            Ok(Self { conn })
        }

        fn key(list_id: &str) -> String {
            format!("wizard:lock:{list_id}")
        }
    }

    const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
else
  return 0
end
"#;

    const REFRESH_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('EXPIRE', KEYS[1], ARGV[2])
else
  return 0
end
"#;

    #[async_trait]
    impl ListLock for RedisListLock {
        async fn acquire(&self, list_id: &str, session_id: SessionId, ttl_secs: u64) -> Result<(), ListLockError> {
            let mut conn = self.conn.clone();
            let set: Option<String> = redis::cmd("SET")
                .arg(Self::key(list_id))
                .arg(session_id.to_string())
                .arg("EX")
                .arg(ttl_secs)
                .arg("NX")
                .query_async(&mut conn)
                .await
                .map_err(|e| ListLockError::Backend(e.into()))?;

            if set.is_some() { Ok(()) } else { Err(ListLockError::AlreadyLocked) }
        }

        async fn refresh(&self, list_id: &str, session_id: SessionId, ttl_secs: u64) -> Result<(), ListLockError> {
            let mut conn = self.conn.clone();
            let ok: i64 = redis::Script::new(REFRESH_SCRIPT)
                .key(Self::key(list_id))
                .arg(session_id.to_string())
                .arg(ttl_secs)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| ListLockError::Backend(e.into()))?;

            if ok == 1 { Ok(()) } else { Err(ListLockError::NotOwner) }
        }

        async fn release(&self, list_id: &str, session_id: SessionId) -> Result<(), ListLockError> {
            let mut conn = self.conn.clone();
            let _: i64 = redis::Script::new(RELEASE_SCRIPT)
                .key(Self::key(list_id))
                .arg(session_id.to_string())
                .invoke_async(&mut conn)
                .await
                .map_err(|e| ListLockError::Backend(e.into()))?;
            Ok(())
        }

        async fn current_owner(&self, list_id: &str) -> Result<Option<SessionId>, ListLockError> {
            let mut conn = self.conn.clone();
            let raw: Option<String> = conn.get(Self::key(list_id)).await.map_err(|e| ListLockError::Backend(e.into()))?;
            raw.map(|s| uuid::Uuid::parse_str(&s).map_err(|e| ListLockError::Backend(e.into())))
                .transpose()
        }
    }
}
