//! Redis-backed `SessionStore`. Layout follows spec §6:
//!   wizard:session:{id}              -> JSON blob (with EXPIRE = ttl)
//!   wizard:user:{user_id}:sessions   -> SET of session ids
//!
//! CAS is implemented with a small Lua script so the version check and the
//! write happen atomically without a round trip for WATCH/MULTI.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::model::{SessionId, WizardSession};
use crate::store::{SessionStore, SessionStoreError};

pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    fn session_key(id: SessionId) -> String {
        format!("wizard:session:{id}")
    }

    fn user_index_key(user_id: &str) -> String {
        format!("wizard:user:{user_id}:sessions")
    }
}

const CAS_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if current == false then
  return -1
end
local decoded = cjson.decode(current)
if decoded.version ~= tonumber(ARGV[2]) then
  return 0
end
redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[3])
return 1
"#;

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: SessionId) -> Result<WizardSession, SessionStoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(Self::session_key(id))
            .await
            .map_err(|e| SessionStoreError::Backend(e.into()))?;
        let raw = raw.ok_or(SessionStoreError::NotFound)?;
        serde_json::from_str(&raw).map_err(|e| SessionStoreError::Backend(e.into()))
    }

    async fn create(&self, session: &WizardSession, ttl_secs: u64) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(session).map_err(|e| SessionStoreError::Backend(e.into()))?;

        let set: bool = redis::cmd("SET")
            .arg(Self::session_key(session.id))
            .arg(&payload)
            .arg("EX")
            .arg(ttl_secs)
            .arg("NX")
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map(|v| v.is_some())
            .map_err(|e| SessionStoreError::Backend(e.into()))?;

        if !set {
            return Err(SessionStoreError::Backend(anyhow::anyhow!("session id collision")));
        }

        let _: () = conn
            .sadd(Self::user_index_key(&session.user_id), session.id.to_string())
            .await
            .map_err(|e| SessionStoreError::Backend(e.into()))?;

        Ok(())
    }

    async fn save_cas(
        &self,
        session: &WizardSession,
        expected_version: u64,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(session).map_err(|e| SessionStoreError::Backend(e.into()))?;

        let script = redis::Script::new(CAS_SCRIPT);
        let result: i64 = script
            .key(Self::session_key(session.id))
            .arg(&payload)
            .arg(expected_version)
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| SessionStoreError::Backend(e.into()))?;

        match result {
            1 => Ok(()),
            0 => Err(SessionStoreError::VersionConflict),
            _ => Err(SessionStoreError::NotFound),
        }
    }

    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<SessionId>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .smembers(Self::user_index_key(user_id))
            .await
            .map_err(|e| SessionStoreError::Backend(e.into()))?;

        ids.into_iter()
            .map(|s| uuid::Uuid::parse_str(&s).map_err(|e| SessionStoreError::Backend(e.into())))
            .collect()
    }

    async fn delete(&self, id: SessionId) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let session = self.load(id).await.ok();
        let _: () = conn.del(Self::session_key(id)).await.map_err(|e| SessionStoreError::Backend(e.into()))?;
        if let Some(s) = session {
            let _: () = conn
                .srem(Self::user_index_key(&s.user_id), id.to_string())
                .await
                .map_err(|e| SessionStoreError::Backend(e.into()))?;
        }
        Ok(())
    }
}
