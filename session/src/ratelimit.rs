//! Per-user sliding-window rate limiter for `StartWizard` (spec §4.5).
//! Implemented as a sorted-set sliding log (score = request timestamp) so
//! it is accurate to the millisecond rather than bucketed, and survives
//! process restarts because the state lives in Redis.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limited, retry after {retry_after_secs}s")]
    Exceeded { retry_after_secs: i64 },
    #[error("rate limiter backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Records a `StartWizard` attempt for `user_id` at `now` and returns
    /// `Ok(())` if the call is within the window, or
    /// `Err(Exceeded)` with a `Retry-After` hint equal to the oldest
    /// in-window entry's age (spec §7).
    async fn check_and_record(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        max_per_window: u32,
        window_secs: i64,
    ) -> Result<(), RateLimitError>;
}

pub mod memory {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use tokio::sync::Mutex;

    use super::{RateLimitError, RateLimiter};

    #[derive(Default)]
    pub struct InMemoryRateLimiter {
        windows: Arc<Mutex<HashMap<String, Vec<DateTime<Utc>>>>>,
    }

    impl InMemoryRateLimiter {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl RateLimiter for InMemoryRateLimiter {
        async fn check_and_record(
            &self,
            user_id: &str,
            now: DateTime<Utc>,
            max_per_window: u32,
            window_secs: i64,
        ) -> Result<(), RateLimitError> {
            let mut guard = self.windows.lock().await;
            let entries = guard.entry(user_id.to_string()).or_default();

            let cutoff = now - chrono::Duration::seconds(window_secs);
            entries.retain(|ts| *ts > cutoff);

            if entries.len() as u32 >= max_per_window {
                let oldest = entries.first().copied().unwrap_or(now);
                let retry_after = (oldest + chrono::Duration::seconds(window_secs) - now).num_seconds().max(0);
                return Err(RateLimitError::Exceeded { retry_after_secs: retry_after });
            }

            entries.push(now);
            Ok(())
        }
    }
}

pub mod redis_backed {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use redis::AsyncCommands;
    use redis::aio::ConnectionManager;

    use super::{RateLimitError, RateLimiter};

    pub struct RedisRateLimiter {
        conn: ConnectionManager,
    }

    impl RedisRateLimiter {
        pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
            let client = redis::Client::open(redis_url)?;
            let conn = ConnectionManager::new(client).await?;
            Ok(Self { conn })
        }

        fn key(user_id: &str) -> String {
            format!("wizard:ratelimit:{user_id}")
        }
    }

    #[async_trait]
    impl RateLimiter for RedisRateLimiter {
        async fn check_and_record(
            &self,
            user_id: &str,
            now: DateTime<Utc>,
            max_per_window: u32,
            window_secs: i64,
        ) -> Result<(), RateLimitError> {
            let mut conn = self.conn.clone();
            let key = Self::key(user_id);
            let now_ms = now.timestamp_millis();
            let cutoff_ms = now_ms - window_secs * 1000;

            let _: () = conn
                .zrembyscore(&key, i64::MIN, cutoff_ms)
                .await
                .map_err(|e| RateLimitError::Backend(e.into()))?;

            let count: u64 = conn.zcard(&key).await.map_err(|e| RateLimitError::Backend(e.into()))?;

            if count >= max_per_window as u64 {
                let oldest: Vec<(String, f64)> = conn
                    .zrange_withscores(&key, 0, 0)
                    .await
                    .map_err(|e| RateLimitError::Backend(e.into()))?;

                let oldest_ms = oldest.first().map(|(_, score)| *score as i64).unwrap_or(now_ms);
                let retry_after = ((oldest_ms + window_secs * 1000) - now_ms).max(0) / 1000;
                return Err(RateLimitError::Exceeded { retry_after_secs: retry_after });
            }

            let member = format!("{now_ms}-{}", uuid::Uuid::new_v4());
            let _: () = conn.zadd(&key, member, now_ms).await.map_err(|e| RateLimitError::Backend(e.into()))?;
            let _: () = conn.expire(&key, window_secs).await.map_err(|e| RateLimitError::Backend(e.into()))?;

            Ok(())
        }
    }
}
