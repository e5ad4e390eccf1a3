use chrono::{Duration, Utc};
use uuid::Uuid;

use wizard_session::listlock::memory::InMemoryListLock;
use wizard_session::listlock::ListLock;
use wizard_session::model::{Filters, WizardSession};
use wizard_session::ratelimit::memory::InMemoryRateLimiter;
use wizard_session::ratelimit::RateLimiter;
use wizard_session::store::{SessionStore, SessionStoreError, cas_retry};
use wizard_session::store_memory::InMemorySessionStore;

fn sample_session() -> WizardSession {
    WizardSession::new(
        Uuid::new_v4(),
        "user-1".into(),
        "list-1".into(),
        Filters::default(),
        vec![],
        Utc::now(),
        Duration::minutes(30),
    )
}

#[tokio::test]
async fn create_then_load_round_trips() {
    let store = InMemorySessionStore::new();
    let s = sample_session();
    store.create(&s, 1800).await.unwrap();

    let loaded = store.load(s.id).await.unwrap();
    assert_eq!(loaded.id, s.id);
    assert_eq!(loaded.version, 0);
}

#[tokio::test]
async fn cas_retry_bumps_version_and_applies_mutation() {
    let store = InMemorySessionStore::new();
    let s = sample_session();
    store.create(&s, 1800).await.unwrap();

    let updated = cas_retry(&store, s.id, 1800, 3, |session| {
        session.current_index += 1;
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(updated.version, 1);
    assert_eq!(updated.current_index, 1);
}

#[tokio::test]
async fn save_cas_rejects_stale_version() {
    let store = InMemorySessionStore::new();
    let s = sample_session();
    store.create(&s, 1800).await.unwrap();

    let mut stale = store.load(s.id).await.unwrap();
    // Advance the real record once.
    let mut current = store.load(s.id).await.unwrap();
    current.version += 1;
    store.save_cas(&current, 0, 1800).await.unwrap();

    // Now `stale` (version 0) no longer matches the stored version (1).
    stale.version += 1;
    let result = store.save_cas(&stale, 0, 1800).await;
    assert!(matches!(result, Err(SessionStoreError::VersionConflict)));
}

#[tokio::test]
async fn list_lock_is_exclusive_until_released() {
    let lock = InMemoryListLock::new();
    let owner = Uuid::new_v4();
    let challenger = Uuid::new_v4();

    lock.acquire("list-1", owner, 1800).await.unwrap();
    let result = lock.acquire("list-1", challenger, 1800).await;
    assert!(result.is_err());

    lock.release("list-1", owner).await.unwrap();
    lock.acquire("list-1", challenger, 1800).await.unwrap();
}

#[tokio::test]
async fn list_lock_refresh_requires_ownership() {
    let lock = InMemoryListLock::new();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    lock.acquire("list-1", owner, 1800).await.unwrap();
    assert!(lock.refresh("list-1", stranger, 1800).await.is_err());
    assert!(lock.refresh("list-1", owner, 1800).await.is_ok());
}

#[tokio::test]
async fn rate_limiter_blocks_after_threshold_and_recovers() {
    let limiter = InMemoryRateLimiter::new();
    let now = Utc::now();

    for _ in 0..5 {
        limiter.check_and_record("user-1", now, 5, 3600).await.unwrap();
    }

    let sixth = limiter.check_and_record("user-1", now, 5, 3600).await;
    assert!(sixth.is_err());

    let later = now + Duration::hours(1) + Duration::seconds(1);
    assert!(limiter.check_and_record("user-1", later, 5, 3600).await.is_ok());
}
