use std::sync::Arc;

use backend::{config::AppConfig, db::Db, list_store::PostgresListStore, logger::init_tracing};
use catalog::postgres::PostgresCatalog;
use wizard::metrics::Counters;
use wizard::service::WizardService;
use wizard_common::clock::SystemClock;
use wizard_session::listlock::redis_backed::RedisListLock;
use wizard_session::ratelimit::redis_backed::RedisRateLimiter;
use wizard_session::store_redis::RedisSessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("starting shopping list migration wizard backend");

    let cfg = AppConfig::from_env();

    let db = Db::connect(&cfg.database_url).await?;
    db.migrate().await?;

    let catalog = PostgresCatalog::new(db.pool.clone());
    catalog.migrate().await?;

    let list_store = Arc::new(PostgresListStore::new(db.pool.clone()));

    let session_store = Arc::new(RedisSessionStore::connect(&cfg.redis_url).await?);
    let list_lock = Arc::new(RedisListLock::connect(&cfg.redis_url).await?);
    let rate_limiter = Arc::new(RedisRateLimiter::connect(&cfg.redis_url).await?);

    let service = Arc::new(WizardService::new(
        Arc::new(catalog),
        session_store,
        list_lock,
        rate_limiter,
        list_store.clone(),
        list_store,
        Arc::new(SystemClock),
        cfg.wizard_config(),
        Counters::default(),
    ));

    tracing::info!("wizard service ready; waiting for shutdown signal");
    let _ = service;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    Ok(())
}
