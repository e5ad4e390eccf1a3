pub mod schema;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Thin pool wrapper, grounded on the teacher's own `Db` (connect + migrate)
/// shape.
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        schema::migrate(&self.pool).await
    }
}
