use sqlx::PgPool;

/// Creates the tables this crate owns: the shopping-list item rows the
/// wizard rewrites, and the append-only snapshot audit trail (spec §3).
/// The catalog's own tables are migrated separately by `PostgresCatalog`.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS shopping_list_items (
  id UUID PRIMARY KEY,
  list_id TEXT NOT NULL,
  origin TEXT NOT NULL,
  product_master_id UUID,
  flyer_product_id UUID,
  store_id UUID,
  status TEXT NOT NULL,
  canonical_name TEXT NOT NULL,
  brand TEXT,
  size TEXT,
  last_known_price DOUBLE PRECISION,
  linked_at TIMESTAMPTZ NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_shopping_list_items_list ON shopping_list_items(list_id);"#)
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS offer_snapshots (
  id BIGSERIAL PRIMARY KEY,
  list_item_id UUID NOT NULL,
  store_id UUID NOT NULL,
  product_master_id UUID,
  flyer_product_id UUID,
  price DOUBLE PRECISION NOT NULL,
  is_estimated BOOLEAN NOT NULL,
  valid_to TIMESTAMPTZ NOT NULL,
  snapshotted_at TIMESTAMPTZ NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_offer_snapshots_item ON offer_snapshots(list_item_id);"#)
        .execute(pool)
        .await?;

    Ok(())
}
