//! Postgres-backed `ListMutator`/`ShoppingListReader`: the one persistence
//! concern this crate owns outright, since the real shopping-list service
//! lives outside this repo. Transaction shape mirrors the teacher's
//! `SqlxSessionRepository`: a `sqlx::Transaction` opened up front, staged
//! writes executed directly against it, explicit `commit`/`rollback`.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use wizard_session::model::ListItemId;

use wizard::list_mutator::{ListMutator, ListMutatorTx};
use wizard::list_reader::ShoppingListReader;
use wizard::model::{ItemOrigin, ItemPatch, ItemStatus, OfferSnapshot, ShoppingListItem};

pub struct PostgresListStore {
    pool: PgPool,
}

impl PostgresListStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListMutator for PostgresListStore {
    async fn begin_tx(&self) -> anyhow::Result<Box<dyn ListMutatorTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresListTx { tx: Some(tx) }))
    }
}

#[async_trait]
impl ShoppingListReader for PostgresListStore {
    async fn get_items(&self, list_id: &str) -> anyhow::Result<Vec<ShoppingListItem>> {
        let rows = sqlx::query(
            r#"
SELECT id, list_id, origin, product_master_id, flyer_product_id, store_id,
       status, canonical_name, brand, size, last_known_price, linked_at
FROM shopping_list_items
WHERE list_id = $1
"#,
        )
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_item).collect()
    }
}

struct PostgresListTx {
    tx: Option<sqlx::Transaction<'static, sqlx::Postgres>>,
}

#[async_trait]
impl ListMutatorTx for PostgresListTx {
    async fn update_item(&mut self, item_id: ListItemId, patch: ItemPatch) -> anyhow::Result<()> {
        let tx = self.tx.as_mut().expect("transaction already finished");
        sqlx::query(
            r#"
UPDATE shopping_list_items
SET flyer_product_id = $1, product_master_id = $2, store_id = $3,
    canonical_name = $4, brand = $5, size = $6, last_known_price = $7,
    status = 'active'
WHERE id = $8
"#,
        )
        .bind(patch.flyer_product_id)
        .bind(patch.product_master_id)
        .bind(patch.store_id)
        .bind(patch.canonical_name)
        .bind(patch.brand)
        .bind(patch.size)
        .bind(patch.last_known_price)
        .bind(item_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn remove_item(&mut self, item_id: ListItemId) -> anyhow::Result<()> {
        let tx = self.tx.as_mut().expect("transaction already finished");
        sqlx::query("UPDATE shopping_list_items SET status = 'removed' WHERE id = $1")
            .bind(item_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn insert_snapshot(&mut self, snapshot: OfferSnapshot) -> anyhow::Result<()> {
        let tx = self.tx.as_mut().expect("transaction already finished");
        sqlx::query(
            r#"
INSERT INTO offer_snapshots
  (list_item_id, store_id, product_master_id, flyer_product_id, price, is_estimated, valid_to, snapshotted_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#,
        )
        .bind(snapshot.list_item_id)
        .bind(snapshot.store_id)
        .bind(snapshot.product_master_id)
        .bind(snapshot.flyer_product_id)
        .bind(snapshot.price)
        .bind(snapshot.is_estimated)
        .bind(snapshot.valid_to)
        .bind(snapshot.snapshotted_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> anyhow::Result<()> {
        self.tx.take().expect("transaction already finished").commit().await?;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> anyhow::Result<()> {
        self.tx.take().expect("transaction already finished").rollback().await?;
        Ok(())
    }
}

fn row_to_item(row: sqlx::postgres::PgRow) -> anyhow::Result<ShoppingListItem> {
    let origin: String = row.get("origin");
    let status: String = row.get("status");

    Ok(ShoppingListItem {
        id: row.get("id"),
        list_id: row.get("list_id"),
        origin: match origin.as_str() {
            "flyer" => ItemOrigin::Flyer,
            _ => ItemOrigin::FreeText,
        },
        product_master_id: row.get("product_master_id"),
        flyer_product_id: row.get("flyer_product_id"),
        store_id: row.get("store_id"),
        status: match status.as_str() {
            "expired" => ItemStatus::Expired,
            "removed" => ItemStatus::Removed,
            _ => ItemStatus::Active,
        },
        canonical_name: row.get("canonical_name"),
        brand: row.get("brand"),
        size: row.get("size"),
        last_known_price: row.get("last_known_price"),
        linked_at: row.get("linked_at"),
    })
}
