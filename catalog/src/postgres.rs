//! PostgreSQL-backed `OfferCatalog`: a row matches on full-text search over
//! a generated canonical-name tsvector OR trigram similarity, ranked by
//! whichever of the two scores higher, plus a plain brand equality filter.
//! Mirrors the dynamic-WHERE-clause style used by the rewards offer catalog
//! this crate is grounded on.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::types::{FlyerProduct, FlyerProductId, ProductMaster, ProductMasterId};
use crate::{CatalogError, OfferCatalog, SearchOffers};

pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
CREATE EXTENSION IF NOT EXISTS pg_trgm;

CREATE TABLE IF NOT EXISTS stores (
  id UUID PRIMARY KEY,
  name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS product_masters (
  id UUID PRIMARY KEY,
  canonical_name TEXT NOT NULL,
  normalized_name TEXT NOT NULL,
  brand TEXT,
  tags TEXT[] NOT NULL DEFAULT '{}',
  category TEXT,
  size TEXT
);

CREATE TABLE IF NOT EXISTS flyer_products (
  id UUID PRIMARY KEY,
  product_master_id UUID REFERENCES product_masters(id),
  store_id UUID NOT NULL REFERENCES stores(id),
  canonical_name TEXT NOT NULL,
  name_tsv TSVECTOR GENERATED ALWAYS AS (to_tsvector('simple', canonical_name)) STORED,
  brand TEXT,
  size TEXT,
  price_current DOUBLE PRECISION,
  price_original DOUBLE PRECISION,
  special_discount TEXT,
  valid_from TIMESTAMPTZ NOT NULL,
  valid_to TIMESTAMPTZ NOT NULL,
  has_concrete_price BOOLEAN NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_flyer_products_name_trgm
  ON flyer_products USING gin (canonical_name gin_trgm_ops);

CREATE INDEX IF NOT EXISTS idx_flyer_products_name_tsv
  ON flyer_products USING gin (name_tsv);

CREATE INDEX IF NOT EXISTS idx_flyer_products_validity
  ON flyer_products (valid_to);
"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl OfferCatalog for PostgresCatalog {
    async fn search_offers(&self, query: SearchOffers<'_>) -> Result<Vec<FlyerProduct>, CatalogError> {
        let mut sql = String::from(
            r#"
SELECT id, product_master_id, store_id, canonical_name, brand, size,
       price_current, price_original, special_discount,
       valid_from, valid_to, has_concrete_price
FROM flyer_products
WHERE valid_to > now()
  AND (name_tsv @@ plainto_tsquery('simple', $1) OR similarity(canonical_name, $1) >= $2)
"#,
        );

        let mut arg_idx = 3;
        if query.brand.is_some() {
            sql.push_str(&format!(" AND lower(brand) = lower(${arg_idx})"));
            arg_idx += 1;
        }
        if query.require_concrete_price {
            sql.push_str(" AND has_concrete_price = true");
        }
        if query.store_ids.is_some() {
            sql.push_str(&format!(" AND store_id = ANY(${arg_idx})"));
        }
        sql.push_str(
            " ORDER BY GREATEST(ts_rank(name_tsv, plainto_tsquery('simple', $1)), similarity(canonical_name, $1)) DESC, id ASC",
        );

        let mut q = sqlx::query(&sql).bind(query.canonical_name).bind(query.trigram_threshold);
        if let Some(brand) = query.brand {
            q = q.bind(brand);
        }
        if let Some(store_ids) = query.store_ids {
            q = q.bind(store_ids.to_vec());
        }

        let rows = q.fetch_all(&self.pool).await.map_err(|e| CatalogError::Backend(e.into()))?;

        rows.into_iter().map(row_to_offer).collect()
    }

    async fn get_offer(&self, id: FlyerProductId) -> Result<FlyerProduct, CatalogError> {
        let row = sqlx::query(
            r#"
SELECT id, product_master_id, store_id, canonical_name, brand, size,
       price_current, price_original, special_discount,
       valid_from, valid_to, has_concrete_price
FROM flyer_products WHERE id = $1
"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CatalogError::Backend(e.into()))?
        .ok_or(CatalogError::NotFound)?;

        row_to_offer(row)
    }

    async fn resolve_master(&self, id: ProductMasterId) -> Result<ProductMaster, CatalogError> {
        let row = sqlx::query(
            "SELECT id, canonical_name, normalized_name, brand, tags, category, size FROM product_masters WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CatalogError::Backend(e.into()))?
        .ok_or(CatalogError::NotFound)?;

        Ok(ProductMaster {
            id: row.get("id"),
            canonical_name: row.get("canonical_name"),
            normalized_name: row.get("normalized_name"),
            brand: row.get("brand"),
            tags: row.get::<Vec<String>, _>("tags"),
            category: row.get("category"),
            size: row.get("size"),
        })
    }
}

fn row_to_offer(row: sqlx::postgres::PgRow) -> Result<FlyerProduct, CatalogError> {
    Ok(FlyerProduct {
        id: row.get::<Uuid, _>("id"),
        product_master_id: row.get("product_master_id"),
        store_id: row.get("store_id"),
        canonical_name: row.get("canonical_name"),
        brand: row.get("brand"),
        size: row.get("size"),
        price_current: row.get("price_current"),
        price_original: row.get("price_original"),
        special_discount: row.get("special_discount"),
        valid_from: row.get("valid_from"),
        valid_to: row.get("valid_to"),
        has_concrete_price: row.get("has_concrete_price"),
    })
}
