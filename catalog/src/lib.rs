//! Read-only projection over active flyer products, product masters and
//! stores. The wizard never writes through this crate; it only searches and
//! resolves.

pub mod memory;
pub mod postgres;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;
use types::{FlyerProduct, FlyerProductId, ProductMaster, ProductMasterId, StoreId};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("offer not found")]
    NotFound,
    #[error("catalog backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Search parameters for the strong/loose passes described in spec §4.6.
#[derive(Debug, Clone)]
pub struct SearchOffers<'a> {
    pub canonical_name: &'a str,
    pub brand: Option<&'a str>,
    pub store_ids: Option<&'a [StoreId]>,
    pub require_concrete_price: bool,
    pub trigram_threshold: f32,
}

#[async_trait]
pub trait OfferCatalog: Send + Sync {
    async fn search_offers(&self, query: SearchOffers<'_>) -> Result<Vec<FlyerProduct>, CatalogError>;

    async fn get_offer(&self, id: FlyerProductId) -> Result<FlyerProduct, CatalogError>;

    async fn resolve_master(&self, id: ProductMasterId) -> Result<ProductMaster, CatalogError>;
}
