use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProductMasterId = Uuid;
pub type FlyerProductId = Uuid;
pub type StoreId = Uuid;

/// Stable product identity across flyer rotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMaster {
    pub id: ProductMasterId,
    pub canonical_name: String,
    pub normalized_name: String,
    pub brand: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub size: Option<String>,
}

/// A priced SKU inside an active flyer page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlyerProduct {
    pub id: FlyerProductId,
    pub product_master_id: Option<ProductMasterId>,
    pub store_id: StoreId,
    pub canonical_name: String,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub price_current: Option<f64>,
    pub price_original: Option<f64>,
    pub special_discount: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    /// false when the flyer advertises only a category/brand percentage
    /// rather than a concrete per-SKU price.
    pub has_concrete_price: bool,
}

impl FlyerProduct {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now < self.valid_to
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
}
