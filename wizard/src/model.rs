use catalog::types::{FlyerProductId, ProductMasterId, StoreId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wizard_session::model::{DecisionAction, ListItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemOrigin {
    Flyer,
    FreeText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Active,
    Expired,
    Removed,
}

/// The subset of `ShoppingListItem` (spec §3) the wizard reads and, via
/// Commit, rewrites. Ownership of the full record lives in the shopping-list
/// service; this crate only ever touches the fields named here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub id: ListItemId,
    pub list_id: String,
    pub origin: ItemOrigin,
    pub product_master_id: Option<ProductMasterId>,
    pub flyer_product_id: Option<FlyerProductId>,
    pub store_id: Option<StoreId>,
    pub status: ItemStatus,
    pub canonical_name: String,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub last_known_price: Option<f64>,
    pub linked_at: DateTime<Utc>,
}

/// Bounded patch applied by Commit to an item's own row; field names
/// mirror spec §4.8 step 2.
#[derive(Debug, Clone)]
pub struct ItemPatch {
    pub flyer_product_id: FlyerProductId,
    pub product_master_id: Option<ProductMasterId>,
    pub store_id: StoreId,
    pub canonical_name: String,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub last_known_price: f64,
}

/// Append-only audit row written once per applied REPLACE (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferSnapshot {
    pub list_item_id: ListItemId,
    pub store_id: StoreId,
    pub product_master_id: Option<ProductMasterId>,
    pub flyer_product_id: Option<FlyerProductId>,
    pub price: f64,
    pub is_estimated: bool,
    pub valid_to: DateTime<Utc>,
    pub snapshotted_at: DateTime<Utc>,
}

/// `ApplyBulkDecisions` template: REPLACE entries carry a selection rule
/// instead of a concrete `flyer_product_id`, which the engine resolves per
/// item (spec §4.1).
#[derive(Debug, Clone, Copy)]
pub enum SelectionRule {
    TopRanked,
}

#[derive(Debug, Clone)]
pub struct DecisionTemplate {
    pub action: DecisionAction,
    pub selection_rule: Option<SelectionRule>,
}

#[derive(Debug, Clone)]
pub struct Receipt {
    pub session_id: wizard_session::model::SessionId,
    pub list_id: String,
    pub applied: Vec<OfferSnapshot>,
    pub removed_item_ids: Vec<ListItemId>,
    pub completed_at: DateTime<Utc>,
}
