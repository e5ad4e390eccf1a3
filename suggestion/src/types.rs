use catalog::types::{FlyerProductId, ProductMasterId, StoreId};
use chrono::{DateTime, Utc};
use scoring::{Badge, ScoreBreakdown};
use serde::{Deserialize, Serialize};

/// Ranked candidate returned by the engine, spec §3 `MigrationCandidate`.
/// Transient — never persisted directly, only the chosen one's id and
/// `valid_to` (the user's "what I saw" snapshot) land in a `Decision`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationCandidate {
    pub flyer_product_id: FlyerProductId,
    pub product_master_id: Option<ProductMasterId>,
    pub store_id: StoreId,
    pub price_current: Option<f64>,
    pub price_original: Option<f64>,
    pub valid_to: DateTime<Utc>,
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub badges: Vec<Badge>,
    pub has_concrete_price: bool,
}

/// Input describing the expired list item the engine is searching
/// replacements for.
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub canonical_name: String,
    pub brand: Option<String>,
    pub original_store_id: StoreId,
    pub size: Option<String>,
    pub last_known_price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SuggestionResult {
    pub candidates: Vec<MigrationCandidate>,
    pub recommended_index: Option<usize>,
}
