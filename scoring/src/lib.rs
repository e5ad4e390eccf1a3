//! Pure, deterministic scoring of (expired item, candidate) pairs (spec
//! §4.2). Deliberately no async, no IO — weights come in as data so ops can
//! retune without a redeploy (spec §9 "Scoring as data").

pub mod size;

use catalog::types::{FlyerProduct, StoreId};
use serde::{Deserialize, Serialize};
use wizard_common::normalize::brand_eq;
use wizard_session::model::PriceStrategy;

/// Max magnitude of the `tiebreak` component — small enough that it can
/// never outweigh a real weight (the cheapest `ScoreWeights` field is
/// `size_within_tolerance`/`cheaper_than_previous` at 1.0), so it only ever
/// breaks ties among candidates the main weights already scored equally.
const TIEBREAK_SCALE: f64 = 0.5;

/// Loaded once at startup; see spec §6 Configuration `score_weights`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub same_brand: f64,
    pub original_store: f64,
    pub preferred_store: f64,
    pub size_within_tolerance: f64,
    pub cheaper_than_previous: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            same_brand: 3.0,
            original_store: 2.0,
            preferred_store: 2.0,
            size_within_tolerance: 1.0,
            cheaper_than_previous: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub brand: f64,
    pub store: f64,
    pub pref_store: f64,
    pub size: f64,
    pub price: f64,
    pub tiebreak: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.brand + self.store + self.pref_store + self.size + self.price + self.tiebreak
    }
}

/// The subset of an expired `ShoppingListItem` the scorer needs.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub brand: Option<String>,
    pub store_id: StoreId,
    pub size: Option<String>,
    pub last_known_price: Option<f64>,
}

pub fn score_candidate(
    item: &ScoredItem,
    candidate: &FlyerProduct,
    preferred_store_ids: &[StoreId],
    weights: &ScoreWeights,
    size_tolerance_pct: f64,
    price_strategy: PriceStrategy,
) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown::default();

    if let (Some(item_brand), Some(cand_brand)) = (&item.brand, &candidate.brand) {
        if brand_eq(item_brand, cand_brand) {
            breakdown.brand = weights.same_brand;
        }
    }

    if candidate.store_id == item.store_id {
        breakdown.store = weights.original_store;
    }

    if preferred_store_ids.contains(&candidate.store_id) {
        breakdown.pref_store = weights.preferred_store;
    }

    if let (Some(item_size), Some(cand_size)) = (&item.size, &candidate.size) {
        if size::within_tolerance(item_size, cand_size, size_tolerance_pct) {
            breakdown.size = weights.size_within_tolerance;
        }
    }

    if let (Some(prev_price), Some(cand_price)) = (item.last_known_price, candidate.price_current) {
        if cand_price < prev_price {
            breakdown.price = weights.cheaper_than_previous;
        }
    }

    breakdown.tiebreak = price_tiebreak(item, candidate, price_strategy);

    breakdown
}

/// Small presentation-only bias (spec §4.4 `price_strategy`): nudges
/// ranking among candidates the main weights already scored equally,
/// without touching the configured `ScoreWeights`.
fn price_tiebreak(item: &ScoredItem, candidate: &FlyerProduct, strategy: PriceStrategy) -> f64 {
    let Some(price) = candidate.price_current else {
        return 0.0;
    };

    match strategy {
        PriceStrategy::Cheapest => match item.last_known_price {
            Some(prev) if prev > 0.0 => (((prev - price) / prev).clamp(-1.0, 1.0)) * TIEBREAK_SCALE,
            _ => 0.0,
        },
        PriceStrategy::Premium => match item.last_known_price {
            Some(prev) if prev > 0.0 => (((price - prev) / prev).clamp(-1.0, 1.0)) * TIEBREAK_SCALE,
            _ => 0.0,
        },
        PriceStrategy::Similar => match item.last_known_price {
            Some(prev) if prev > 0.0 => {
                let delta = ((price - prev).abs() / prev).clamp(0.0, 1.0);
                (1.0 - delta) * TIEBREAK_SCALE
            }
            _ => 0.0,
        },
        PriceStrategy::BestValue => match candidate.price_original {
            Some(orig) if orig > 0.0 => (((orig - price) / orig).clamp(0.0, 1.0)) * TIEBREAK_SCALE,
            _ => 0.0,
        },
    }
}

/// Tie-break ordering after scores are summed (spec §4.2): higher score
/// first, then cheaper price, then lower flyer_product_id for stability.
/// Candidates without a concrete price sort last within their score tier
/// since they're advisory-only and never auto-selectable.
pub fn compare_candidates(
    a: (&FlyerProduct, f64),
    b: (&FlyerProduct, f64),
) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let (offer_a, score_a) = a;
    let (offer_b, score_b) = b;

    score_b
        .partial_cmp(&score_a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            let price_a = offer_a.price_current.unwrap_or(f64::INFINITY);
            let price_b = offer_b.price_current.unwrap_or(f64::INFINITY);
            price_a.partial_cmp(&price_b).unwrap_or(Ordering::Equal)
        })
        .then_with(|| offer_a.id.cmp(&offer_b.id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Badge {
    BestMatch,
    SameBrand,
    Cheaper,
    DifferentStore,
    Advisory,
}

pub fn badges_for(item: &ScoredItem, candidate: &FlyerProduct, breakdown: &ScoreBreakdown, is_recommended: bool) -> Vec<Badge> {
    let mut badges = Vec::new();

    if is_recommended {
        badges.push(Badge::BestMatch);
    }
    if breakdown.brand > 0.0 {
        badges.push(Badge::SameBrand);
    }
    if let (Some(prev), Some(cur)) = (item.last_known_price, candidate.price_current) {
        if cur < prev {
            badges.push(Badge::Cheaper);
        }
    }
    if candidate.store_id != item.store_id {
        badges.push(Badge::DifferentStore);
    }
    if !candidate.has_concrete_price {
        badges.push(Badge::Advisory);
    }

    badges
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn offer(brand: &str, store_id: StoreId, price: f64, size: &str) -> FlyerProduct {
        let now = Utc::now();
        FlyerProduct {
            id: Uuid::new_v4(),
            product_master_id: None,
            store_id,
            canonical_name: "Pienas 2.5% 1L".into(),
            brand: Some(brand.to_string()),
            size: Some(size.to_string()),
            price_current: Some(price),
            price_original: None,
            special_discount: None,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(6),
            has_concrete_price: true,
        }
    }

    #[test]
    fn scores_same_brand_same_store_cheaper_offer_as_six() {
        let store = Uuid::new_v4();
        let item = ScoredItem {
            brand: Some("Zemaitijos".into()),
            store_id: store,
            size: Some("1L".into()),
            last_known_price: Some(1.50),
        };
        let candidate = offer("Zemaitijos", store, 1.30, "1L");

        let breakdown =
            score_candidate(&item, &candidate, &[], &ScoreWeights::default(), 20.0, PriceStrategy::Cheapest);
        // brand(3) + store(2) + size(1) + price(1) = 7, plus a small cheapest-strategy tiebreak.
        let expected_tiebreak = ((1.50 - 1.30) / 1.50) * TIEBREAK_SCALE;
        assert_eq!(breakdown.tiebreak, expected_tiebreak);
        assert_eq!(breakdown.total(), 7.0 + expected_tiebreak);
    }

    #[test]
    fn mismatched_brand_scores_zero_brand_points() {
        let store = Uuid::new_v4();
        let item = ScoredItem {
            brand: Some("Zemaitijos".into()),
            store_id: store,
            size: None,
            last_known_price: None,
        };
        let candidate = offer("Rokiskio", store, 1.0, "1L");

        let breakdown =
            score_candidate(&item, &candidate, &[], &ScoreWeights::default(), 20.0, PriceStrategy::Cheapest);
        assert_eq!(breakdown.brand, 0.0);
    }

    #[test]
    fn price_strategy_changes_only_the_tiebreak_component() {
        let store = Uuid::new_v4();
        let item = ScoredItem { brand: None, store_id: store, size: None, last_known_price: Some(2.0) };
        let candidate = offer("A", store, 1.0, "1L");

        let cheapest =
            score_candidate(&item, &candidate, &[], &ScoreWeights::default(), 20.0, PriceStrategy::Cheapest);
        let premium =
            score_candidate(&item, &candidate, &[], &ScoreWeights::default(), 20.0, PriceStrategy::Premium);

        assert_eq!(cheapest.brand, premium.brand);
        assert_eq!(cheapest.store, premium.store);
        assert_eq!(cheapest.price, premium.price);
        assert!(cheapest.tiebreak > 0.0);
        assert!(premium.tiebreak < 0.0);
    }

    #[test]
    fn tie_break_prefers_cheaper_then_lower_id() {
        let store = Uuid::new_v4();
        let mut cheap = offer("A", store, 1.0, "1L");
        let mut pricey = offer("A", store, 2.0, "1L");
        cheap.id = Uuid::from_u128(1);
        pricey.id = Uuid::from_u128(2);

        let ordering = compare_candidates((&cheap, 5.0), (&pricey, 5.0));
        assert_eq!(ordering, std::cmp::Ordering::Less);
    }
}
