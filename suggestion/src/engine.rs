//! Two-pass candidate search (spec §4.6). Strong pass constrains on brand;
//! loose pass drops the brand constraint when the strong pass is thin. The
//! original store is always probed so a same-brand match elsewhere is never
//! hidden by a `PREFERRED_STORES` restriction (the "same-brand first,
//! anywhere" invariant).

use std::collections::HashSet;

use catalog::types::FlyerProduct;
use catalog::{CatalogError, OfferCatalog, SearchOffers};
use scoring::{badges_for, compare_candidates, score_candidate, ScoreWeights, ScoredItem};
use thiserror::Error;
use wizard_session::model::{AutoApplyMode, Filters, StoreStrategy};

use crate::types::{MigrationCandidate, SuggestionRequest, SuggestionResult};

#[derive(Debug, Error)]
pub enum SuggestionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn store_universe(request: &SuggestionRequest, filters: &Filters) -> Option<Vec<catalog::types::StoreId>> {
    match filters.store_strategy {
        StoreStrategy::SameStore => Some(vec![request.original_store_id]),
        StoreStrategy::AnyStore | StoreStrategy::OptimalRoute => None,
        StoreStrategy::PreferredStores => {
            let mut ids: Vec<_> = filters.preferred_store_ids.clone();
            if !ids.contains(&request.original_store_id) {
                ids.push(request.original_store_id);
            }
            Some(ids)
        }
    }
}

pub async fn generate_candidates(
    catalog: &dyn OfferCatalog,
    request: &SuggestionRequest,
    filters: &Filters,
    weights: &ScoreWeights,
    candidates_per_item: usize,
    trigram_threshold: f32,
) -> Result<SuggestionResult, SuggestionError> {
    let store_ids = store_universe(request, filters);

    let strong = catalog
        .search_offers(SearchOffers {
            canonical_name: &request.canonical_name,
            brand: request.brand.as_deref(),
            store_ids: store_ids.as_deref(),
            require_concrete_price: filters.require_concrete_price,
            trigram_threshold,
        })
        .await?;

    let mut merged: Vec<FlyerProduct> = strong;
    let mut seen: HashSet<_> = merged.iter().map(|o| o.id).collect();

    if merged.len() < candidates_per_item {
        let loose = catalog
            .search_offers(SearchOffers {
                canonical_name: &request.canonical_name,
                brand: None,
                store_ids: store_ids.as_deref(),
                require_concrete_price: filters.require_concrete_price,
                trigram_threshold,
            })
            .await?;

        for offer in loose {
            if seen.insert(offer.id) {
                merged.push(offer);
            }
        }
    }

    let scored_item = ScoredItem {
        brand: request.brand.clone(),
        store_id: request.original_store_id,
        size: request.size.clone(),
        last_known_price: request.last_known_price,
    };

    let mut scored: Vec<(FlyerProduct, f64, scoring::ScoreBreakdown)> = merged
        .into_iter()
        .map(|offer| {
            let breakdown = score_candidate(
                &scored_item,
                &offer,
                &filters.preferred_store_ids,
                weights,
                filters.size_tolerance_pct,
                filters.price_strategy,
            );
            let total = breakdown.total();
            (offer, total, breakdown)
        })
        .collect();

    scored.sort_by(|(offer_a, score_a, _), (offer_b, score_b, _)| {
        compare_candidates((offer_a, *score_a), (offer_b, *score_b))
    });
    scored.truncate(candidates_per_item);

    let recommended_index = select_recommended_index(&scored, filters.auto_apply_mode, weights);

    let candidates = scored
        .into_iter()
        .enumerate()
        .map(|(idx, (offer, score, breakdown))| {
            let is_recommended = recommended_index == Some(idx);
            let badges = badges_for(&scored_item, &offer, &breakdown, is_recommended);
            MigrationCandidate {
                flyer_product_id: offer.id,
                product_master_id: offer.product_master_id,
                store_id: offer.store_id,
                price_current: offer.price_current,
                price_original: offer.price_original,
                valid_to: offer.valid_to,
                score,
                score_breakdown: breakdown,
                badges,
                has_concrete_price: offer.has_concrete_price,
            }
        })
        .collect();

    Ok(SuggestionResult { candidates, recommended_index })
}

/// Spec §4.6 step 5: index 0 only pre-selects when it clears the confidence
/// threshold implied by `auto_apply_mode`, and never when it's advisory-only.
fn select_recommended_index(
    scored: &[(FlyerProduct, f64, scoring::ScoreBreakdown)],
    auto_apply_mode: AutoApplyMode,
    weights: &ScoreWeights,
) -> Option<usize> {
    let (top_offer, top_score, _) = scored.first()?;
    if !top_offer.has_concrete_price {
        return None;
    }

    let threshold = match auto_apply_mode {
        AutoApplyMode::Conservative => weights.same_brand + weights.original_store,
        AutoApplyMode::Balanced => 4.0,
        AutoApplyMode::Aggressive => f64::MIN,
    };

    (*top_score >= threshold).then_some(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::memory::InMemoryCatalog;
    use chrono::{Duration, Utc};
    use scoring::Badge;
    use uuid::Uuid;

    fn offer(store_id: catalog::types::StoreId, brand: &str, price: f64, concrete: bool) -> FlyerProduct {
        let now = Utc::now();
        FlyerProduct {
            id: Uuid::new_v4(),
            product_master_id: None,
            store_id,
            canonical_name: "Pienas 2.5% 1L".into(),
            brand: Some(brand.to_string()),
            size: Some("1L".into()),
            price_current: concrete.then_some(price),
            price_original: None,
            special_discount: None,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(6),
            has_concrete_price: concrete,
        }
    }

    #[tokio::test]
    async fn same_store_strategy_surfaces_same_brand_top_candidate() {
        let maxima = Uuid::new_v4();
        let cat = InMemoryCatalog::new();
        cat.insert_offer(offer(maxima, "Zemaitijos", 1.55, true)).await;

        let request = SuggestionRequest {
            canonical_name: "Pienas 2.5% 1L".into(),
            brand: Some("Zemaitijos".into()),
            original_store_id: maxima,
            size: Some("1L".into()),
            last_known_price: Some(1.50),
        };
        let filters = Filters { store_strategy: StoreStrategy::SameStore, ..Default::default() };

        let result = generate_candidates(&cat, &request, &filters, &ScoreWeights::default(), 5, 0.3)
            .await
            .unwrap();

        assert_eq!(result.candidates.len(), 1);
        assert!(result.candidates[0].badges.contains(&Badge::SameBrand));
        assert_eq!(result.recommended_index, Some(0));
    }

    #[tokio::test]
    async fn preferred_stores_still_probes_original_store_for_same_brand() {
        let maxima = Uuid::new_v4();
        let rimi = Uuid::new_v4();
        let cat = InMemoryCatalog::new();
        cat.insert_offer(offer(maxima, "Svyturys", 1.25, true)).await;
        cat.insert_offer(offer(rimi, "Generic", 0.99, true)).await;

        let request = SuggestionRequest {
            canonical_name: "Pienas 2.5% 1L".into(),
            brand: Some("Svyturys".into()),
            original_store_id: maxima,
            size: None,
            last_known_price: None,
        };
        let filters = Filters {
            store_strategy: StoreStrategy::PreferredStores,
            preferred_store_ids: vec![rimi],
            ..Default::default()
        };

        let result = generate_candidates(&cat, &request, &filters, &ScoreWeights::default(), 5, 0.3)
            .await
            .unwrap();

        assert!(result.candidates.iter().any(|c| c.store_id == maxima && c.badges.contains(&Badge::SameBrand)));
    }

    #[tokio::test]
    async fn advisory_candidate_is_never_recommended() {
        let maxima = Uuid::new_v4();
        let cat = InMemoryCatalog::new();
        cat.insert_offer(offer(maxima, "Generic", 0.0, false)).await;

        let request = SuggestionRequest {
            canonical_name: "Pienas 2.5% 1L".into(),
            brand: None,
            original_store_id: maxima,
            size: None,
            last_known_price: None,
        };
        let filters = Filters { require_concrete_price: false, ..Default::default() };

        let result = generate_candidates(&cat, &request, &filters, &ScoreWeights::default(), 5, 0.3)
            .await
            .unwrap();

        assert_eq!(result.candidates.len(), 1);
        assert!(result.candidates[0].badges.contains(&Badge::Advisory));
        assert_eq!(result.recommended_index, None);
    }
}
