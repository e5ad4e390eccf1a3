//! In-memory `OfferCatalog`, used by tests and as a local dev fallback.
//! Matching is a simple trigram-ish substring/overlap score rather than a
//! real PostgreSQL trigram index; good enough to exercise the two-pass
//! search contract without a database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use wizard_common::normalize::{brand_eq, canonical_name};

use crate::types::{FlyerProduct, FlyerProductId, ProductMaster, ProductMasterId};
use crate::{CatalogError, OfferCatalog, SearchOffers};

#[derive(Default)]
pub struct InMemoryCatalog {
    pub offers: Arc<Mutex<HashMap<FlyerProductId, FlyerProduct>>>,
    pub masters: Arc<Mutex<HashMap<ProductMasterId, ProductMaster>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_offer(&self, offer: FlyerProduct) {
        self.offers.lock().await.insert(offer.id, offer);
    }

    pub async fn insert_master(&self, master: ProductMaster) {
        self.masters.lock().await.insert(master.id, master);
    }
}

/// Trigram-ish similarity: fraction of 3-grams of `needle` present in
/// `haystack`. Cheap stand-in for PostgreSQL's `pg_trgm` similarity used by
/// the real backend.
fn trigram_similarity(needle: &str, haystack: &str) -> f32 {
    let grams = |s: &str| -> Vec<String> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() < 3 {
            return vec![s.to_string()];
        }
        chars.windows(3).map(|w| w.iter().collect()).collect()
    };

    let needle_grams = grams(needle);
    if needle_grams.is_empty() {
        return 0.0;
    }
    let haystack_grams: Vec<String> = grams(haystack);

    let hits = needle_grams.iter().filter(|g| haystack_grams.contains(g)).count();
    hits as f32 / needle_grams.len() as f32
}

#[async_trait]
impl OfferCatalog for InMemoryCatalog {
    async fn search_offers(&self, query: SearchOffers<'_>) -> Result<Vec<FlyerProduct>, CatalogError> {
        let offers = self.offers.lock().await;
        let needle = canonical_name(query.canonical_name);

        let mut out: Vec<FlyerProduct> = offers
            .values()
            .filter(|o| {
                let haystack = canonical_name(&o.canonical_name);
                let sim = trigram_similarity(&needle, &haystack);
                let name_matches = needle == haystack || sim >= query.trigram_threshold;
                if !name_matches {
                    return false;
                }

                if let Some(brand) = query.brand {
                    match &o.brand {
                        Some(b) if brand_eq(b, brand) => {}
                        _ => return false,
                    }
                }

                if query.require_concrete_price && !o.has_concrete_price {
                    return false;
                }

                if let Some(store_ids) = query.store_ids {
                    if !store_ids.contains(&o.store_id) {
                        return false;
                    }
                }

                true
            })
            .cloned()
            .collect();

        out.sort_by_key(|o| o.id);
        Ok(out)
    }

    async fn get_offer(&self, id: FlyerProductId) -> Result<FlyerProduct, CatalogError> {
        self.offers.lock().await.get(&id).cloned().ok_or(CatalogError::NotFound)
    }

    async fn resolve_master(&self, id: ProductMasterId) -> Result<ProductMaster, CatalogError> {
        self.masters.lock().await.get(&id).cloned().ok_or(CatalogError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn offer(name: &str, brand: &str, concrete: bool) -> FlyerProduct {
        let now = Utc::now();
        FlyerProduct {
            id: Uuid::new_v4(),
            product_master_id: None,
            store_id: Uuid::new_v4(),
            canonical_name: name.to_string(),
            brand: Some(brand.to_string()),
            size: None,
            price_current: concrete.then_some(1.0),
            price_original: None,
            special_discount: None,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(6),
            has_concrete_price: concrete,
        }
    }

    #[tokio::test]
    async fn brand_filter_excludes_mismatched_brand() {
        let cat = InMemoryCatalog::new();
        cat.insert_offer(offer("Pienas 2.5% 1L", "Zemaitijos", true)).await;
        cat.insert_offer(offer("Pienas 2.5% 1L", "Rokiskio", true)).await;

        let results = cat
            .search_offers(SearchOffers {
                canonical_name: "Pienas 2.5% 1L",
                brand: Some("Zemaitijos"),
                store_ids: None,
                require_concrete_price: true,
                trigram_threshold: 0.3,
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].brand.as_deref(), Some("Zemaitijos"));
    }

    #[tokio::test]
    async fn require_concrete_price_filters_advisory_offers() {
        let cat = InMemoryCatalog::new();
        cat.insert_offer(offer("Cukraus maiselis 1kg", "Generic", false)).await;

        let results = cat
            .search_offers(SearchOffers {
                canonical_name: "Cukraus maiselis 1kg",
                brand: None,
                store_ids: None,
                require_concrete_price: true,
                trigram_threshold: 0.3,
            })
            .await
            .unwrap();

        assert!(results.is_empty());

        let results = cat
            .search_offers(SearchOffers {
                canonical_name: "Cukraus maiselis 1kg",
                brand: None,
                store_ids: None,
                require_concrete_price: false,
                trigram_threshold: 0.3,
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
    }
}
