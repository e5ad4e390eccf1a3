//! Confirm-time freshness check (spec §4.7). Re-fetches every REPLACE
//! decision's chosen offer and rejects the whole confirm if any has
//! meanwhile expired or been repriced.

use catalog::OfferCatalog;
use chrono::{DateTime, Utc};
use wizard_session::model::{Decision, DecisionAction, ListItemId};

use crate::metrics::Counters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevalidationOutcome {
    Ok,
    Stale,
}

pub struct RevalidationReport {
    pub outcome: RevalidationOutcome,
    pub stale_item_ids: Vec<ListItemId>,
}

pub async fn revalidate(
    catalog: &dyn OfferCatalog,
    decisions: &[Decision],
    now: DateTime<Utc>,
    metrics: &Counters,
) -> anyhow::Result<RevalidationReport> {
    let mut stale_item_ids = Vec::new();

    for decision in decisions {
        if decision.action != DecisionAction::Replace {
            continue;
        }
        let Some(flyer_product_id) = decision.selected_flyer_product_id else {
            continue;
        };

        let fresh = catalog.get_offer(flyer_product_id).await;
        let is_stale = match fresh {
            Err(_) => true,
            Ok(offer) => {
                offer.valid_to < now
                    || decision.seen_price_current != offer.price_current
                    || decision.seen_has_concrete_price != Some(offer.has_concrete_price)
            }
        };

        if is_stale {
            stale_item_ids.push(decision.item_id);
        }
    }

    let outcome = if stale_item_ids.is_empty() { RevalidationOutcome::Ok } else { RevalidationOutcome::Stale };

    match outcome {
        RevalidationOutcome::Ok => Counters::add(&metrics.wizard_revalidation_ok_total, 1),
        RevalidationOutcome::Stale => Counters::add(&metrics.wizard_revalidation_stale_total, 1),
    }

    Ok(RevalidationReport { outcome, stale_item_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::memory::InMemoryCatalog;
    use catalog::types::FlyerProduct;
    use chrono::Duration;
    use uuid::Uuid;

    fn offer(id: Uuid, price: f64, valid_to: DateTime<Utc>) -> FlyerProduct {
        FlyerProduct {
            id,
            product_master_id: None,
            store_id: Uuid::new_v4(),
            canonical_name: "Alus".into(),
            brand: None,
            size: None,
            price_current: Some(price),
            price_original: None,
            special_discount: None,
            valid_from: Utc::now() - Duration::days(1),
            valid_to,
            has_concrete_price: true,
        }
    }

    fn replace_decision(flyer_product_id: Uuid, seen_price: f64, seen_has_price: bool) -> Decision {
        Decision {
            item_id: Uuid::new_v4(),
            action: DecisionAction::Replace,
            selected_flyer_product_id: Some(flyer_product_id),
            selected_master_id: None,
            recorded_at: Utc::now(),
            idempotency_key: None,
            seen_price_current: Some(seen_price),
            seen_valid_to: None,
            seen_has_concrete_price: Some(seen_has_price),
            seen_store_id: None,
            seen_canonical_name: None,
            seen_brand: None,
            seen_size: None,
        }
    }

    #[tokio::test]
    async fn detects_stale_offer_when_flyer_expired_between_decide_and_confirm() {
        let now = Utc::now();
        let cat = InMemoryCatalog::new();
        let id = Uuid::new_v4();
        cat.insert_offer(offer(id, 2.99, now - Duration::minutes(1))).await;

        let decisions = vec![replace_decision(id, 2.99, true)];
        let report = revalidate(&cat, &decisions, now, &Counters::new()).await.unwrap();

        assert_eq!(report.outcome, RevalidationOutcome::Stale);
        assert_eq!(report.stale_item_ids.len(), 1);
    }

    #[tokio::test]
    async fn passes_when_nothing_changed() {
        let now = Utc::now();
        let cat = InMemoryCatalog::new();
        let id = Uuid::new_v4();
        cat.insert_offer(offer(id, 2.99, now + Duration::hours(2))).await;

        let decisions = vec![replace_decision(id, 2.99, true)];
        let report = revalidate(&cat, &decisions, now, &Counters::new()).await.unwrap();

        assert_eq!(report.outcome, RevalidationOutcome::Ok);
    }
}
