//! End-to-end coverage of `WizardService` against the in-memory
//! collaborators, exercising the session lifecycle described for each
//! operation in isolation from any real database or transport.

use std::sync::Arc;

use catalog::memory::InMemoryCatalog;
use catalog::types::FlyerProduct;
use chrono::{Duration, Utc};
use uuid::Uuid;
use wizard::config::WizardConfig;
use wizard::list_mutator::memory::InMemoryListMutator;
use wizard::list_reader::memory::InMemoryListReader;
use wizard::model::{ItemOrigin, ItemStatus, ShoppingListItem};
use wizard::{Counters, WizardError, WizardService};
use wizard_common::clock::FixedClock;
use wizard_session::listlock::memory::InMemoryListLock;
use wizard_session::model::{DecisionAction, Filters, SessionState, StoreStrategy};
use wizard_session::ratelimit::memory::InMemoryRateLimiter;
use wizard_session::store_memory::InMemorySessionStore;

fn flyer_offer(store_id: Uuid, name: &str, brand: &str, price: f64, valid_to: chrono::DateTime<Utc>) -> FlyerProduct {
    let now = Utc::now();
    FlyerProduct {
        id: Uuid::new_v4(),
        product_master_id: None,
        store_id,
        canonical_name: name.to_string(),
        brand: Some(brand.to_string()),
        size: Some("1L".into()),
        price_current: Some(price),
        price_original: Some(price + 0.30),
        special_discount: None,
        valid_from: now - Duration::days(7),
        valid_to,
        has_concrete_price: true,
    }
}

fn list_item(id: Uuid, flyer_product_id: Option<Uuid>, store_id: Uuid, name: &str, brand: &str, price: f64) -> ShoppingListItem {
    ShoppingListItem {
        id,
        list_id: "list-1".into(),
        origin: ItemOrigin::Flyer,
        product_master_id: None,
        flyer_product_id,
        store_id: Some(store_id),
        status: ItemStatus::Active,
        canonical_name: name.to_string(),
        brand: Some(brand.to_string()),
        size: Some("1L".into()),
        last_known_price: Some(price),
        linked_at: Utc::now() - Duration::days(10),
    }
}

struct Harness {
    service: WizardService,
    catalog: Arc<InMemoryCatalog>,
    list_reader: Arc<InMemoryListReader>,
    list_mutator: Arc<InMemoryListMutator>,
}

fn build_harness(now: chrono::DateTime<Utc>) -> Harness {
    let catalog = Arc::new(InMemoryCatalog::new());
    let list_reader = Arc::new(InMemoryListReader::new());
    let list_mutator = Arc::new(InMemoryListMutator::new());

    let service = WizardService::new(
        catalog.clone(),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryListLock::new()),
        Arc::new(InMemoryRateLimiter::new()),
        list_mutator.clone(),
        list_reader.clone(),
        Arc::new(FixedClock(now)),
        WizardConfig::default(),
        Counters::new(),
    );

    Harness { service, catalog, list_reader, list_mutator }
}

/// S1: an expired milk item gets a same-store, same-brand replacement
/// surfaced, the user accepts it, and Confirm applies it to the list.
#[tokio::test]
async fn happy_path_replace_and_confirm() {
    let now = Utc::now();
    let h = build_harness(now);

    let maxima = Uuid::new_v4();
    let item_id = Uuid::new_v4();
    let expired_flyer_id = Uuid::new_v4();

    h.catalog
        .insert_offer(FlyerProduct {
            id: expired_flyer_id,
            product_master_id: None,
            store_id: maxima,
            canonical_name: "Pienas 2.5% 1L".into(),
            brand: Some("Zemaitijos".into()),
            size: Some("1L".into()),
            price_current: Some(1.49),
            price_original: None,
            special_discount: None,
            valid_from: now - Duration::days(14),
            valid_to: now - Duration::days(1),
            has_concrete_price: true,
        })
        .await;

    let fresh_offer = flyer_offer(maxima, "Pienas 2.5% 1L", "Zemaitijos", 1.55, now + Duration::days(6));
    h.catalog.insert_offer(fresh_offer.clone()).await;

    let item = list_item(item_id, Some(expired_flyer_id), maxima, "Pienas 2.5% 1L", "Zemaitijos", 1.49);
    h.list_reader.seed("list-1", vec![item]).await;

    let (session, first_candidates) = h.service.start_wizard("user-1", "list-1", None).await.unwrap();
    assert_eq!(session.state, SessionState::InProgress);
    assert_eq!(session.pending_items.len(), 1);
    let candidates = first_candidates.expect("first item should have candidates precomputed");
    assert!(!candidates.candidates.is_empty());

    let session = h
        .service
        .decide_item(session.id, item_id, DecisionAction::Replace, Some(fresh_offer.id), None)
        .await
        .unwrap();
    assert_eq!(session.state, SessionState::Reviewing);

    let receipt = h.service.confirm_wizard(session.id, None).await.unwrap();
    assert_eq!(receipt.applied.len(), 1);
    assert_eq!(receipt.applied[0].flyer_product_id, Some(fresh_offer.id));

    let patched = h.list_mutator.items.lock().await;
    let patch = patched.get(&item_id).expect("commit should have patched the list item");
    assert_eq!(patch.flyer_product_id, fresh_offer.id);
    assert_eq!(patch.last_known_price, 1.55);

    let session = h.service.get_session(session.id).await.unwrap();
    assert_eq!(session.state, SessionState::Completed);
}

/// S5: a flyer rotation between Decide and Confirm must surface as STALE
/// rather than silently committing the user's now-outdated selection.
#[tokio::test]
async fn confirm_detects_stale_selection_and_reopens_for_review() {
    let now = Utc::now();
    let h = build_harness(now);

    let maxima = Uuid::new_v4();
    let item_id = Uuid::new_v4();
    let expired_flyer_id = Uuid::new_v4();

    h.catalog
        .insert_offer(flyer_offer(maxima, "Duona", "Vilniaus", 0.99, now - Duration::days(1)))
        .await;
    let replacement = flyer_offer(maxima, "Duona", "Vilniaus", 1.10, now + Duration::hours(2));
    h.catalog.insert_offer(replacement.clone()).await;

    let item = list_item(item_id, Some(expired_flyer_id), maxima, "Duona", "Vilniaus", 0.99);
    h.list_reader.seed("list-1", vec![item]).await;

    let (session, _) = h.service.start_wizard("user-1", "list-1", None).await.unwrap();
    let session = h
        .service
        .decide_item(session.id, item_id, DecisionAction::Replace, Some(replacement.id), None)
        .await
        .unwrap();
    assert_eq!(session.state, SessionState::Reviewing);

    // The flyer rotates out from under the decided selection.
    let mut rotated = replacement.clone();
    rotated.valid_to = now - Duration::minutes(1);
    h.catalog.insert_offer(rotated).await;

    let err = h.service.confirm_wizard(session.id, None).await.unwrap_err();
    assert!(matches!(err, WizardError::Stale { .. }));

    let session = h.service.get_session(session.id).await.unwrap();
    assert_eq!(session.state, SessionState::InProgress);
    assert!(session.decisions.is_empty());
}

/// S6: repeated StartWizard calls beyond the per-hour cap are rejected.
#[tokio::test]
async fn start_wizard_is_rate_limited_per_user() {
    let now = Utc::now();
    let h = build_harness(now);
    let maxima = Uuid::new_v4();

    for n in 0..3 {
        let item_id = Uuid::new_v4();
        let flyer_id = Uuid::new_v4();
        h.catalog
            .insert_offer(flyer_offer(maxima, &format!("Item {n}"), "Brand", 1.0, now - Duration::days(1)))
            .await;
        let item = list_item(item_id, Some(flyer_id), maxima, &format!("Item {n}"), "Brand", 1.0);
        h.list_reader.seed(&format!("list-{n}"), vec![item]).await;
    }

    let mut config = WizardConfig::default();
    config.rate_limit_starts_per_hour = 2;
    let service = WizardService::new(
        h.catalog.clone(),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryListLock::new()),
        Arc::new(InMemoryRateLimiter::new()),
        h.list_mutator.clone(),
        h.list_reader.clone(),
        Arc::new(FixedClock(now)),
        config,
        Counters::new(),
    );

    service.start_wizard("user-1", "list-0", None).await.unwrap();
    service.start_wizard("user-1", "list-1", None).await.unwrap();
    let err = service.start_wizard("user-1", "list-2", None).await.unwrap_err();
    assert!(matches!(err, WizardError::RateLimited { .. }));
}

/// Items with no expired/unavailable/better-deal flyer link never enter the
/// wizard; StartWizard should fail fast with NO_EXPIRED_ITEMS rather than
/// open an empty session.
#[tokio::test]
async fn start_wizard_fails_when_nothing_needs_migration() {
    let now = Utc::now();
    let h = build_harness(now);
    let maxima = Uuid::new_v4();

    let item_id = Uuid::new_v4();
    let real_offer = flyer_offer(maxima, "Kava", "Paulig", 3.49, now + Duration::days(3));
    h.catalog.insert_offer(real_offer.clone()).await;

    let mut clean_item = list_item(item_id, Some(real_offer.id), maxima, "Kava", "Paulig", 3.49);
    clean_item.last_known_price = Some(real_offer.price_current.unwrap());
    h.list_reader.seed("list-clean", vec![clean_item]).await;

    let err = h.service.start_wizard("user-1", "list-clean", None).await.unwrap_err();
    assert!(matches!(err, WizardError::Validation(msg) if msg == "NO_EXPIRED_ITEMS"));
}

/// Bulk-applying REPLACE across two items that both resolve to the same
/// store respects a max_stores=1 cap without downgrading either pick.
#[tokio::test]
async fn bulk_apply_keeps_replacements_within_store_cap() {
    let now = Utc::now();
    let h = build_harness(now);
    let maxima = Uuid::new_v4();

    let item_a = Uuid::new_v4();
    let item_b = Uuid::new_v4();
    let expired_a = Uuid::new_v4();
    let expired_b = Uuid::new_v4();

    h.catalog.insert_offer(flyer_offer(maxima, "Pienas", "Zemaitijos", 1.49, now - Duration::days(1))).await;
    h.catalog.insert_offer(flyer_offer(maxima, "Duona", "Vilniaus", 0.99, now - Duration::days(1))).await;
    let replacement_a = flyer_offer(maxima, "Pienas", "Zemaitijos", 1.55, now + Duration::days(5));
    let replacement_b = flyer_offer(maxima, "Duona", "Vilniaus", 1.05, now + Duration::days(5));
    h.catalog.insert_offer(replacement_a.clone()).await;
    h.catalog.insert_offer(replacement_b.clone()).await;

    let items = vec![
        list_item(item_a, Some(expired_a), maxima, "Pienas", "Zemaitijos", 1.49),
        list_item(item_b, Some(expired_b), maxima, "Duona", "Vilniaus", 0.99),
    ];
    h.list_reader.seed("list-1", vec![items[0].clone(), items[1].clone()]).await;

    let (session, _) = h.service.start_wizard("user-1", "list-1", None).await.unwrap();
    assert_eq!(session.filters.max_stores, 1);

    let session = h
        .service
        .apply_bulk_decisions(
            session.id,
            &[item_a, item_b],
            wizard::model::DecisionTemplate { action: DecisionAction::Replace, selection_rule: Some(wizard::model::SelectionRule::TopRanked) },
            None,
        )
        .await
        .unwrap();

    assert_eq!(session.decisions.len(), 2);
    let stores: std::collections::HashSet<_> =
        session.decisions.values().filter_map(|d| d.seen_store_id).collect();
    assert_eq!(stores.len(), 1, "both replacements resolved to the same store, so no cap swap was needed");
}

/// CancelWizard releases the list lock so a fresh StartWizard can acquire it.
#[tokio::test]
async fn cancel_wizard_releases_the_list_lock() {
    let now = Utc::now();
    let h = build_harness(now);
    let maxima = Uuid::new_v4();
    let item_id = Uuid::new_v4();
    let flyer_id = Uuid::new_v4();

    h.catalog.insert_offer(flyer_offer(maxima, "Sūris", "Dziugas", 2.49, now - Duration::days(1))).await;
    let item = list_item(item_id, Some(flyer_id), maxima, "Sūris", "Dziugas", 2.49);
    h.list_reader.seed("list-1", vec![item]).await;

    let (session, _) = h.service.start_wizard("user-1", "list-1", None).await.unwrap();
    h.service.cancel_wizard(session.id).await.unwrap();

    let (second, _) = h.service.start_wizard("user-1", "list-1", None).await.unwrap();
    assert_ne!(session.id, second.id);
}

#[tokio::test]
async fn decide_item_rejects_candidate_outside_current_search_results() {
    let now = Utc::now();
    let h = build_harness(now);
    let maxima = Uuid::new_v4();
    let item_id = Uuid::new_v4();
    let flyer_id = Uuid::new_v4();

    h.catalog.insert_offer(flyer_offer(maxima, "Jogurtas", "Rokiskio", 0.79, now - Duration::days(1))).await;
    let item = list_item(item_id, Some(flyer_id), maxima, "Jogurtas", "Rokiskio", 0.79);
    h.list_reader.seed("list-1", vec![item]).await;

    let (session, _) = h.service.start_wizard("user-1", "list-1", None).await.unwrap();

    let bogus_id = Uuid::new_v4();
    let err = h
        .service
        .decide_item(session.id, item_id, DecisionAction::Replace, Some(bogus_id), None)
        .await
        .unwrap_err();
    assert!(matches!(err, WizardError::Validation(_)));
}

#[test]
fn store_strategy_default_is_same_store() {
    assert_eq!(Filters::default().store_strategy, StoreStrategy::SameStore);
}
