//! The state machine stitching every other component together (spec §4.1).
//! Collaborators are injected as trait objects, mirroring the teacher's
//! preference for DI-by-trait over a monolithic generic parameter list.

use std::collections::HashMap;
use std::sync::Arc;

use catalog::OfferCatalog;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;
use wizard_common::clock::Clock;
use wizard_session::listlock::ListLock;
use wizard_session::model::{
    Decision, DecisionAction, Filters, ListItemId, PendingItem, PendingReason, SessionId, SessionState, WizardSession,
};
use wizard_session::ratelimit::RateLimiter;
use wizard_session::store::{cas_retry, SessionStore};

use crate::config::WizardConfig;
use crate::error::WizardError;
use crate::list_mutator::ListMutator;
use crate::list_reader::ShoppingListReader;
use crate::metrics::Counters;
use crate::model::{DecisionTemplate, ItemOrigin, Receipt, ShoppingListItem};
use crate::{committer, revalidator};

pub struct WizardService {
    catalog: Arc<dyn OfferCatalog>,
    session_store: Arc<dyn SessionStore>,
    list_lock: Arc<dyn ListLock>,
    rate_limiter: Arc<dyn RateLimiter>,
    list_mutator: Arc<dyn ListMutator>,
    list_reader: Arc<dyn ShoppingListReader>,
    clock: Arc<dyn Clock>,
    config: WizardConfig,
    metrics: Counters,
    receipts: Mutex<HashMap<(SessionId, String), Receipt>>,
}

impl WizardService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn OfferCatalog>,
        session_store: Arc<dyn SessionStore>,
        list_lock: Arc<dyn ListLock>,
        rate_limiter: Arc<dyn RateLimiter>,
        list_mutator: Arc<dyn ListMutator>,
        list_reader: Arc<dyn ShoppingListReader>,
        clock: Arc<dyn Clock>,
        config: WizardConfig,
        metrics: Counters,
    ) -> Self {
        Self {
            catalog,
            session_store,
            list_lock,
            rate_limiter,
            list_mutator,
            list_reader,
            clock,
            config,
            metrics,
            receipts: Mutex::new(HashMap::new()),
        }
    }

    fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.config.session_ttl_secs)
    }

    pub async fn start_wizard(
        &self,
        user_id: &str,
        list_id: &str,
        filters: Option<Filters>,
    ) -> Result<(WizardSession, Option<suggestion::SuggestionResult>), WizardError> {
        let now = self.clock.now();

        self.rate_limiter
            .check_and_record(user_id, now, self.config.rate_limit_starts_per_hour, 3600)
            .await?;

        let session_id = Uuid::new_v4();
        self.list_lock.acquire(list_id, session_id, self.config.session_ttl_secs as u64).await?;

        let result = self.start_wizard_locked(session_id, user_id, list_id, filters, now).await;
        if result.is_err() {
            let _ = self.list_lock.release(list_id, session_id).await;
        }
        result
    }

    async fn start_wizard_locked(
        &self,
        session_id: SessionId,
        user_id: &str,
        list_id: &str,
        filters: Option<Filters>,
        now: chrono::DateTime<Utc>,
    ) -> Result<(WizardSession, Option<suggestion::SuggestionResult>), WizardError> {
        let items = self.list_reader.get_items(list_id).await.map_err(WizardError::Internal)?;
        let mut filters = filters.unwrap_or_default();
        if filters.max_stores > self.config.max_stores_ceiling {
            filters.max_stores = self.config.max_stores_ceiling;
        }

        let (pending_items, item_index) = self.compute_pending_items(&items, &filters, now).await?;
        if pending_items.is_empty() {
            return Err(WizardError::Validation("NO_EXPIRED_ITEMS".into()));
        }

        let mut session = WizardSession::new(session_id, user_id.to_string(), list_id.to_string(), filters, pending_items, now, self.ttl());
        session.state = SessionState::InProgress;

        self.session_store.create(&session, self.config.session_ttl_secs as u64).await?;
        Counters::add(&self.metrics.wizard_items_flagged_total, session.pending_items.len() as u64);

        let first_candidates = match session.pending_items.first() {
            Some(first) => match item_index.get(&first.item_id) {
                Some(item) => Some(self.candidates_for_item(item, &session.filters).await?),
                None => None,
            },
            None => None,
        };

        Ok((session, first_candidates))
    }

    async fn compute_pending_items(
        &self,
        items: &[ShoppingListItem],
        filters: &Filters,
        now: chrono::DateTime<Utc>,
    ) -> Result<(Vec<PendingItem>, HashMap<ListItemId, ShoppingListItem>), WizardError> {
        let mut pending = Vec::new();
        let mut index = HashMap::new();

        for item in items.iter().filter(|i| i.origin == ItemOrigin::Flyer) {
            let reason = match item.flyer_product_id {
                None => Some(PendingReason::Unavailable),
                Some(flyer_product_id) => match self.catalog.get_offer(flyer_product_id).await {
                    Err(_) => Some(PendingReason::Unavailable),
                    Ok(offer) if offer.valid_to < now => Some(PendingReason::Expired),
                    Ok(_) if filters.include_better_deals && self.has_better_deal(item).await? => {
                        Some(PendingReason::BetterDeal)
                    }
                    Ok(_) => None,
                },
            };

            if let Some(reason) = reason {
                pending.push(PendingItem { item_id: item.id, reason, category_group: None, linked_at: item.linked_at });
                index.insert(item.id, item.clone());
            }
        }

        pending.sort_by(|a, b| a.reason.cmp(&b.reason).then(a.linked_at.cmp(&b.linked_at)));
        Ok((pending, index))
    }

    async fn has_better_deal(&self, item: &ShoppingListItem) -> Result<bool, WizardError> {
        let Some(last_known_price) = item.last_known_price else { return Ok(false) };
        let alternatives = self
            .catalog
            .search_offers(catalog::SearchOffers {
                canonical_name: &item.canonical_name,
                brand: item.brand.as_deref(),
                store_ids: None,
                require_concrete_price: true,
                trigram_threshold: self.config.trigram_threshold,
            })
            .await?;

        Ok(alternatives.iter().any(|offer| {
            Some(offer.id) != item.flyer_product_id && offer.price_current.is_some_and(|p| p < last_known_price)
        }))
    }

    async fn candidates_for_item(
        &self,
        item: &ShoppingListItem,
        filters: &Filters,
    ) -> Result<suggestion::SuggestionResult, WizardError> {
        let request = suggestion::SuggestionRequest {
            canonical_name: item.canonical_name.clone(),
            brand: item.brand.clone(),
            original_store_id: item.store_id.unwrap_or_else(Uuid::nil),
            size: item.size.clone(),
            last_known_price: item.last_known_price,
        };
        let result = suggestion::generate_candidates(
            self.catalog.as_ref(),
            &request,
            filters,
            &self.config.score_weights,
            self.config.candidates_per_item,
            self.config.trigram_threshold,
        )
        .await?;
        Counters::add(&self.metrics.wizard_suggestions_returned_total, result.candidates.len() as u64);
        Ok(result)
    }

    pub async fn get_session(&self, session_id: SessionId) -> Result<WizardSession, WizardError> {
        let now = self.clock.now();
        let session = self.session_store.load(session_id).await?;
        if session.is_expired(now) {
            let _ = self.list_lock.release(&session.list_id, session_id).await;
            return Err(WizardError::Expired);
        }
        Ok(session)
    }

    pub async fn decide_item(
        &self,
        session_id: SessionId,
        item_id: ListItemId,
        action: DecisionAction,
        selected_flyer_product_id: Option<catalog::types::FlyerProductId>,
        idempotency_key: Option<String>,
    ) -> Result<WizardSession, WizardError> {
        let now = self.clock.now();
        let current = self.session_store.load(session_id).await?;
        let list_items = self.list_reader.get_items(&current.list_id).await.map_err(WizardError::Internal)?;

        let ttl_secs = self.config.session_ttl_secs as u64;
        let decision = self
            .resolve_decision(item_id, action, selected_flyer_product_id, idempotency_key.clone(), &list_items, Some(&current.filters), now)
            .await?;

        let updated = cas_retry(self.session_store.as_ref(), session_id, ttl_secs, 5, |session| {
            if !matches!(session.state, SessionState::InProgress | SessionState::Reviewing) {
                return Err(wizard_session::store::SessionStoreError::Backend(anyhow::anyhow!(
                    "session not accepting decisions in state {}",
                    session.state
                )));
            }
            if let Some(key) = &idempotency_key {
                if session.find_by_idempotency_key(key).is_some() {
                    return Ok(());
                }
            }
            if !session.pending_items.iter().any(|p| p.item_id == item_id) {
                return Err(wizard_session::store::SessionStoreError::Backend(anyhow::anyhow!("item not pending")));
            }
            if session.decisions.contains_key(&item_id) {
                return Err(wizard_session::store::SessionStoreError::Backend(anyhow::anyhow!("item already decided")));
            }

            session.decisions.insert(item_id, decision.clone());
            session.current_index += 1;
            if let Some(key) = &idempotency_key {
                session.record_idempotency_key(key.clone(), item_id);
            }
            if session.all_items_resolved() {
                session.state = SessionState::Reviewing;
            }
            session.touch(now, chrono::Duration::seconds(self.config.session_ttl_secs));
            Ok(())
        })
        .await?;

        Counters::add(&self.metrics.wizard_decisions_total, 1);
        Ok(updated)
    }

    async fn resolve_decision(
        &self,
        item_id: ListItemId,
        action: DecisionAction,
        selected_flyer_product_id: Option<catalog::types::FlyerProductId>,
        idempotency_key: Option<String>,
        list_items: &[ShoppingListItem],
        filters: Option<&Filters>,
        now: chrono::DateTime<Utc>,
    ) -> Result<Decision, WizardError> {
        if action != DecisionAction::Replace {
            return Ok(Decision {
                item_id,
                action,
                selected_flyer_product_id: None,
                selected_master_id: None,
                recorded_at: now,
                idempotency_key,
                seen_price_current: None,
                seen_valid_to: None,
                seen_has_concrete_price: None,
                seen_store_id: None,
                seen_canonical_name: None,
                seen_brand: None,
                seen_size: None,
            });
        }

        let flyer_product_id = selected_flyer_product_id
            .ok_or_else(|| WizardError::Validation("REPLACE requires selected_flyer_product_id".into()))?;

        let item = list_items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| WizardError::NotFound(format!("list item {item_id}")))?;

        let default_filters = Filters::default();
        let filters = filters.unwrap_or(&default_filters);
        let candidates = self.candidates_for_item(item, filters).await?;
        let chosen = candidates
            .candidates
            .iter()
            .find(|c| c.flyer_product_id == flyer_product_id)
            .ok_or_else(|| WizardError::Validation("selection is not in the current candidate set".into()))?;

        if !chosen.has_concrete_price {
            return Err(WizardError::Validation("cannot REPLACE with an advisory-only candidate".into()));
        }

        Ok(Decision {
            item_id,
            action: DecisionAction::Replace,
            selected_flyer_product_id: Some(flyer_product_id),
            selected_master_id: chosen.product_master_id,
            recorded_at: now,
            idempotency_key,
            seen_price_current: chosen.price_current,
            seen_valid_to: Some(chosen.valid_to),
            seen_has_concrete_price: Some(chosen.has_concrete_price),
            seen_store_id: Some(chosen.store_id),
            seen_canonical_name: Some(item.canonical_name.clone()),
            seen_brand: item.brand.clone(),
            seen_size: item.size.clone(),
        })
    }

    pub async fn apply_bulk_decisions(
        &self,
        session_id: SessionId,
        item_ids: &[ListItemId],
        template: DecisionTemplate,
        idempotency_key: Option<String>,
    ) -> Result<WizardSession, WizardError> {
        let session = self.session_store.load(session_id).await?;
        let list_items = self.list_reader.get_items(&session.list_id).await.map_err(WizardError::Internal)?;
        let now = self.clock.now();

        let mut resolved: HashMap<ListItemId, Decision> = HashMap::new();
        let mut cap_selections = Vec::new();

        for &item_id in item_ids {
            if template.action != DecisionAction::Replace {
                let decision = self
                    .resolve_decision(item_id, template.action, None, idempotency_key.clone(), &list_items, Some(&session.filters), now)
                    .await?;
                resolved.insert(item_id, decision);
                continue;
            }

            let item = list_items
                .iter()
                .find(|i| i.id == item_id)
                .ok_or_else(|| WizardError::NotFound(format!("list item {item_id}")))?;
            let candidates = self.candidates_for_item(item, &session.filters).await?;

            let Some(chosen_idx) = candidates.recommended_index else {
                resolved.insert(
                    item_id,
                    self.resolve_decision(item_id, DecisionAction::Keep, None, idempotency_key.clone(), &list_items, Some(&session.filters), now)
                        .await?,
                );
                continue;
            };

            let mut candidates = candidates.candidates;
            let chosen = candidates.remove(chosen_idx);
            let brand_matched = chosen.badges.contains(&scoring::Badge::SameBrand);
            cap_selections.push(suggestion::StoreCapSelection { item_id, chosen, alternatives: candidates, brand_matched });
        }

        let cap_outcome = suggestion::enforce_store_cap(&mut cap_selections, session.filters.max_stores);

        for selection in cap_selections {
            if cap_outcome.downgraded.contains(&selection.item_id) {
                let decision = self
                    .resolve_decision(selection.item_id, DecisionAction::Keep, None, idempotency_key.clone(), &list_items, Some(&session.filters), now)
                    .await?;
                resolved.insert(selection.item_id, decision);
                continue;
            }
            let item = list_items.iter().find(|i| i.id == selection.item_id);
            resolved.insert(
                selection.item_id,
                Decision {
                    item_id: selection.item_id,
                    action: DecisionAction::Replace,
                    selected_flyer_product_id: Some(selection.chosen.flyer_product_id),
                    selected_master_id: selection.chosen.product_master_id,
                    recorded_at: now,
                    idempotency_key: idempotency_key.clone(),
                    seen_price_current: selection.chosen.price_current,
                    seen_valid_to: Some(selection.chosen.valid_to),
                    seen_has_concrete_price: Some(selection.chosen.has_concrete_price),
                    seen_store_id: Some(selection.chosen.store_id),
                    seen_canonical_name: item.map(|i| i.canonical_name.clone()),
                    seen_brand: item.and_then(|i| i.brand.clone()),
                    seen_size: item.and_then(|i| i.size.clone()),
                },
            );
        }

        let resolved: Vec<Decision> = resolved.into_values().collect();
        let ttl_secs = self.config.session_ttl_secs as u64;
        let updated = cas_retry(self.session_store.as_ref(), session_id, ttl_secs, 5, |session| {
            for decision in &resolved {
                if !session.decisions.contains_key(&decision.item_id) {
                    session.decisions.insert(decision.item_id, decision.clone());
                }
            }
            if session.all_items_resolved() {
                session.state = SessionState::Reviewing;
            }
            session.touch(now, chrono::Duration::seconds(self.config.session_ttl_secs));
            Ok(())
        })
        .await?;

        Ok(updated)
    }

    pub async fn confirm_wizard(&self, session_id: SessionId, idempotency_key: Option<String>) -> Result<Receipt, WizardError> {
        if let Some(key) = &idempotency_key {
            if let Some(receipt) = self.receipts.lock().await.get(&(session_id, key.clone())).cloned() {
                return Ok(receipt);
            }
        }

        let now = self.clock.now();
        let session = self.session_store.load(session_id).await?;
        if session.state != SessionState::Reviewing {
            return Err(WizardError::Conflict(format!("session not ready to confirm, state={}", session.state)));
        }

        let decisions: Vec<Decision> = session.decisions.values().cloned().collect();
        let report = revalidator::revalidate(self.catalog.as_ref(), &decisions, now, &self.metrics)
            .await
            .map_err(WizardError::Internal)?;

        if report.outcome == revalidator::RevalidationOutcome::Stale {
            let ttl_secs = self.config.session_ttl_secs as u64;
            let stale_ids = report.stale_item_ids.clone();
            cas_retry(self.session_store.as_ref(), session_id, ttl_secs, 5, |session| {
                for item_id in &stale_ids {
                    session.decisions.remove(item_id);
                }
                session.state = SessionState::InProgress;
                session.touch(now, chrono::Duration::seconds(self.config.session_ttl_secs));
                Ok(())
            })
            .await?;

            return Err(WizardError::Stale { item_ids: report.stale_item_ids });
        }

        let receipt = committer::commit(
            self.list_mutator.as_ref(),
            session_id,
            &session.list_id,
            &decisions,
            now,
            self.config.retry_attempts_commit,
            &self.metrics,
        )
        .await
        .map_err(WizardError::Internal)?;

        let ttl_secs = self.config.session_ttl_secs as u64;
        cas_retry(self.session_store.as_ref(), session_id, ttl_secs, 5, |session| {
            session.state = SessionState::Completed;
            session.touch(now, chrono::Duration::seconds(self.config.session_ttl_secs));
            Ok(())
        })
        .await?;

        self.list_lock.release(&session.list_id, session_id).await.ok();

        if let Some(key) = idempotency_key {
            self.receipts.lock().await.insert((session_id, key), receipt.clone());
        }

        Ok(receipt)
    }

    pub async fn cancel_wizard(&self, session_id: SessionId) -> Result<(), WizardError> {
        let now = self.clock.now();
        let ttl_secs = self.config.session_ttl_secs as u64;
        let session = cas_retry(self.session_store.as_ref(), session_id, ttl_secs, 5, |session| {
            session.state = SessionState::Cancelled;
            session.touch(now, chrono::Duration::seconds(self.config.session_ttl_secs));
            Ok(())
        })
        .await?;

        self.list_lock.release(&session.list_id, session_id).await.ok();
        Counters::add(&self.metrics.wizard_cancellations_total, 1);
        Ok(())
    }
}

