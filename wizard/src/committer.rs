//! Executes confirmed decisions in a single relational transaction (spec
//! §4.8). Grounded on the teacher's `commit_batch`: stage every write inside
//! one transaction object, commit once, retry the whole attempt with
//! jittered backoff on conflict.

use chrono::{DateTime, Utc};
use rand::Rng;
use wizard_session::model::{Decision, DecisionAction};

use crate::list_mutator::ListMutator;
use crate::metrics::Counters;
use crate::model::{ItemPatch, OfferSnapshot, Receipt};

pub async fn commit(
    mutator: &dyn ListMutator,
    session_id: wizard_session::model::SessionId,
    list_id: &str,
    decisions: &[Decision],
    now: DateTime<Utc>,
    retry_attempts: u32,
    metrics: &Counters,
) -> anyhow::Result<Receipt> {
    let mut last_err = None;

    for attempt in 0..=retry_attempts {
        if attempt > 0 {
            Counters::add(&metrics.wizard_commit_retries_total, 1);
            let jitter_ms = rand::thread_rng().gen_range(10..100) * attempt;
            tokio::time::sleep(std::time::Duration::from_millis(jitter_ms as u64)).await;
        }

        match try_commit_once(mutator, session_id, list_id, decisions, now).await {
            Ok(receipt) => {
                Counters::add(&metrics.wizard_commits_total, 1);
                return Ok(receipt);
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("commit failed with no recorded error")))
}

async fn try_commit_once(
    mutator: &dyn ListMutator,
    session_id: wizard_session::model::SessionId,
    list_id: &str,
    decisions: &[Decision],
    now: DateTime<Utc>,
) -> anyhow::Result<Receipt> {
    let mut tx = mutator.begin_tx().await?;
    let mut applied = Vec::new();
    let mut removed_item_ids = Vec::new();

    for decision in decisions {
        match decision.action {
            DecisionAction::Replace => {
                let Some(flyer_product_id) = decision.selected_flyer_product_id else {
                    tx.rollback().await?;
                    anyhow::bail!("REPLACE decision missing selected_flyer_product_id");
                };
                let price = decision
                    .seen_price_current
                    .ok_or_else(|| anyhow::anyhow!("REPLACE decision missing a concrete price"))?;
                let store_id = decision
                    .seen_store_id
                    .ok_or_else(|| anyhow::anyhow!("REPLACE decision missing a store id"))?;

                let patch = ItemPatch {
                    flyer_product_id,
                    product_master_id: decision.selected_master_id,
                    store_id,
                    canonical_name: decision.seen_canonical_name.clone().unwrap_or_default(),
                    brand: decision.seen_brand.clone(),
                    size: decision.seen_size.clone(),
                    last_known_price: price,
                };
                tx.update_item(decision.item_id, patch).await?;

                let snapshot = OfferSnapshot {
                    list_item_id: decision.item_id,
                    store_id,
                    product_master_id: decision.selected_master_id,
                    flyer_product_id: Some(flyer_product_id),
                    price,
                    is_estimated: false,
                    valid_to: decision.seen_valid_to.unwrap_or(now),
                    snapshotted_at: now,
                };
                tx.insert_snapshot(snapshot.clone()).await?;
                applied.push(snapshot);
            }
            DecisionAction::Remove => {
                tx.remove_item(decision.item_id).await?;
                removed_item_ids.push(decision.item_id);
            }
            DecisionAction::Keep | DecisionAction::Skip => {}
        }
    }

    tx.commit().await?;

    Ok(Receipt { session_id, list_id: list_id.to_string(), applied, removed_item_ids, completed_at: now })
}
