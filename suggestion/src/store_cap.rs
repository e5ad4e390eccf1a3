//! Bounded store-count enforcement across a batch of REPLACE selections
//! (spec §4.6, "Store-count enforcement in bulk/confirm paths"). Grounded on
//! the same iterative-swap-with-priority shape as a round-robin scheduler
//! pass: walk the selections, swap the ones that can move, and give up on
//! the ones that can't.

use std::collections::{HashMap, HashSet};

use catalog::types::StoreId;
use wizard_session::model::ListItemId;

use crate::types::MigrationCandidate;

#[derive(Debug, Clone)]
pub struct StoreCapSelection {
    pub item_id: ListItemId,
    pub chosen: MigrationCandidate,
    /// Remaining ranked alternatives for this item, in score order,
    /// excluding `chosen`.
    pub alternatives: Vec<MigrationCandidate>,
    pub brand_matched: bool,
}

#[derive(Debug, Clone)]
pub struct StoreCapOutcome {
    /// item_ids whose REPLACE was downgraded to KEEP because no feasible
    /// in-cap alternative existed.
    pub downgraded: Vec<ListItemId>,
}

/// Mutates `selections` in place, swapping `chosen` candidates so the final
/// distinct-store count across all entries is at most `max_stores`.
pub fn enforce_store_cap(selections: &mut [StoreCapSelection], max_stores: u8) -> StoreCapOutcome {
    let max_stores = max_stores.max(1) as usize;
    let mut downgraded = Vec::new();
    let mut active: HashSet<usize> = (0..selections.len()).collect();

    loop {
        let distinct_stores = distinct_count(selections, &active);
        if distinct_stores <= max_stores {
            break;
        }

        let permitted = permitted_stores(selections, &active, max_stores);

        // Swap non-brand-matched selections out of over-represented stores
        // first, preserving brand-match priority.
        let mut candidate_indices: Vec<usize> = active
            .iter()
            .copied()
            .filter(|&i| !permitted.contains(&selections[i].chosen.store_id))
            .collect();
        candidate_indices.sort_by_key(|&i| selections[i].brand_matched);

        if candidate_indices.is_empty() {
            break;
        }

        let mut progressed = false;
        for idx in candidate_indices {
            let sel = &mut selections[idx];
            if let Some(pos) = sel.alternatives.iter().position(|alt| permitted.contains(&alt.store_id)) {
                sel.chosen = sel.alternatives.remove(pos);
                progressed = true;
            } else {
                active.remove(&idx);
                downgraded.push(sel.item_id);
            }
        }

        if !progressed && distinct_count(selections, &active) > max_stores {
            // No swap was possible this pass; remaining over-cap entries
            // have no feasible alternative either.
            for idx in active.iter().copied().collect::<Vec<_>>() {
                if !permitted.contains(&selections[idx].chosen.store_id) {
                    downgraded.push(selections[idx].item_id);
                    active.remove(&idx);
                }
            }
            break;
        }
    }

    StoreCapOutcome { downgraded }
}

fn distinct_count(selections: &[StoreCapSelection], active: &HashSet<usize>) -> usize {
    active.iter().map(|&i| selections[i].chosen.store_id).collect::<HashSet<_>>().len()
}

/// Ranks stores by how many active selections sit there, breaking ties in
/// favor of stores hosting brand-matched picks (preserves brand-match
/// priority per spec §4.6) and finally by id for determinism.
fn permitted_stores(selections: &[StoreCapSelection], active: &HashSet<usize>, max_stores: usize) -> HashSet<StoreId> {
    let mut counts: HashMap<StoreId, (usize, usize)> = HashMap::new();
    for &i in active {
        let sel = &selections[i];
        let entry = counts.entry(sel.chosen.store_id).or_insert((0, 0));
        entry.0 += 1;
        if sel.brand_matched {
            entry.1 += 1;
        }
    }
    let mut ranked: Vec<(StoreId, usize, usize)> = counts.into_iter().map(|(s, (n, b))| (s, n, b)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(max_stores).map(|(store, _, _)| store).collect()
}
