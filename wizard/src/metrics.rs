use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters emitted at state transitions and candidate returns (spec §2
/// item 10). Modeled on the teacher's `metrics::counters::Counters`.
#[derive(Clone, Default)]
pub struct Counters {
    pub wizard_items_flagged_total: Arc<AtomicU64>,
    pub wizard_suggestions_returned_total: Arc<AtomicU64>,
    pub wizard_decisions_total: Arc<AtomicU64>,
    pub wizard_revalidation_stale_total: Arc<AtomicU64>,
    pub wizard_revalidation_ok_total: Arc<AtomicU64>,
    pub wizard_commits_total: Arc<AtomicU64>,
    pub wizard_commit_retries_total: Arc<AtomicU64>,
    pub wizard_cancellations_total: Arc<AtomicU64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}
