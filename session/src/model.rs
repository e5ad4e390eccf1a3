use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use catalog::types::{FlyerProductId, ProductMasterId, StoreId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SessionId = Uuid;
pub type ListItemId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Initialized,
    InProgress,
    Reviewing,
    Completed,
    Cancelled,
    Expired,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled | SessionState::Expired)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Initialized => "INITIALIZED",
            SessionState::InProgress => "IN_PROGRESS",
            SessionState::Reviewing => "REVIEWING",
            SessionState::Completed => "COMPLETED",
            SessionState::Cancelled => "CANCELLED",
            SessionState::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

impl FromStr for SessionState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIALIZED" => Ok(SessionState::Initialized),
            "IN_PROGRESS" => Ok(SessionState::InProgress),
            "REVIEWING" => Ok(SessionState::Reviewing),
            "COMPLETED" => Ok(SessionState::Completed),
            "CANCELLED" => Ok(SessionState::Cancelled),
            "EXPIRED" => Ok(SessionState::Expired),
            other => Err(anyhow::anyhow!("invalid session state: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreStrategy {
    SameStore,
    AnyStore,
    PreferredStores,
    OptimalRoute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceStrategy {
    Cheapest,
    Similar,
    Premium,
    BestValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrandStrategy {
    SameBrand,
    AnyBrand,
    PreferredBrands,
    PremiumBrands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoApplyMode {
    Conservative,
    Balanced,
    Aggressive,
}

/// Per-session configuration, spec §4.3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filters {
    pub store_strategy: StoreStrategy,
    pub preferred_store_ids: Vec<StoreId>,
    pub max_stores: u8,
    pub price_strategy: PriceStrategy,
    pub brand_strategy: BrandStrategy,
    pub size_tolerance_pct: f64,
    pub require_concrete_price: bool,
    /// Open question in spec §9, resolved as a default-on filter flag.
    pub include_better_deals: bool,
    pub auto_apply_mode: AutoApplyMode,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            store_strategy: StoreStrategy::SameStore,
            preferred_store_ids: Vec::new(),
            max_stores: 1,
            price_strategy: PriceStrategy::Cheapest,
            brand_strategy: BrandStrategy::SameBrand,
            size_tolerance_pct: 20.0,
            require_concrete_price: true,
            include_better_deals: true,
            auto_apply_mode: AutoApplyMode::Conservative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionAction {
    Replace,
    Keep,
    Remove,
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub item_id: ListItemId,
    pub action: DecisionAction,
    pub selected_flyer_product_id: Option<FlyerProductId>,
    pub selected_master_id: Option<ProductMasterId>,
    pub recorded_at: DateTime<Utc>,
    pub idempotency_key: Option<String>,
    /// What the user saw at decide-time, required to detect staleness at
    /// Confirm (spec §4.7: "changed `price_current`/`valid_to`").
    pub seen_price_current: Option<f64>,
    pub seen_valid_to: Option<DateTime<Utc>>,
    pub seen_has_concrete_price: Option<bool>,
    /// Remaining candidate fields Commit needs to rewrite the list item's
    /// foreign keys (spec §4.8 step 2); snapshotted alongside the price so
    /// a later Commit never has to re-query the catalog for display data.
    pub seen_store_id: Option<StoreId>,
    pub seen_canonical_name: Option<String>,
    pub seen_brand: Option<String>,
    pub seen_size: Option<String>,
}

/// Why a list item entered `pending_items`, used for priority ordering
/// (spec §4.1: expired > unavailable > better-deal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PendingReason {
    Expired,
    Unavailable,
    BetterDeal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingItem {
    pub item_id: ListItemId,
    pub reason: PendingReason,
    pub category_group: Option<String>,
    pub linked_at: DateTime<Utc>,
}

/// Bounded-size recent-operations map backing idempotent replay (spec §9).
const IDEMPOTENCY_WINDOW: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardSession {
    pub id: SessionId,
    pub user_id: String,
    pub list_id: String,
    pub state: SessionState,
    pub filters: Filters,
    pub pending_items: Vec<PendingItem>,
    pub decisions: HashMap<ListItemId, Decision>,
    pub current_index: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// idempotency_key -> item_id it was recorded against, insertion-ordered
    /// so the oldest entry can be evicted once the window fills.
    pub idempotency_keys: Vec<(String, ListItemId)>,
    /// Optimistic-concurrency version (spec §9 design notes: versioned CAS
    /// preferred over a process-local mutex under horizontal scale).
    pub version: u64,
}

impl WizardSession {
    pub fn new(
        id: SessionId,
        user_id: String,
        list_id: String,
        filters: Filters,
        pending_items: Vec<PendingItem>,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            id,
            user_id,
            list_id,
            state: SessionState::Initialized,
            filters,
            pending_items,
            decisions: HashMap::new(),
            current_index: 0,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
            idempotency_keys: Vec::new(),
            version: 0,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_terminal() && now >= self.expires_at
    }

    /// Refreshes `updated_at` and slides the TTL window forward (spec §3:
    /// "30 minutes of inactivity, sliding").
    pub fn touch(&mut self, now: DateTime<Utc>, ttl: chrono::Duration) {
        self.updated_at = now;
        self.expires_at = now + ttl;
    }

    pub fn skipped_count(&self) -> usize {
        self.decisions.values().filter(|d| d.action == DecisionAction::Skip).count()
    }

    pub fn decided_count(&self) -> usize {
        self.decisions.len()
    }

    pub fn all_items_resolved(&self) -> bool {
        self.decisions.len() == self.pending_items.len()
    }

    /// Looks up a previously recorded decision by idempotency key, scoped to
    /// a single item (keys aren't globally unique across items in this
    /// model, matching the "per operation" wording in spec §9).
    pub fn find_by_idempotency_key(&self, key: &str) -> Option<&Decision> {
        self.idempotency_keys
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, item_id)| self.decisions.get(item_id))
    }

    pub fn record_idempotency_key(&mut self, key: String, item_id: ListItemId) {
        if self.idempotency_keys.iter().any(|(k, _)| k == &key) {
            return;
        }
        self.idempotency_keys.push((key, item_id));
        if self.idempotency_keys.len() > IDEMPOTENCY_WINDOW {
            self.idempotency_keys.remove(0);
        }
    }
}
