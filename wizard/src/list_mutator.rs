//! Transactional write surface onto `ShoppingListItem`/`OfferSnapshot`
//! (spec §6 `ListMutator`). Grounded on the teacher's
//! `SessionRepository::reserve_execution`/`commit_batch` shape: a
//! begin/act/commit-or-rollback transaction object, reused here for the
//! wizard's own single-transaction Commit (spec §4.8).

use async_trait::async_trait;
use wizard_session::model::ListItemId;

use crate::model::{ItemPatch, OfferSnapshot};

#[async_trait]
pub trait ListMutatorTx: Send {
    async fn update_item(&mut self, item_id: ListItemId, patch: ItemPatch) -> anyhow::Result<()>;
    async fn remove_item(&mut self, item_id: ListItemId) -> anyhow::Result<()>;
    async fn insert_snapshot(&mut self, snapshot: OfferSnapshot) -> anyhow::Result<()>;
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;
    async fn rollback(self: Box<Self>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ListMutator: Send + Sync {
    async fn begin_tx(&self) -> anyhow::Result<Box<dyn ListMutatorTx>>;
}

pub mod memory {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::{ListMutator, ListMutatorTx};
    use crate::model::{ItemPatch, OfferSnapshot};
    use wizard_session::model::ListItemId;

    #[derive(Default)]
    pub struct InMemoryListMutator {
        pub items: Arc<Mutex<HashMap<ListItemId, ItemPatch>>>,
        pub removed: Arc<Mutex<Vec<ListItemId>>>,
        pub snapshots: Arc<Mutex<Vec<OfferSnapshot>>>,
    }

    impl InMemoryListMutator {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl ListMutator for InMemoryListMutator {
        async fn begin_tx(&self) -> anyhow::Result<Box<dyn ListMutatorTx>> {
            Ok(Box::new(InMemoryTx {
                items: self.items.clone(),
                removed: self.removed.clone(),
                snapshots: self.snapshots.clone(),
                staged_items: HashMap::new(),
                staged_removed: Vec::new(),
                staged_snapshots: Vec::new(),
            }))
        }
    }

    struct InMemoryTx {
        items: Arc<Mutex<HashMap<ListItemId, ItemPatch>>>,
        removed: Arc<Mutex<Vec<ListItemId>>>,
        snapshots: Arc<Mutex<Vec<OfferSnapshot>>>,
        staged_items: HashMap<ListItemId, ItemPatch>,
        staged_removed: Vec<ListItemId>,
        staged_snapshots: Vec<OfferSnapshot>,
    }

    #[async_trait]
    impl ListMutatorTx for InMemoryTx {
        async fn update_item(&mut self, item_id: ListItemId, patch: ItemPatch) -> anyhow::Result<()> {
            self.staged_items.insert(item_id, patch);
            Ok(())
        }

        async fn remove_item(&mut self, item_id: ListItemId) -> anyhow::Result<()> {
            self.staged_removed.push(item_id);
            Ok(())
        }

        async fn insert_snapshot(&mut self, snapshot: OfferSnapshot) -> anyhow::Result<()> {
            self.staged_snapshots.push(snapshot);
            Ok(())
        }

        async fn commit(self: Box<Self>) -> anyhow::Result<()> {
            let this = *self;
            this.items.lock().await.extend(this.staged_items);
            this.removed.lock().await.extend(this.staged_removed);
            this.snapshots.lock().await.extend(this.staged_snapshots);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
            Ok(())
        }
    }
}
