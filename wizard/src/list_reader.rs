//! Narrow read contract onto the shopping-list service (spec §6
//! `ShoppingListReader`), an external collaborator out of this crate's
//! scope. Ownership checks happen upstream of the wizard; this trait only
//! hands back the rows needed to compute `pending_items`.

use async_trait::async_trait;

use crate::model::ShoppingListItem;

#[async_trait]
pub trait ShoppingListReader: Send + Sync {
    async fn get_items(&self, list_id: &str) -> anyhow::Result<Vec<ShoppingListItem>>;
}

pub mod memory {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::ShoppingListReader;
    use crate::model::ShoppingListItem;

    #[derive(Default)]
    pub struct InMemoryListReader {
        items: Arc<Mutex<HashMap<String, Vec<ShoppingListItem>>>>,
    }

    impl InMemoryListReader {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn seed(&self, list_id: &str, items: Vec<ShoppingListItem>) {
            self.items.lock().await.insert(list_id.to_string(), items);
        }
    }

    #[async_trait]
    impl ShoppingListReader for InMemoryListReader {
        async fn get_items(&self, list_id: &str) -> anyhow::Result<Vec<ShoppingListItem>> {
            Ok(self.items.lock().await.get(list_id).cloned().unwrap_or_default())
        }
    }
}
