use async_trait::async_trait;
use uuid::Uuid;

use acontext_domain::entities::{Message, Task};
use acontext_domain::Result;
use acontext_store::Store;

use crate::store::DistillStore;

pub struct PgDistillStore {
    store: Store,
}

impl PgDistillStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DistillStore for PgDistillStore {
    async fn learning_space_for_session(&self, session_id: Uuid) -> Result<Option<Uuid>> {
        acontext_store::sessions::learning_space_for_session(self.store.pool(), session_id).await
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Task> {
        acontext_store::tasks::get_task(self.store.pool(), task_id).await
    }

    async fn task_message_ids(&self, task_id: Uuid) -> Result<Vec<Uuid>> {
        acontext_store::tasks::task_message_ids(self.store.pool(), task_id).await
    }

    async fn get_messages(&self, message_ids: &[Uuid]) -> Result<Vec<Message>> {
        acontext_store::messages::get_messages(self.store.pool(), message_ids).await
    }

    async fn list_tasks(&self, session_id: Uuid) -> Result<Vec<Task>> {
        acontext_store::tasks::list_tasks(self.store.pool(), session_id).await
    }
}
