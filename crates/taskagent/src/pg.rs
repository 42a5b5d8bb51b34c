use async_trait::async_trait;
use uuid::Uuid;

use acontext_domain::entities::{Message, Task, TaskStatus};
use acontext_domain::Result;
use acontext_store::Store;

use crate::txn::{TaskAgentStore, TaskAgentTxn};

pub struct PgTaskAgentStore {
    store: Store,
}

impl PgTaskAgentStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskAgentStore for PgTaskAgentStore {
    async fn begin(&self) -> Result<Box<dyn TaskAgentTxn>> {
        let tx = self.store.begin().await?;
        Ok(Box::new(PgTxn { tx: Some(tx) }))
    }
}

struct PgTxn<'c> {
    tx: Option<acontext_store::Tx<'c>>,
}

impl PgTxn<'_> {
    fn conn(&mut self) -> &mut sqlx::PgConnection {
        self.tx.as_mut().expect("txn used after commit/rollback").conn()
    }
}

#[async_trait]
impl TaskAgentTxn for PgTxn<'_> {
    async fn list_tasks(&mut self, session_id: Uuid) -> Result<Vec<Task>> {
        acontext_store::tasks::list_tasks(self.conn(), session_id).await
    }

    async fn insert_task(&mut self, session_id: Uuid, description: &str, order_after: Option<i32>) -> Result<Task> {
        acontext_store::tasks::insert_task(self.conn(), session_id, description, order_after).await
    }

    async fn update_task(
        &mut self,
        session_id: Uuid,
        order: i32,
        description: Option<&str>,
        status: Option<TaskStatus>,
    ) -> Result<Task> {
        acontext_store::tasks::update_task(self.conn(), session_id, order, description, status).await
    }

    async fn append_messages_to_task(&mut self, session_id: Uuid, order: i32, message_ids: &[Uuid]) -> Result<Task> {
        acontext_store::tasks::append_messages_to_task(self.conn(), session_id, order, message_ids).await
    }

    async fn append_task_progress(&mut self, session_id: Uuid, order: i32, progress: &str) -> Result<Task> {
        acontext_store::tasks::append_task_progress(self.conn(), session_id, order, progress).await
    }

    async fn set_task_user_preference(&mut self, session_id: Uuid, order: i32, pref: &str) -> Result<Task> {
        acontext_store::tasks::set_task_user_preference(self.conn(), session_id, order, pref).await
    }

    async fn append_messages_to_planning_section(&mut self, session_id: Uuid, message_ids: &[Uuid]) -> Result<Task> {
        acontext_store::tasks::append_messages_to_planning_section(self.conn(), session_id, message_ids).await
    }

    async fn append_planning_user_preference(&mut self, session_id: Uuid, pref: &str) -> Result<()> {
        acontext_store::tasks::append_planning_user_preference(self.conn(), session_id, pref).await
    }

    async fn planning_preferences(&mut self, session_id: Uuid) -> Result<Vec<String>> {
        let task = acontext_store::tasks::find_or_create_planning_task(self.conn(), session_id).await?;
        Ok(task.data.user_preferences)
    }

    async fn get_messages(&mut self, message_ids: &[Uuid]) -> Result<Vec<Message>> {
        acontext_store::messages::get_messages(self.conn(), message_ids).await
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.tx.take().expect("txn used after commit/rollback").commit().await
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.tx.take().expect("txn used after commit/rollback").rollback().await
    }
}
