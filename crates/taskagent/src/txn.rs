use async_trait::async_trait;
use uuid::Uuid;

use acontext_domain::entities::{Message, Task, TaskStatus};
use acontext_domain::Result;

/// Everything one task-agent iteration needs from the durable store, scoped
/// to a single transaction (§4.2.3). The Postgres-backed implementation
/// lives in `pg.rs`; tests substitute an in-memory fake with the same
/// commit/rollback semantics.
#[async_trait]
pub trait TaskAgentTxn: Send {
    async fn list_tasks(&mut self, session_id: Uuid) -> Result<Vec<Task>>;
    async fn insert_task(&mut self, session_id: Uuid, description: &str, order_after: Option<i32>) -> Result<Task>;
    async fn update_task(
        &mut self,
        session_id: Uuid,
        order: i32,
        description: Option<&str>,
        status: Option<TaskStatus>,
    ) -> Result<Task>;
    async fn append_messages_to_task(&mut self, session_id: Uuid, order: i32, message_ids: &[Uuid]) -> Result<Task>;
    async fn append_task_progress(&mut self, session_id: Uuid, order: i32, progress: &str) -> Result<Task>;
    async fn set_task_user_preference(&mut self, session_id: Uuid, order: i32, pref: &str) -> Result<Task>;
    async fn append_messages_to_planning_section(&mut self, session_id: Uuid, message_ids: &[Uuid]) -> Result<Task>;
    async fn append_planning_user_preference(&mut self, session_id: Uuid, pref: &str) -> Result<()>;
    async fn planning_preferences(&mut self, session_id: Uuid) -> Result<Vec<String>>;
    async fn get_messages(&mut self, message_ids: &[Uuid]) -> Result<Vec<Message>>;

    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Opens a fresh transaction. Implemented by `acontext-store`'s `Store` in
/// the real binary, and by the in-memory fake in tests.
#[async_trait]
pub trait TaskAgentStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn TaskAgentTxn>>;
}
