use async_trait::async_trait;
use uuid::Uuid;

use acontext_domain::entities::{Message, Task};
use acontext_domain::Result;

/// Read-only view the distillation consumer needs (§4.4). No transaction —
/// distillation never mutates task/message state, only reads it and
/// publishes a downstream envelope.
#[async_trait]
pub trait DistillStore: Send + Sync {
    async fn learning_space_for_session(&self, session_id: Uuid) -> Result<Option<Uuid>>;
    async fn get_task(&self, task_id: Uuid) -> Result<Task>;
    async fn task_message_ids(&self, task_id: Uuid) -> Result<Vec<Uuid>>;
    async fn get_messages(&self, message_ids: &[Uuid]) -> Result<Vec<Message>>;
    async fn list_tasks(&self, session_id: Uuid) -> Result<Vec<Task>>;
}
