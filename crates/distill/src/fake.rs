use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use acontext_domain::entities::{Message, Task};
use acontext_domain::{Error, Result};

use crate::store::DistillStore;

#[derive(Default)]
struct Db {
    learning_spaces: std::collections::HashMap<Uuid, Uuid>,
    tasks: Vec<Task>,
    task_messages: Vec<(Uuid, Uuid)>,
    messages: Vec<Message>,
}

/// In-memory `DistillStore`, seeded directly by tests.
#[derive(Clone, Default)]
pub struct InMemoryDistillStore {
    inner: Arc<Mutex<Db>>,
}

impl InMemoryDistillStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_session_to_space(&self, session_id: Uuid, learning_space_id: Uuid) {
        self.inner.lock().learning_spaces.insert(session_id, learning_space_id);
    }

    pub fn seed_task(&self, task: Task) {
        self.inner.lock().tasks.push(task);
    }

    pub fn seed_message(&self, message: Message) {
        self.inner.lock().messages.push(message);
    }

    pub fn link_message(&self, task_id: Uuid, message_id: Uuid) {
        self.inner.lock().task_messages.push((task_id, message_id));
    }
}

#[async_trait]
impl DistillStore for InMemoryDistillStore {
    async fn learning_space_for_session(&self, session_id: Uuid) -> Result<Option<Uuid>> {
        Ok(self.inner.lock().learning_spaces.get(&session_id).copied())
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Task> {
        self.inner
            .lock()
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("task {task_id}")))
    }

    async fn task_message_ids(&self, task_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .inner
            .lock()
            .task_messages
            .iter()
            .filter(|(t, _)| *t == task_id)
            .map(|(_, m)| *m)
            .collect())
    }

    async fn get_messages(&self, message_ids: &[Uuid]) -> Result<Vec<Message>> {
        let db = self.inner.lock();
        Ok(db
            .messages
            .iter()
            .filter(|m| message_ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn list_tasks(&self, session_id: Uuid) -> Result<Vec<Task>> {
        Ok(self
            .inner
            .lock()
            .tasks
            .iter()
            .filter(|t| t.session_id == session_id && !t.is_planning)
            .cloned()
            .collect())
    }
}
