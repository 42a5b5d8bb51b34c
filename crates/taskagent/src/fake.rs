//! In-memory stand-in for [`TaskAgentStore`]/[`TaskAgentTxn`], used by this
//! crate's own tests and available to downstream worker tests that need a
//! task agent without a live Postgres connection.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use acontext_domain::entities::{Message, Task, TaskData, TaskStatus};
use acontext_domain::{Error, Result};

use crate::txn::{TaskAgentStore, TaskAgentTxn};

#[derive(Clone, Default)]
struct Db {
    tasks: Vec<Task>,
    messages: Vec<Message>,
    task_messages: Vec<(Uuid, Uuid)>,
}

impl Db {
    fn task_by_order_mut(&mut self, session_id: Uuid, order: i32) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.session_id == session_id && t.order == order)
            .ok_or_else(|| Error::NotFound(format!("no task at order {order} for session {session_id}")))
    }

    fn planning_task(&mut self, session_id: Uuid) -> &mut Task {
        if let Some(idx) = self
            .tasks
            .iter()
            .position(|t| t.session_id == session_id && t.is_planning)
        {
            return &mut self.tasks[idx];
        }
        let now = fake_now();
        self.tasks.push(Task {
            id: Uuid::new_v4(),
            session_id,
            order: 0,
            status: TaskStatus::Running,
            data: TaskData::default(),
            is_planning: true,
            created_at: now,
            updated_at: now,
        });
        self.tasks.last_mut().unwrap()
    }
}

fn fake_now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

/// Shared backing state. Clone the `Arc` to inspect committed state from a
/// test after a run finishes.
#[derive(Clone, Default)]
pub struct InMemoryTaskAgentStore {
    inner: Arc<Mutex<Db>>,
}

impl InMemoryTaskAgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_message(&self, message: Message) {
        self.inner.lock().messages.push(message);
    }

    pub fn tasks_snapshot(&self) -> Vec<Task> {
        self.inner.lock().tasks.clone()
    }

    pub fn task_message_links_snapshot(&self) -> Vec<(Uuid, Uuid)> {
        self.inner.lock().task_messages.clone()
    }
}

#[async_trait]
impl TaskAgentStore for InMemoryTaskAgentStore {
    async fn begin(&self) -> Result<Box<dyn TaskAgentTxn>> {
        let snapshot = self.inner.lock().clone();
        Ok(Box::new(FakeTxn {
            store: self.inner.clone(),
            working: snapshot,
            resolved: false,
        }))
    }
}

/// A copy-on-begin, swap-on-commit transaction. Rollback simply drops the
/// working copy, which is adequate in-process fidelity for the rollback
/// semantics §4.2.3 requires (nothing persists from a rolled-back iteration).
struct FakeTxn {
    store: Arc<Mutex<Db>>,
    working: Db,
    resolved: bool,
}

impl Drop for FakeTxn {
    fn drop(&mut self) {
        debug_assert!(
            self.resolved,
            "FakeTxn dropped without commit() or rollback() — would silently discard writes"
        );
    }
}

#[async_trait]
impl TaskAgentTxn for FakeTxn {
    async fn list_tasks(&mut self, session_id: Uuid) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .working
            .tasks
            .iter()
            .filter(|t| t.session_id == session_id && !t.is_planning)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.order);
        Ok(tasks)
    }

    async fn insert_task(&mut self, session_id: Uuid, description: &str, order_after: Option<i32>) -> Result<Task> {
        let next_order = match order_after {
            Some(after) => {
                for t in self.working.tasks.iter_mut() {
                    if t.session_id == session_id && !t.is_planning && t.order > after {
                        t.order += 1;
                    }
                }
                after + 1
            }
            None => self
                .working
                .tasks
                .iter()
                .filter(|t| t.session_id == session_id && !t.is_planning)
                .map(|t| t.order)
                .max()
                .map(|m| m + 1)
                .unwrap_or(1),
        };
        let now = fake_now();
        let task = Task {
            id: Uuid::new_v4(),
            session_id,
            order: next_order,
            status: TaskStatus::Pending,
            data: TaskData {
                description: description.to_string(),
                progresses: Vec::new(),
                user_preferences: Vec::new(),
            },
            is_planning: false,
            created_at: now,
            updated_at: now,
        };
        self.working.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(
        &mut self,
        session_id: Uuid,
        order: i32,
        description: Option<&str>,
        status: Option<TaskStatus>,
    ) -> Result<Task> {
        let task = self.working.task_by_order_mut(session_id, order)?;
        if let Some(d) = description {
            task.data.description = d.to_string();
        }
        if let Some(s) = status {
            task.status = s;
        }
        task.updated_at = fake_now();
        Ok(task.clone())
    }

    async fn append_messages_to_task(&mut self, session_id: Uuid, order: i32, message_ids: &[Uuid]) -> Result<Task> {
        let task_id = {
            let task = self.working.task_by_order_mut(session_id, order)?;
            if task.status.is_terminal() {
                return Err(Error::ToolReject(format!(
                    "task #{order} is already {:?}; cannot link more messages",
                    task.status
                )));
            }
            task.id
        };
        for message_id in message_ids {
            if !self.working.task_messages.contains(&(task_id, *message_id)) {
                self.working.task_messages.push((task_id, *message_id));
            }
        }
        let task = self.working.task_by_order_mut(session_id, order)?;
        if task.status == TaskStatus::Pending {
            task.status = TaskStatus::Running;
        }
        task.updated_at = fake_now();
        Ok(task.clone())
    }

    async fn append_task_progress(&mut self, session_id: Uuid, order: i32, progress: &str) -> Result<Task> {
        let task = self.working.task_by_order_mut(session_id, order)?;
        if task.status.is_terminal() {
            return Err(Error::ToolReject(format!(
                "task #{order} is already {:?}; cannot append progress",
                task.status
            )));
        }
        task.data.progresses.push(progress.to_string());
        task.updated_at = fake_now();
        Ok(task.clone())
    }

    async fn set_task_user_preference(&mut self, session_id: Uuid, order: i32, pref: &str) -> Result<Task> {
        let task = self.working.task_by_order_mut(session_id, order)?;
        task.data.user_preferences = vec![pref.to_string()];
        task.updated_at = fake_now();
        Ok(task.clone())
    }

    async fn append_messages_to_planning_section(&mut self, session_id: Uuid, message_ids: &[Uuid]) -> Result<Task> {
        let task_id = self.working.planning_task(session_id).id;
        for message_id in message_ids {
            if !self.working.task_messages.contains(&(task_id, *message_id)) {
                self.working.task_messages.push((task_id, *message_id));
            }
        }
        Ok(self.working.planning_task(session_id).clone())
    }

    async fn append_planning_user_preference(&mut self, session_id: Uuid, pref: &str) -> Result<()> {
        let task = self.working.planning_task(session_id);
        task.data.user_preferences.push(pref.to_string());
        task.updated_at = fake_now();
        Ok(())
    }

    async fn planning_preferences(&mut self, session_id: Uuid) -> Result<Vec<String>> {
        Ok(self.working.planning_task(session_id).data.user_preferences.clone())
    }

    async fn get_messages(&mut self, message_ids: &[Uuid]) -> Result<Vec<Message>> {
        Ok(self
            .working
            .messages
            .iter()
            .filter(|m| message_ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        *self.store.lock() = self.working.clone();
        self.resolved = true;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.resolved = true;
        Ok(())
    }
}
