use uuid::Uuid;

use acontext_domain::entities::Task;

/// The agent's in-memory view of the session's task plan (§4.2.1).
/// Destroyed and rebuilt by ctx-invalidating tools mid-iteration; its two
/// accumulators must be drained into iteration-scoped lists before that
/// happens (§4.2.4), which is why they're plain fields here rather than
/// something cleverer — the draining is the orchestrator's job, not this
/// struct's.
pub struct TaskCtx {
    pub session_id: Uuid,
    pub project_id: Uuid,
    pub tasks: Vec<Task>,
    pub learning_task_ids: Vec<Uuid>,
    pub pending_preferences: Vec<String>,
}

impl TaskCtx {
    pub fn new(session_id: Uuid, project_id: Uuid, tasks: Vec<Task>) -> Self {
        Self {
            session_id,
            project_id,
            tasks,
            learning_task_ids: Vec::new(),
            pending_preferences: Vec::new(),
        }
    }

    pub fn to_string_view(&self) -> String {
        self.tasks
            .iter()
            .map(|t| t.to_string_view())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The two outer, iteration-scoped accumulators a ctx drains into on
/// invalidation and at iteration exit (§4.2.4, §9: "current/drained
/// pointers + flush()").
#[derive(Default)]
pub struct DrainedAccumulators {
    pub learning_task_ids: Vec<Uuid>,
    pub pending_preferences: Vec<String>,
}

impl DrainedAccumulators {
    /// Moves everything currently on `ctx` into `self`, emptying `ctx`'s
    /// accumulators. Safe to call more than once per iteration (on
    /// invalidation, and again at iteration exit for whatever accrued after
    /// the last invalidation).
    pub fn flush_from(&mut self, ctx: &mut TaskCtx) {
        self.learning_task_ids.append(&mut ctx.learning_task_ids);
        self.pending_preferences.append(&mut ctx.pending_preferences);
    }

    /// §4.2.4 "error-resilience asymmetry": on a failed iteration, learning
    /// task ids are discarded (task state may be inconsistent after
    /// rollback) but preferences are kept — they're independent user facts.
    pub fn clear_learning_task_ids_on_error(&mut self) {
        self.learning_task_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acontext_domain::entities::{TaskData, TaskStatus};
    use chrono::Utc;

    fn task(order: i32) -> Task {
        Task {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            order,
            status: TaskStatus::Pending,
            data: TaskData::default(),
            is_planning: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn flush_moves_and_empties_ctx_accumulators() {
        let mut ctx = TaskCtx::new(Uuid::new_v4(), Uuid::new_v4(), vec![task(1)]);
        ctx.learning_task_ids.push(Uuid::new_v4());
        ctx.pending_preferences.push("likes dark mode".into());

        let mut drained = DrainedAccumulators::default();
        drained.flush_from(&mut ctx);

        assert!(ctx.learning_task_ids.is_empty());
        assert!(ctx.pending_preferences.is_empty());
        assert_eq!(drained.learning_task_ids.len(), 1);
        assert_eq!(drained.pending_preferences.len(), 1);
    }

    #[test]
    fn error_path_clears_learning_ids_but_not_preferences() {
        let mut drained = DrainedAccumulators::default();
        drained.learning_task_ids.push(Uuid::new_v4());
        drained.pending_preferences.push("prefers TypeScript".into());

        drained.clear_learning_task_ids_on_error();

        assert!(drained.learning_task_ids.is_empty());
        assert_eq!(drained.pending_preferences, vec!["prefers TypeScript".to_string()]);
    }
}
