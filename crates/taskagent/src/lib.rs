pub mod agent;
pub mod ctx;
pub mod fake;
pub mod pg;
pub mod tools;
pub mod txn;

pub use agent::{TaskAgentInput, TaskAgentRunner};
pub use pg::PgTaskAgentStore;
pub use txn::{TaskAgentStore, TaskAgentTxn};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use uuid::Uuid;

    use acontext_broker::fake::FakeBroker;
    use acontext_broker::Broker;
    use acontext_domain::entities::{Message, MessagePart, Role};
    use acontext_domain::envelope::topology;
    use acontext_domain::tool::{CompletionResponse, Message as LlmMessage, ToolCall, ToolDefinition};
    use acontext_domain::Result;
    use acontext_llm::LlmClient;

    use crate::agent::{TaskAgentInput, TaskAgentRunner};
    use crate::fake::InMemoryTaskAgentStore;

    /// Replays a fixed sequence of tool-call batches, one per `complete()`
    /// call — enough to drive deterministic multi-iteration scenarios
    /// without a real provider.
    struct ScriptedBatches {
        batches: std::sync::Mutex<std::collections::VecDeque<Vec<ToolCall>>>,
    }

    impl ScriptedBatches {
        fn new(batches: Vec<Vec<ToolCall>>) -> Self {
            Self {
                batches: std::sync::Mutex::new(batches.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedBatches {
        async fn complete(
            &self,
            _system: &str,
            _messages: &[LlmMessage],
            _tools: &[ToolDefinition],
        ) -> Result<CompletionResponse> {
            let tool_calls = self.batches.lock().unwrap().pop_front().unwrap_or_default();
            Ok(CompletionResponse { text: None, tool_calls })
        }
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            arguments: args,
        }
    }

    fn seed_message(store: &InMemoryTaskAgentStore, session_id: Uuid, text: &str) -> Uuid {
        let id = Uuid::new_v4();
        store.seed_message(Message {
            id,
            session_id,
            role: Role::User,
            parts: vec![MessagePart::Text { text: text.to_string() }],
            meta: Default::default(),
            created_at: chrono::Utc::now(),
        });
        id
    }

    #[tokio::test]
    async fn atomicity_on_failure_leaves_no_tasks_or_links() {
        let store = InMemoryTaskAgentStore::new();
        let broker = FakeBroker::new();
        let project_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let m1 = seed_message(&store, session_id, "please fix the login bug");

        let llm = ScriptedBatches::new(vec![vec![
            call("insert_task", serde_json::json!({"description": "Fix login bug"})),
            call(
                "append_messages_to_task",
                serde_json::json!({"order": 1, "message_ids": [m1]}),
            ),
            call(
                "update_task",
                serde_json::json!({"order": 1, "status": "invalid-status"}),
            ),
        ]]);

        let runner = TaskAgentRunner {
            store: &store,
            llm: &llm,
            broker: &broker,
            max_iterations: 3,
        };

        let err = runner
            .run(TaskAgentInput {
                project_id,
                session_id,
                learning_space_id: None,
                message_ids: vec![m1],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, acontext_domain::Error::ToolReject(_)));

        assert!(store.tasks_snapshot().is_empty());
        assert!(store.task_message_links_snapshot().is_empty());
    }

    #[tokio::test]
    async fn preference_survives_rollback_and_still_publishes() {
        let store = InMemoryTaskAgentStore::new();
        let broker = FakeBroker::new();
        let project_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let learning_space_id = Uuid::new_v4();
        let m1 = seed_message(&store, session_id, "I prefer TypeScript");

        let mut agent_queue = broker
            .consume(topology::LEARNING_SKILL_AGENT_QUEUE)
            .await
            .unwrap();

        let llm = ScriptedBatches::new(vec![vec![
            call("submit_user_preference", serde_json::json!({"pref": "prefers TypeScript"})),
            call("insert_task", serde_json::json!({"description": "write frontend"})),
            call("update_task", serde_json::json!({"order": 99, "status": "success"})),
        ]]);

        let runner = TaskAgentRunner {
            store: &store,
            llm: &llm,
            broker: &broker,
            max_iterations: 3,
        };

        let err = runner
            .run(TaskAgentInput {
                project_id,
                session_id,
                learning_space_id: Some(learning_space_id),
                message_ids: vec![m1],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, acontext_domain::Error::NotFound(_)));

        // Rollback means no task was persisted at all (including the
        // planning task's preference, which lives on a task row too).
        assert!(store.tasks_snapshot().is_empty());

        let delivery = agent_queue.recv().await.unwrap().expect("preference still published");
        let envelope: acontext_domain::envelope::SkillLearnDistilled = delivery.deserialize().unwrap();
        assert!(envelope.is_preference_only());
        assert!(envelope.distilled_context.contains("prefers TypeScript"));
        delivery.ack().await.unwrap();
    }

    #[tokio::test]
    async fn finish_tool_stops_the_loop_without_further_llm_calls() {
        let store = InMemoryTaskAgentStore::new();
        let broker = FakeBroker::new();
        let session_id = Uuid::new_v4();
        let m1 = seed_message(&store, session_id, "hello");

        let llm = ScriptedBatches::new(vec![vec![call("finish", serde_json::json!({}))]]);
        let runner = TaskAgentRunner {
            store: &store,
            llm: &llm,
            broker: &broker,
            max_iterations: 5,
        };

        runner
            .run(TaskAgentInput {
                project_id: Uuid::new_v4(),
                session_id,
                learning_space_id: None,
                message_ids: vec![m1],
            })
            .await
            .unwrap();

        assert!(store.tasks_snapshot().is_empty());
    }
}
