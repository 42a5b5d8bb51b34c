pub mod consumer;
pub mod fake;
pub mod pg;
pub mod store;
pub mod tools;

pub use consumer::{DistillConsumer, DistillOutcome, DropReason};
pub use store::DistillStore;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use uuid::Uuid;

    use acontext_broker::fake::FakeBroker;
    use acontext_broker::{Broker, Consumer};
    use acontext_domain::entities::{Message, MessagePart, Role, Task, TaskData, TaskStatus};
    use acontext_domain::envelope::{topology, SkillLearnDistilled, SkillLearnTask};
    use acontext_domain::tool::{CompletionResponse, Message as LlmMessage, ToolCall, ToolDefinition};
    use acontext_domain::Result;
    use acontext_llm::LlmClient;

    use crate::fake::InMemoryDistillStore;
    use crate::{DistillConsumer, DistillOutcome, DropReason};

    struct ScriptedLlm {
        response: CompletionResponse,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _system: &str, _messages: &[LlmMessage], _tools: &[ToolDefinition]) -> Result<CompletionResponse> {
            Ok(self.response.clone())
        }
    }

    fn make_task(session_id: Uuid, status: TaskStatus) -> Task {
        let now = chrono::Utc::now();
        Task {
            id: Uuid::new_v4(),
            session_id,
            order: 1,
            status,
            data: TaskData {
                description: "migrate the billing worker to the new queue".to_string(),
                progresses: vec!["switched consumer to the new topic".to_string()],
                user_preferences: Vec::new(),
            },
            is_planning: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn setup() -> (InMemoryDistillStore, Arc<FakeBroker>, Uuid, Uuid) {
        let store = InMemoryDistillStore::new();
        let broker = Arc::new(FakeBroker::new());
        let project_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        (store, broker, project_id, session_id)
    }

    #[tokio::test]
    async fn successful_task_publishes_distilled_context() {
        let (store, broker, project_id, session_id) = setup();
        let learning_space_id = Uuid::new_v4();
        store.attach_session_to_space(session_id, learning_space_id);

        let task = make_task(session_id, TaskStatus::Success);
        store.seed_task(task.clone());
        let msg = Message {
            id: Uuid::new_v4(),
            session_id,
            role: Role::User,
            parts: vec![MessagePart::Text {
                text: "please migrate the billing worker".to_string(),
            }],
            meta: Default::default(),
            created_at: chrono::Utc::now(),
        };
        store.seed_message(msg.clone());
        store.link_message(task.id, msg.id);

        let llm = Arc::new(ScriptedLlm {
            response: CompletionResponse {
                text: None,
                tool_calls: vec![ToolCall {
                    id: "1".to_string(),
                    name: "report_success_analysis".to_string(),
                    arguments: serde_json::json!({
                        "task_goal": "migrate billing worker",
                        "approach": "dual-write then cut over",
                        "key_decisions": "kept the old topic draining for one day",
                        "generalizable_pattern": "dual-write migrations for queue cutovers"
                    }),
                }],
            },
        });

        let consumer = DistillConsumer::new(Arc::new(store), llm, broker.clone());
        let mut distilled_queue = broker.consume(topology::LEARNING_SKILL_AGENT_QUEUE).await.unwrap();

        let outcome = consumer
            .handle(SkillLearnTask {
                project_id,
                session_id,
                task_id: task.id,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, DistillOutcome::Published));

        let delivery = distilled_queue.recv().await.unwrap().expect("expected one published envelope");
        let body: SkillLearnDistilled = serde_json::from_slice(&delivery.body).unwrap();
        assert_eq!(body.learning_space_id, learning_space_id);
        assert!(body.distilled_context.contains("dual-write migrations for queue cutovers"));
        assert!(!body.is_preference_only());
    }

    /// §8 end-to-end scenario 6: "Distillation schema gating." Task
    /// status=success; the model returns assistant text only with no tool
    /// call. Expect: message dropped, no `SkillLearnDistilled` published, no
    /// agent loop invoked (there's nothing downstream of this consumer to
    /// invoke, so "no agent loop" reduces to "no publish").
    #[tokio::test]
    async fn no_tool_call_drops_without_publishing() {
        let (store, broker, project_id, session_id) = setup();
        store.attach_session_to_space(session_id, Uuid::new_v4());
        let task = make_task(session_id, TaskStatus::Success);
        store.seed_task(task.clone());

        let llm = Arc::new(ScriptedLlm {
            response: CompletionResponse {
                text: Some("Looks like it went fine, nothing more to say.".to_string()),
                tool_calls: Vec::new(),
            },
        });

        let consumer = DistillConsumer::new(Arc::new(store), llm, broker.clone());
        let mut distilled_queue = broker.consume(topology::LEARNING_SKILL_AGENT_QUEUE).await.unwrap();

        let outcome = consumer
            .handle(SkillLearnTask {
                project_id,
                session_id,
                task_id: task.id,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, DistillOutcome::Dropped(DropReason::NoToolCall)));

        let nothing = tokio::time::timeout(std::time::Duration::from_millis(50), distilled_queue.recv()).await;
        assert!(nothing.is_err(), "expected no envelope published");
    }

    #[tokio::test]
    async fn non_terminal_task_is_dropped_as_stale() {
        let (store, broker, project_id, session_id) = setup();
        store.attach_session_to_space(session_id, Uuid::new_v4());
        let task = make_task(session_id, TaskStatus::Running);
        store.seed_task(task.clone());

        let llm = Arc::new(ScriptedLlm {
            response: CompletionResponse {
                text: None,
                tool_calls: Vec::new(),
            },
        });

        let consumer = DistillConsumer::new(Arc::new(store), llm, broker);
        let outcome = consumer
            .handle(SkillLearnTask {
                project_id,
                session_id,
                task_id: task.id,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, DistillOutcome::Dropped(DropReason::TaskNotTerminal)));
    }

    #[tokio::test]
    async fn session_without_learning_space_is_dropped() {
        let (store, broker, project_id, session_id) = setup();
        let task = make_task(session_id, TaskStatus::Success);
        store.seed_task(task.clone());

        let llm = Arc::new(ScriptedLlm {
            response: CompletionResponse {
                text: None,
                tool_calls: Vec::new(),
            },
        });

        let consumer = DistillConsumer::new(Arc::new(store), llm, broker);
        let outcome = consumer
            .handle(SkillLearnTask {
                project_id,
                session_id,
                task_id: task.id,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, DistillOutcome::Dropped(DropReason::NoLearningSpace)));
    }

    #[tokio::test]
    async fn wrong_tool_name_is_dropped() {
        let (store, broker, project_id, session_id) = setup();
        store.attach_session_to_space(session_id, Uuid::new_v4());
        let task = make_task(session_id, TaskStatus::Failed);
        store.seed_task(task.clone());

        let llm = Arc::new(ScriptedLlm {
            response: CompletionResponse {
                text: None,
                tool_calls: vec![ToolCall {
                    id: "1".to_string(),
                    name: "report_success_analysis".to_string(),
                    arguments: serde_json::json!({}),
                }],
            },
        });

        let consumer = DistillConsumer::new(Arc::new(store), llm, broker);
        let outcome = consumer
            .handle(SkillLearnTask {
                project_id,
                session_id,
                task_id: task.id,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, DistillOutcome::Dropped(DropReason::WrongTool)));
    }
}
