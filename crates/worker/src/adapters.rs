use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use acontext_broker::Broker;
use acontext_buffer::service::SessionProcessor;
use acontext_domain::Result;
use acontext_llm::LlmClient;
use acontext_store::Store;
use acontext_taskagent::agent::{TaskAgentInput, TaskAgentRunner};
use acontext_taskagent::pg::PgTaskAgentStore;

/// Bridges `acontext-buffer`'s `SessionProcessor` seam to one bounded
/// task-agent loop (§4.2). Buffer has no compile-time dependency on
/// taskagent; this is where the two are wired together, the way the binary
/// crate is expected to per the module boundary drawn in `buffer::service`.
pub struct TaskAgentProcessor {
    store: Store,
    task_store: PgTaskAgentStore,
    llm: Arc<dyn LlmClient>,
    broker: Arc<dyn Broker>,
    max_iterations: u32,
}

impl TaskAgentProcessor {
    pub fn new(store: Store, llm: Arc<dyn LlmClient>, broker: Arc<dyn Broker>, max_iterations: u32) -> Self {
        Self {
            task_store: PgTaskAgentStore::new(store.clone()),
            store,
            llm,
            broker,
            max_iterations,
        }
    }
}

#[async_trait]
impl SessionProcessor for TaskAgentProcessor {
    async fn process(&self, project_id: Uuid, session_id: Uuid, message_ids: Vec<Uuid>) -> Result<()> {
        let learning_space_id = acontext_store::sessions::learning_space_for_session(self.store.pool(), session_id).await?;
        let runner = TaskAgentRunner {
            store: &self.task_store,
            llm: &*self.llm,
            broker: &*self.broker,
            max_iterations: self.max_iterations,
        };
        runner
            .run(TaskAgentInput {
                project_id,
                session_id,
                learning_space_id,
                message_ids,
            })
            .await
    }
}
