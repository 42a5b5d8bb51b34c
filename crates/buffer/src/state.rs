use async_trait::async_trait;
use uuid::Uuid;

use acontext_domain::entities::MessageId;
use acontext_domain::Result;

/// Pending-message accounting for one session (§4.1).
pub struct PendingState {
    pub pending_count: u32,
    pub latest_pending_message_id: Option<MessageId>,
}

/// Decouples the buffer's admission logic from the concrete store so it can
/// be driven by an in-memory fake in tests (mirrors `acontext_taskagent`'s
/// `TaskAgentStore` seam).
#[async_trait]
pub trait SessionStateStore: Send + Sync {
    async fn pending_state(&self, session_id: Uuid) -> Result<PendingState>;

    /// Pending message ids, oldest first — the batch handed to the task
    /// agent when a process run is admitted.
    async fn pending_message_ids(&self, session_id: Uuid) -> Result<Vec<Uuid>>;

    async fn advance_processed_cursor(&self, session_id: Uuid, message_id: Uuid) -> Result<()>;
}
