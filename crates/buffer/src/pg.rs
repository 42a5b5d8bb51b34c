use async_trait::async_trait;
use uuid::Uuid;

use acontext_domain::Result;
use acontext_store::Store;

use crate::state::{PendingState, SessionStateStore};

pub struct PgSessionStateStore {
    store: Store,
}

impl PgSessionStateStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SessionStateStore for PgSessionStateStore {
    async fn pending_state(&self, session_id: Uuid) -> Result<PendingState> {
        let s = acontext_store::sessions::pending_state(self.store.pool(), session_id).await?;
        Ok(PendingState {
            pending_count: s.pending_count.max(0) as u32,
            latest_pending_message_id: s.latest_pending_message_id,
        })
    }

    async fn pending_message_ids(&self, session_id: Uuid) -> Result<Vec<Uuid>> {
        acontext_store::sessions::pending_message_ids(self.store.pool(), session_id).await
    }

    async fn advance_processed_cursor(&self, session_id: Uuid, message_id: Uuid) -> Result<()> {
        acontext_store::sessions::advance_processed_cursor(self.store.pool(), session_id, message_id).await
    }
}
