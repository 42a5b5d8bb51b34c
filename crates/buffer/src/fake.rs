use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use acontext_domain::Result;

use crate::state::{PendingState, SessionStateStore};

/// In-memory `SessionStateStore`: a per-session ordered list of pending
/// message ids, drained up to (and including) whatever id is passed to
/// `advance_processed_cursor`.
#[derive(Clone, Default)]
pub struct InMemorySessionStateStore {
    inner: Arc<Mutex<HashMap<Uuid, Vec<Uuid>>>>,
}

impl InMemorySessionStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_pending(&self, session_id: Uuid, message_id: Uuid) {
        self.inner.lock().entry(session_id).or_default().push(message_id);
    }
}

#[async_trait]
impl SessionStateStore for InMemorySessionStateStore {
    async fn pending_state(&self, session_id: Uuid) -> Result<PendingState> {
        let map = self.inner.lock();
        let ids = map.get(&session_id);
        Ok(PendingState {
            pending_count: ids.map(|v| v.len() as u32).unwrap_or(0),
            latest_pending_message_id: ids.and_then(|v| v.last().copied()),
        })
    }

    async fn pending_message_ids(&self, session_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self.inner.lock().get(&session_id).cloned().unwrap_or_default())
    }

    async fn advance_processed_cursor(&self, session_id: Uuid, message_id: Uuid) -> Result<()> {
        let mut map = self.inner.lock();
        if let Some(ids) = map.get_mut(&session_id) {
            if let Some(pos) = ids.iter().position(|id| *id == message_id) {
                ids.drain(..=pos);
            }
        }
        Ok(())
    }
}
