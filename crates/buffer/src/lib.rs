pub mod fake;
pub mod pg;
pub mod service;
pub mod state;

pub use service::{BufferService, SessionProcessor};
pub use state::SessionStateStore;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use uuid::Uuid;

    use acontext_broker::fake::FakeBroker;
    use acontext_broker::{Broker, Consumer};
    use acontext_cache::lock::DistributedLock;
    use acontext_cache::memory::InMemoryCache;
    use acontext_cache::KvCache;
    use acontext_domain::config::BufferConfig;
    use acontext_domain::envelope::{topology, InsertNewMessage};
    use acontext_domain::Result;

    use crate::fake::InMemorySessionStateStore;
    use crate::service::{BufferService, SessionProcessor};

    struct NoopProcessor {
        calls: Mutex<Vec<(Uuid, Vec<Uuid>)>>,
    }

    impl NoopProcessor {
        fn new() -> Self {
            Self { calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl SessionProcessor for NoopProcessor {
        async fn process(&self, _project_id: Uuid, session_id: Uuid, message_ids: Vec<Uuid>) -> Result<()> {
            self.calls.lock().unwrap().push((session_id, message_ids));
            Ok(())
        }
    }

    fn make_service(
        state: Arc<InMemorySessionStateStore>,
        broker: Arc<FakeBroker>,
        processor: Arc<NoopProcessor>,
        config: BufferConfig,
    ) -> BufferService {
        let cache: Arc<dyn KvCache> = Arc::new(InMemoryCache::new());
        BufferService::new(state, broker, DistributedLock::new(cache), config, processor)
    }

    #[tokio::test(start_paused = true)]
    async fn five_rapid_arrivals_publish_exactly_one_timer_envelope() {
        let state = Arc::new(InMemorySessionStateStore::new());
        let broker = Arc::new(FakeBroker::new());
        let processor = Arc::new(NoopProcessor::new());
        let config = BufferConfig {
            session_message_buffer_max_turns: 16,
            session_message_buffer_ttl_seconds: 8,
            ..BufferConfig::default()
        };
        let service = make_service(state.clone(), broker.clone(), processor.clone(), config.clone());

        let session_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            state.push_pending(session_id, *id);
        }

        let mut process_queue = broker
            .consume(topology::SESSION_MESSAGE_BUFFER_PROCESS_QUEUE)
            .await
            .unwrap();

        for id in &ids {
            service
                .handle_insert_new_message(InsertNewMessage {
                    project_id,
                    session_id,
                    message_id: *id,
                    skip_latest_check: false,
                })
                .await
                .unwrap();
        }

        tokio::time::advance(std::time::Duration::from_secs(config.session_message_buffer_ttl_seconds + 1)).await;

        let first = process_queue.recv().await.unwrap();
        assert!(first.is_some(), "expected exactly one timer envelope");

        // No second envelope should be queued: drain with a short timeout.
        let second = tokio::time::timeout(std::time::Duration::from_millis(50), process_queue.recv()).await;
        assert!(second.is_err(), "expected no second timer envelope");
    }

    #[tokio::test]
    async fn pending_at_max_turns_triggers_immediate_process() {
        let state = Arc::new(InMemorySessionStateStore::new());
        let broker = Arc::new(FakeBroker::new());
        let processor = Arc::new(NoopProcessor::new());
        let config = BufferConfig {
            session_message_buffer_max_turns: 2,
            ..BufferConfig::default()
        };
        let service = make_service(state.clone(), broker.clone(), processor.clone(), config);

        let session_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let m1 = Uuid::new_v4();
        let m2 = Uuid::new_v4();
        state.push_pending(session_id, m1);
        state.push_pending(session_id, m2);

        service
            .handle_insert_new_message(InsertNewMessage {
                project_id,
                session_id,
                message_id: m2,
                skip_latest_check: false,
            })
            .await
            .unwrap();

        let calls = processor.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec![m1, m2]);
        // Cursor advanced past both messages.
        drop(calls);
        assert!(state.pending_message_ids(session_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn superseded_arrival_is_dropped() {
        let state = Arc::new(InMemorySessionStateStore::new());
        let broker = Arc::new(FakeBroker::new());
        let processor = Arc::new(NoopProcessor::new());
        let service = make_service(state.clone(), broker.clone(), processor.clone(), BufferConfig::default());

        let session_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let stale_id = Uuid::new_v4();
        let fresh_id = Uuid::new_v4();
        state.push_pending(session_id, stale_id);
        state.push_pending(session_id, fresh_id);

        service
            .handle_insert_new_message(InsertNewMessage {
                project_id,
                session_id,
                message_id: stale_id,
                skip_latest_check: false,
            })
            .await
            .unwrap();

        assert!(processor.calls.lock().unwrap().is_empty());
    }
}
