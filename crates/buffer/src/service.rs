use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use acontext_broker::Broker;
use acontext_cache::lock::DistributedLock;
use acontext_domain::config::BufferConfig;
use acontext_domain::envelope::{topology, InsertNewMessage};
use acontext_domain::{Error, Result};

use crate::state::SessionStateStore;

/// Whatever runs once a batch of pending messages is admitted for
/// processing — in the real binary, one task-agent iteration loop
/// (`acontext-taskagent`). Buffer doesn't depend on that crate directly so
/// the two can be tested in isolation; the worker binary wires them
/// together.
#[async_trait]
pub trait SessionProcessor: Send + Sync {
    async fn process(&self, project_id: Uuid, session_id: Uuid, message_ids: Vec<Uuid>) -> Result<()>;
}

/// The buffering & turn-admission subsystem (§4.1). Cheaply `Clone`: every
/// field is an `Arc` or a small value type, which is what lets
/// `schedule_timer` spawn a detached task that outlives the handler call
/// that created it.
#[derive(Clone)]
pub struct BufferService {
    state: Arc<dyn SessionStateStore>,
    broker: Arc<dyn Broker>,
    lock: DistributedLock,
    config: BufferConfig,
    processor: Arc<dyn SessionProcessor>,
}

impl BufferService {
    pub fn new(
        state: Arc<dyn SessionStateStore>,
        broker: Arc<dyn Broker>,
        lock: DistributedLock,
        config: BufferConfig,
        processor: Arc<dyn SessionProcessor>,
    ) -> Self {
        Self {
            state,
            broker,
            lock,
            config,
            processor,
        }
    }

    /// Public contract entry point: publishes the arrival envelope that
    /// kicks off the `insert_new_message` consumer.
    pub async fn on_message_arrival(&self, project_id: Uuid, session_id: Uuid, message_id: Uuid) -> Result<()> {
        let envelope = InsertNewMessage {
            project_id,
            session_id,
            message_id,
            skip_latest_check: false,
        };
        self.publish_insert(&envelope).await
    }

    /// `insert_new_message` consumer (§4.1 steps 1-4).
    pub async fn handle_insert_new_message(&self, envelope: InsertNewMessage) -> Result<()> {
        let pending = self.state.pending_state(envelope.session_id).await?;

        if !envelope.skip_latest_check && pending.latest_pending_message_id != Some(envelope.message_id) {
            tracing::debug!(session_id = %envelope.session_id, message_id = %envelope.message_id, "superseded arrival dropped");
            return Ok(());
        }

        if pending.pending_count >= self.config.session_message_buffer_max_turns {
            self.attempt_process(&envelope).await
        } else {
            self.schedule_timer(envelope.project_id, envelope.session_id, envelope.message_id).await;
            Ok(())
        }
    }

    /// `buffer_new_message` consumer: the delayed timer envelope (§4.1.1).
    pub async fn handle_buffer_new_message(&self, envelope: InsertNewMessage) -> Result<()> {
        if !envelope.skip_latest_check {
            let pending = self.state.pending_state(envelope.session_id).await?;
            if pending.latest_pending_message_id != Some(envelope.message_id) {
                return Ok(());
            }
        }
        self.attempt_process(&envelope).await
    }

    /// Explicit end-of-turn flush (§4.1.2): blocks (via bounded polling,
    /// never busy-spins) until the processing lock is acquired or the retry
    /// budget is exhausted.
    pub async fn flush_session_message_blocking(&self, project_id: Uuid, session_id: Uuid) -> Result<()> {
        let key = DistributedLock::session_message_key(&project_id.to_string(), &session_id.to_string());
        for attempt in 0..self.config.session_message_flush_max_retries {
            if let Some(handle) = self
                .lock
                .try_acquire(&key, self.config.session_message_processing_timeout_seconds)
                .await?
            {
                let result = self.process_session_pending_messages(project_id, session_id).await;
                handle.release().await;
                return result;
            }
            tracing::debug!(%session_id, attempt, "flush: processing lock contended, waiting");
            tokio::time::sleep(Duration::from_secs(self.config.session_message_session_lock_wait_seconds)).await;
        }
        Err(Error::FlushExhausted(self.config.session_message_flush_max_retries))
    }

    /// §4.1.3: acquire the per-session processing lock, or republish to the
    /// retry queue on contention. The republished envelope always carries
    /// `skip_latest_check=true` — the supersede decision for this arrival
    /// has already been made; the retry path exists to wait out lock
    /// contention, not to re-run admission.
    async fn attempt_process(&self, envelope: &InsertNewMessage) -> Result<()> {
        let key = DistributedLock::session_message_key(&envelope.project_id.to_string(), &envelope.session_id.to_string());
        match self
            .lock
            .try_acquire(&key, self.config.session_message_processing_timeout_seconds)
            .await?
        {
            Some(handle) => {
                let result = self
                    .process_session_pending_messages(envelope.project_id, envelope.session_id)
                    .await;
                handle.release().await;
                result
            }
            None => {
                let retry_envelope = InsertNewMessage {
                    skip_latest_check: true,
                    ..envelope.clone()
                };
                let body = acontext_broker::encode(&retry_envelope)?;
                self.broker
                    .publish_with_ttl(
                        topology::SESSION_MESSAGE_EXCHANGE,
                        topology::SESSION_MESSAGE_INSERT_RETRY_RK,
                        &body,
                        self.config.session_message_session_lock_wait_seconds * 1000,
                    )
                    .await
            }
        }
    }

    async fn process_session_pending_messages(&self, project_id: Uuid, session_id: Uuid) -> Result<()> {
        let message_ids = self.state.pending_message_ids(session_id).await?;
        let Some(&last) = message_ids.last() else {
            return Ok(());
        };
        self.processor.process(project_id, session_id, message_ids.clone()).await?;
        self.state.advance_processed_cursor(session_id, last).await
    }

    /// §4.1.1: atomic dedup set, then (only on success) spawn the delayed
    /// publish. A lost race here means another worker already owns the
    /// timer for this session/TTL window.
    async fn schedule_timer(&self, project_id: Uuid, session_id: Uuid, message_id: Uuid) {
        let key = DistributedLock::buffer_timer_key(&project_id.to_string(), &session_id.to_string());
        let ttl = self.config.session_message_buffer_ttl_seconds;
        match self.lock.try_set_timer_flag(&key, ttl).await {
            Ok(true) => {
                let broker = self.broker.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(ttl)).await;
                    let envelope = InsertNewMessage {
                        project_id,
                        session_id,
                        message_id,
                        skip_latest_check: true,
                    };
                    if let Ok(body) = acontext_broker::encode(&envelope) {
                        if let Err(e) = broker
                            .publish(
                                topology::SESSION_MESSAGE_EXCHANGE,
                                topology::SESSION_MESSAGE_BUFFER_PROCESS_RK,
                                &body,
                            )
                            .await
                        {
                            tracing::warn!(error = %e, %session_id, "failed to publish buffer timer envelope");
                        }
                    }
                });
            }
            Ok(false) => {
                tracing::debug!(%session_id, "buffer timer already scheduled for this TTL window");
            }
            Err(e) => tracing::warn!(error = %e, %session_id, "failed to set buffer timer dedup key"),
        }
    }

    async fn publish_insert(&self, envelope: &InsertNewMessage) -> Result<()> {
        let body = acontext_broker::encode(envelope)?;
        self.broker
            .publish(topology::SESSION_MESSAGE_EXCHANGE, topology::SESSION_MESSAGE_INSERT_RK, &body)
            .await
    }
}
