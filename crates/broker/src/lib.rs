pub mod fake;
pub mod lapin_broker;
pub mod topology;

use async_trait::async_trait;
use serde::Serialize;

/// AMQP-style topic-exchange broker (§6: "Broker").
///
/// Implementations publish JSON-encoded envelope bodies and hand back typed
/// consumers; the ack/nack decision (and its mapping onto the propagation
/// policy in §7 — NACK for transient errors, ACK-with-log for permanent
/// drops) is made by the caller, not the broker.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn publish(&self, exchange: &str, routing_key: &str, body: &[u8]) -> acontext_domain::Result<()>;

    /// Publishes with a per-message TTL override, used for the retry queues
    /// in §6 (`session.message.insert.retry`, `learning.skill.agent.retry`)
    /// whose DLX re-routes the message back to the primary queue once the
    /// TTL elapses.
    async fn publish_with_ttl(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        ttl_ms: u64,
    ) -> acontext_domain::Result<()>;

    async fn consume(&self, queue: &str) -> acontext_domain::Result<Box<dyn Consumer>>;
}

#[async_trait]
pub trait Consumer: Send {
    async fn recv(&mut self) -> acontext_domain::Result<Option<Delivery>>;
}

/// One received message, still unacknowledged.
pub struct Delivery {
    pub body: Vec<u8>,
    pub(crate) acker: Box<dyn Acker>,
}

#[async_trait]
pub(crate) trait Acker: Send {
    async fn ack(&self) -> acontext_domain::Result<()>;
    async fn nack(&self, requeue: bool) -> acontext_domain::Result<()>;
}

impl Delivery {
    /// Permanent success or permanent-drop path (§7: "ACK with log, no retry").
    pub async fn ack(&self) -> acontext_domain::Result<()> {
        self.acker.ack().await
    }

    /// Transient-failure path: broker redelivers (or, for lock-contention on
    /// the skill-agent queue, callers republish explicitly instead and still
    /// ack this original delivery — see §4.5.1).
    pub async fn nack(&self, requeue: bool) -> acontext_domain::Result<()> {
        self.acker.nack(requeue).await
    }

    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> acontext_domain::Result<T> {
        serde_json::from_slice(&self.body).map_err(acontext_domain::Error::from)
    }
}

pub fn encode<T: Serialize>(envelope: &T) -> acontext_domain::Result<Vec<u8>> {
    serde_json::to_vec(envelope).map_err(acontext_domain::Error::from)
}
