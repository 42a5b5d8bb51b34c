use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::topology::all_queues;
use crate::{Acker, Broker, Consumer, Delivery};

/// In-process broker that routes by the same exchange/routing-key/queue
/// bindings as [`crate::topology::all_queues`], for tests that exercise
/// publish→consume behavior without a real AMQP server. TTL/DLX semantics
/// are not reproduced — tests that need retry-routing assert on the
/// `publish_with_ttl` call arguments instead.
#[derive(Clone)]
pub struct FakeBroker {
    senders: Arc<Mutex<HashMap<&'static str, mpsc::UnboundedSender<Vec<u8>>>>>,
    receivers: Arc<Mutex<HashMap<&'static str, mpsc::UnboundedReceiver<Vec<u8>>>>>,
    pub published: Arc<Mutex<Vec<(String, String, Vec<u8>)>>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for spec in all_queues() {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(spec.queue, tx);
            receivers.insert(spec.queue, rx);
        }
        Self {
            senders: Arc::new(Mutex::new(senders)),
            receivers: Arc::new(Mutex::new(receivers)),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn queue_for(exchange: &str, routing_key: &str) -> Option<&'static str> {
        all_queues()
            .into_iter()
            .find(|q| q.exchange == exchange && q.routing_key == routing_key)
            .map(|q| q.queue)
    }
}

impl Default for FakeBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for FakeBroker {
    async fn publish(&self, exchange: &str, routing_key: &str, body: &[u8]) -> acontext_domain::Result<()> {
        self.published
            .lock()
            .push((exchange.to_string(), routing_key.to_string(), body.to_vec()));
        if let Some(queue) = Self::queue_for(exchange, routing_key) {
            if let Some(tx) = self.senders.lock().get(queue) {
                let _ = tx.send(body.to_vec());
            }
        }
        Ok(())
    }

    async fn publish_with_ttl(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        _ttl_ms: u64,
    ) -> acontext_domain::Result<()> {
        self.publish(exchange, routing_key, body).await
    }

    async fn consume(&self, queue: &str) -> acontext_domain::Result<Box<dyn Consumer>> {
        let rx = self
            .receivers
            .lock()
            .remove(queue)
            .ok_or_else(|| acontext_domain::Error::FatalBug(format!("queue already consumed: {queue}")))?;
        Ok(Box::new(FakeConsumer { rx }))
    }
}

struct FakeConsumer {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

#[async_trait]
impl Consumer for FakeConsumer {
    async fn recv(&mut self) -> acontext_domain::Result<Option<Delivery>> {
        Ok(self.rx.recv().await.map(|body| Delivery {
            body,
            acker: Box::new(FakeAcker),
        }))
    }
}

struct FakeAcker;

#[async_trait]
impl Acker for FakeAcker {
    async fn ack(&self) -> acontext_domain::Result<()> {
        Ok(())
    }

    async fn nack(&self, _requeue: bool) -> acontext_domain::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acontext_domain::envelope::topology::*;

    #[tokio::test]
    async fn published_message_is_delivered_to_bound_queue() {
        let broker = FakeBroker::new();
        let mut consumer = broker.consume(SESSION_MESSAGE_INSERT_QUEUE).await.unwrap();
        broker
            .publish(SESSION_MESSAGE_EXCHANGE, SESSION_MESSAGE_INSERT_RK, b"hello")
            .await
            .unwrap();
        let delivery = consumer.recv().await.unwrap().unwrap();
        assert_eq!(delivery.body, b"hello");
        delivery.ack().await.unwrap();
    }
}
