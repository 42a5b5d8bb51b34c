use async_trait::async_trait;
use futures_util::stream::StreamExt;
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
        ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::{AMQPValue, FieldTable},
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use tracing::{info, warn};

use crate::topology::all_queues;
use crate::{Acker, Broker, Consumer, Delivery};

pub struct LapinBroker {
    channel: Channel,
}

impl LapinBroker {
    pub async fn connect(amqp_url: &str) -> acontext_domain::Result<Self> {
        let conn = Connection::connect(amqp_url, ConnectionProperties::default())
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("amqp connect: {e}")))?;
        let channel = conn
            .create_channel()
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("amqp channel: {e}")))?;
        let broker = Self { channel };
        broker.declare_topology().await?;
        Ok(broker)
    }

    /// Declares every exchange/queue/binding in §6, idempotently. Retry
    /// queues get `x-message-ttl` (fixed per-queue, matching the config
    /// default for that queue) and `x-dead-letter-exchange` pointed back at
    /// the same exchange with the primary routing key as `x-dead-letter-routing-key`.
    async fn declare_topology(&self) -> acontext_domain::Result<()> {
        let specs = all_queues();
        let mut exchanges = std::collections::HashSet::new();
        for spec in &specs {
            if exchanges.insert(spec.exchange) {
                self.channel
                    .exchange_declare(
                        spec.exchange,
                        ExchangeKind::Topic,
                        ExchangeDeclareOptions {
                            durable: true,
                            ..Default::default()
                        },
                        FieldTable::default(),
                    )
                    .await
                    .map_err(|e| acontext_domain::Error::Transient(format!("exchange_declare: {e}")))?;
            }
        }

        for spec in &specs {
            let mut args = FieldTable::default();
            if let Some(retry) = &spec.retry {
                args.insert("x-dead-letter-exchange".into(), AMQPValue::LongString(spec.exchange.into()));
                args.insert(
                    "x-dead-letter-routing-key".into(),
                    AMQPValue::LongString(retry.dlx_routing_key.into()),
                );
            }
            self.channel
                .queue_declare(
                    spec.queue,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    args,
                )
                .await
                .map_err(|e| acontext_domain::Error::Transient(format!("queue_declare: {e}")))?;
            self.channel
                .queue_bind(
                    spec.queue,
                    spec.exchange,
                    spec.routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| acontext_domain::Error::Transient(format!("queue_bind: {e}")))?;
            info!(exchange = spec.exchange, queue = spec.queue, "declared queue");
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for LapinBroker {
    async fn publish(&self, exchange: &str, routing_key: &str, body: &[u8]) -> acontext_domain::Result<()> {
        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("basic_publish: {e}")))?
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("publish confirm: {e}")))?;
        Ok(())
    }

    async fn publish_with_ttl(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        ttl_ms: u64,
    ) -> acontext_domain::Result<()> {
        let props = BasicProperties::default()
            .with_delivery_mode(2)
            .with_expiration(ttl_ms.to_string().into());
        self.channel
            .basic_publish(exchange, routing_key, BasicPublishOptions::default(), body, props)
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("basic_publish: {e}")))?
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("publish confirm: {e}")))?;
        Ok(())
    }

    async fn consume(&self, queue: &str) -> acontext_domain::Result<Box<dyn Consumer>> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                "acontext-worker",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("basic_consume: {e}")))?;
        Ok(Box::new(LapinConsumer { consumer }))
    }
}

struct LapinConsumer {
    consumer: lapin::Consumer,
}

#[async_trait]
impl Consumer for LapinConsumer {
    async fn recv(&mut self) -> acontext_domain::Result<Option<Delivery>> {
        match self.consumer.next().await {
            None => Ok(None),
            Some(Err(e)) => Err(acontext_domain::Error::Transient(format!("consumer stream: {e}"))),
            Some(Ok(delivery)) => {
                let body = delivery.data.clone();
                Ok(Some(Delivery {
                    body,
                    acker: Box::new(LapinAcker { delivery }),
                }))
            }
        }
    }
}

struct LapinAcker {
    delivery: lapin::message::Delivery,
}

#[async_trait]
impl Acker for LapinAcker {
    async fn ack(&self) -> acontext_domain::Result<()> {
        self.delivery
            .ack(BasicAckOptions::default())
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("ack: {e}")))
    }

    async fn nack(&self, requeue: bool) -> acontext_domain::Result<()> {
        self.delivery
            .nack(BasicNackOptions {
                requeue,
                ..Default::default()
            })
            .await
            .map_err(|e| {
                warn!(error = %e, "nack failed");
                acontext_domain::Error::Transient(format!("nack: {e}"))
            })
    }
}
