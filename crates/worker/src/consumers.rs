use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use acontext_broker::Broker;
use acontext_domain::{Error, Result};

/// Drives one queue to completion of the process (it never returns under
/// normal operation). Ack/nack decisions follow §7's propagation table:
/// a transient error nacks-and-requeues, everything else (success or a
/// permanent-drop error) acks with a log line — the handler itself already
/// logged the drop reason where one exists (distill, skill-agent).
///
/// A malformed envelope body can never be retried productively, so it's
/// acked (with an error log) rather than nacked into an infinite redelivery
/// loop.
///
/// `timeout` bounds a single `handler` invocation (§5/§6:
/// `mq_consumer_handler_timeout`, overridden per-queue e.g. for skill-agent).
/// A handler that doesn't finish within it is treated as transient and
/// nacked for redelivery, same as any other transient error.
pub async fn run_consumer<T, F, Fut>(broker: Arc<dyn Broker>, queue: &'static str, timeout: Duration, handler: F)
where
    T: serde::de::DeserializeOwned,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send,
{
    let mut consumer = match broker.consume(queue).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(%queue, error = %e, "failed to start consumer");
            return;
        }
    };

    loop {
        let delivery = match consumer.recv().await {
            Ok(Some(d)) => d,
            Ok(None) => {
                tracing::info!(%queue, "consumer channel closed");
                break;
            }
            Err(e) => {
                tracing::error!(%queue, error = %e, "error receiving delivery");
                continue;
            }
        };

        let envelope: T = match delivery.deserialize() {
            Ok(e) => e,
            Err(e) => {
                tracing::error!(%queue, error = %e, "dropping malformed envelope body");
                if let Err(e) = delivery.ack().await {
                    tracing::warn!(%queue, error = %e, "failed to ack malformed delivery");
                }
                continue;
            }
        };

        let outcome = match tokio::time::timeout(timeout, handler(envelope)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%queue, ?timeout, "handler timed out");
                Err(Error::Transient(format!("handler timed out after {timeout:?}")))
            }
        };

        match outcome {
            Ok(()) => {
                if let Err(e) = delivery.ack().await {
                    tracing::warn!(%queue, error = %e, "failed to ack delivery");
                }
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(%queue, error = %e, "transient failure, nacking for redelivery");
                if let Err(e) = delivery.nack(true).await {
                    tracing::warn!(%queue, error = %e, "failed to nack delivery");
                }
            }
            Err(e) => {
                tracing::error!(%queue, error = %e, "permanent failure, acking with log (no retry)");
                if let Err(e) = delivery.ack().await {
                    tracing::warn!(%queue, error = %e, "failed to ack delivery");
                }
            }
        }
    }
}
