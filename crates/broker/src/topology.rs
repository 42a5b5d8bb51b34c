use acontext_domain::envelope::topology::*;

/// One row of the MQ topology table in §6: exchange, routing key, queue, and
/// the optional retry/DLX wiring that turns a plain queue into a
/// timed-redelivery buffer.
pub struct QueueSpec {
    pub exchange: &'static str,
    pub routing_key: &'static str,
    pub queue: &'static str,
    /// If set, this queue is a *retry* queue: messages land here with a
    /// per-message TTL and, once expired, are dead-lettered back onto
    /// `dlx_routing_key` on the same exchange.
    pub retry: Option<RetryWiring>,
}

pub struct RetryWiring {
    pub dlx_routing_key: &'static str,
}

/// The full topology declared at startup (§6). Declaring it idempotently on
/// every boot means a fresh broker and a long-lived one converge to the same
/// shape.
pub fn all_queues() -> Vec<QueueSpec> {
    vec![
        QueueSpec {
            exchange: SESSION_MESSAGE_EXCHANGE,
            routing_key: SESSION_MESSAGE_INSERT_RK,
            queue: SESSION_MESSAGE_INSERT_QUEUE,
            retry: None,
        },
        QueueSpec {
            exchange: SESSION_MESSAGE_EXCHANGE,
            routing_key: SESSION_MESSAGE_INSERT_RETRY_RK,
            queue: SESSION_MESSAGE_INSERT_RETRY_QUEUE,
            retry: Some(RetryWiring {
                dlx_routing_key: SESSION_MESSAGE_INSERT_RK,
            }),
        },
        QueueSpec {
            exchange: SESSION_MESSAGE_EXCHANGE,
            routing_key: SESSION_MESSAGE_BUFFER_PROCESS_RK,
            queue: SESSION_MESSAGE_BUFFER_PROCESS_QUEUE,
            retry: None,
        },
        QueueSpec {
            exchange: LEARNING_SKILL_EXCHANGE,
            routing_key: LEARNING_SKILL_DISTILL_RK,
            queue: LEARNING_SKILL_DISTILL_QUEUE,
            retry: None,
        },
        QueueSpec {
            exchange: LEARNING_SKILL_EXCHANGE,
            routing_key: LEARNING_SKILL_AGENT_RK,
            queue: LEARNING_SKILL_AGENT_QUEUE,
            retry: None,
        },
        QueueSpec {
            exchange: LEARNING_SKILL_EXCHANGE,
            routing_key: LEARNING_SKILL_AGENT_RETRY_RK,
            queue: LEARNING_SKILL_AGENT_RETRY_QUEUE,
            retry: Some(RetryWiring {
                dlx_routing_key: LEARNING_SKILL_AGENT_RK,
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_two_retry_queues_wired_to_their_primary() {
        let retryable: Vec<_> = all_queues().into_iter().filter(|q| q.retry.is_some()).collect();
        assert_eq!(retryable.len(), 2);
        assert_eq!(
            retryable[0].retry.as_ref().unwrap().dlx_routing_key,
            SESSION_MESSAGE_INSERT_RK
        );
        assert_eq!(
            retryable[1].retry.as_ref().unwrap().dlx_routing_key,
            LEARNING_SKILL_AGENT_RK
        );
    }
}
