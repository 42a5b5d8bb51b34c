use acontext_broker::Broker;
use acontext_cache::lock::DistributedLock;
use acontext_domain::config::SkillAgentConfig;
use acontext_domain::envelope::{topology, SkillLearnDistilled};
use acontext_domain::Result;

use crate::agent::{SkillAgentInput, SkillAgentRunner};

/// Outcome of one `learning.skill.agent` delivery, for the consumer loop to
/// decide ack/nack/republish.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Ran,
    Republished,
}

/// Wraps one `SkillAgentRunner` with the per-Learning-Space lock + retry
/// protocol (§4.5.1).
pub struct SkillAgentConsumer {
    runner: SkillAgentRunner,
    broker: std::sync::Arc<dyn Broker>,
    lock: DistributedLock,
    config: SkillAgentConfig,
}

impl SkillAgentConsumer {
    pub fn new(runner: SkillAgentRunner, broker: std::sync::Arc<dyn Broker>, lock: DistributedLock, config: SkillAgentConfig) -> Self {
        Self {
            runner,
            broker,
            lock,
            config,
        }
    }

    pub async fn handle(&self, envelope: SkillLearnDistilled) -> Result<ConsumeOutcome> {
        let key = DistributedLock::skill_learn_key(&envelope.project_id.to_string(), &envelope.learning_space_id.to_string());
        match self.lock.try_acquire(&key, self.config.skill_learn_lock_ttl_seconds).await? {
            Some(handle) => {
                let result = self
                    .runner
                    .run(SkillAgentInput {
                        project_id: envelope.project_id,
                        user_id: None,
                        learning_space_id: envelope.learning_space_id,
                        distilled_context: envelope.distilled_context.clone(),
                    })
                    .await;
                handle.release().await;
                result.map(|_| ConsumeOutcome::Ran)
            }
            None => {
                let body = acontext_broker::encode(&envelope)?;
                self.broker
                    .publish_with_ttl(
                        topology::LEARNING_SKILL_EXCHANGE,
                        topology::LEARNING_SKILL_AGENT_RETRY_RK,
                        &body,
                        self.config.skill_learn_agent_retry_delay_seconds * 1000,
                    )
                    .await?;
                Ok(ConsumeOutcome::Republished)
            }
        }
    }
}
