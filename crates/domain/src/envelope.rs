use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{LearningSpaceId, MessageId, ProjectId, SessionId, TaskId};

fn default_false() -> bool {
    false
}

/// Published on message arrival; also republished by the buffer timer with
/// `skip_latest_check=true` (§4.1.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertNewMessage {
    pub project_id: ProjectId,
    pub session_id: SessionId,
    pub message_id: MessageId,
    #[serde(default = "default_false")]
    pub skip_latest_check: bool,
}

/// Published when a task reaches a terminal status and the session is
/// attached to a Learning Space (§4.2.4, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillLearnTask {
    pub project_id: ProjectId,
    pub session_id: SessionId,
    pub task_id: TaskId,
}

/// Published by the distillation consumer, or directly by the task agent for
/// preference-only updates (`task_id = Uuid::nil()`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillLearnDistilled {
    pub project_id: ProjectId,
    pub session_id: SessionId,
    pub task_id: TaskId,
    pub learning_space_id: LearningSpaceId,
    pub distilled_context: String,
}

impl SkillLearnDistilled {
    pub fn is_preference_only(&self) -> bool {
        self.task_id == Uuid::nil()
    }
}

/// MQ topology constants (§6). Exchanges are topic exchanges; routing keys
/// double as queue-binding keys.
pub mod topology {
    pub const SESSION_MESSAGE_EXCHANGE: &str = "session.message";
    pub const SESSION_MESSAGE_INSERT_RK: &str = "session.message.insert";
    pub const SESSION_MESSAGE_INSERT_QUEUE: &str = "session.message.insert.entry";
    pub const SESSION_MESSAGE_INSERT_RETRY_RK: &str = "session.message.insert.retry";
    pub const SESSION_MESSAGE_INSERT_RETRY_QUEUE: &str = "session.message.insert.retry.entry";
    pub const SESSION_MESSAGE_BUFFER_PROCESS_RK: &str = "session.message.buffer.process";
    pub const SESSION_MESSAGE_BUFFER_PROCESS_QUEUE: &str = "session.message.buffer.process.entry";

    pub const LEARNING_SKILL_EXCHANGE: &str = "learning.skill";
    pub const LEARNING_SKILL_DISTILL_RK: &str = "learning.skill.distill";
    pub const LEARNING_SKILL_DISTILL_QUEUE: &str = "learning.skill.distill.entry";
    pub const LEARNING_SKILL_AGENT_RK: &str = "learning.skill.agent";
    pub const LEARNING_SKILL_AGENT_QUEUE: &str = "learning.skill.agent.entry";
    pub const LEARNING_SKILL_AGENT_RETRY_RK: &str = "learning.skill.agent.retry";
    pub const LEARNING_SKILL_AGENT_RETRY_QUEUE: &str = "learning.skill.agent.retry.entry";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_only_envelope_uses_nil_task_id() {
        let env = SkillLearnDistilled {
            project_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            task_id: Uuid::nil(),
            learning_space_id: Uuid::new_v4(),
            distilled_context: "prefers TypeScript".into(),
        };
        assert!(env.is_preference_only());
    }

    #[test]
    fn insert_new_message_defaults_skip_latest_check_false() {
        let json = serde_json::json!({
            "project_id": Uuid::new_v4(),
            "session_id": Uuid::new_v4(),
            "message_id": Uuid::new_v4(),
        });
        let env: InsertNewMessage = serde_json::from_value(json).unwrap();
        assert!(!env.skip_latest_check);
    }
}
