use std::sync::Arc;

use uuid::Uuid;

use acontext_broker::Broker;
use acontext_domain::entities::{Message, Task, TaskStatus};
use acontext_domain::envelope::{topology, SkillLearnDistilled, SkillLearnTask};
use acontext_domain::tool::Message as LlmMessage;
use acontext_domain::Result;
use acontext_llm::LlmClient;

use crate::store::DistillStore;
use crate::tools::{format_failure, format_success, tool_definition_for, FailureAnalysisArgs, SuccessAnalysisArgs};

const SYSTEM_PROMPT: &str = "\
You analyze one completed or failed task from a session's work log and report \
a structured, generalizable takeaway by calling the provided tool exactly once. \
Do not narrate; call the tool.";

/// Why a `SkillLearnTask` envelope was dropped instead of producing a
/// `SkillLearnDistilled` envelope. All drops are permanent — distillation
/// never retries (§4.4 step 5, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NoLearningSpace,
    TaskGone,
    TaskNotTerminal,
    NoToolCall,
    WrongTool,
    MissingFields,
}

impl DropReason {
    fn as_str(&self) -> &'static str {
        match self {
            DropReason::NoLearningSpace => "session has no attached learning space",
            DropReason::TaskGone => "task no longer exists",
            DropReason::TaskNotTerminal => "task is not in a terminal status",
            DropReason::NoToolCall => "model returned no tool call",
            DropReason::WrongTool => "model called an unexpected tool",
            DropReason::MissingFields => "tool call is missing required fields",
        }
    }
}

#[derive(Debug)]
pub enum DistillOutcome {
    Published,
    Dropped(DropReason),
}

pub struct DistillConsumer {
    store: Arc<dyn DistillStore>,
    llm: Arc<dyn LlmClient>,
    broker: Arc<dyn Broker>,
}

impl DistillConsumer {
    pub fn new(store: Arc<dyn DistillStore>, llm: Arc<dyn LlmClient>, broker: Arc<dyn Broker>) -> Self {
        Self { store, llm, broker }
    }

    /// The `learning.skill.distill` consumer (§4.4). Transient store/LLM/
    /// broker errors are propagated as `Err` so the caller NACKs for retry;
    /// every other outcome here is a deliberate, logged, permanent drop.
    pub async fn handle(&self, envelope: SkillLearnTask) -> Result<DistillOutcome> {
        let Some(learning_space_id) = self.store.learning_space_for_session(envelope.session_id).await? else {
            return Ok(self.drop(&envelope, DropReason::NoLearningSpace));
        };

        let task = match self.store.get_task(envelope.task_id).await {
            Ok(task) => task,
            Err(e) if e.is_permanent_drop() => return Ok(self.drop(&envelope, DropReason::TaskGone)),
            Err(e) => return Err(e),
        };

        if !task.status.is_terminal() {
            return Ok(self.drop(&envelope, DropReason::TaskNotTerminal));
        }

        let message_ids = self.store.task_message_ids(task.id).await?;
        let messages = self.store.get_messages(&message_ids).await?;
        let session_tasks = self.store.list_tasks(envelope.session_id).await?;

        let tool_def = tool_definition_for(task.status);
        let prompt = build_prompt(&task, &messages, &session_tasks);
        let completion = self
            .llm
            .complete(SYSTEM_PROMPT, &[LlmMessage::user(prompt)], std::slice::from_ref(&tool_def))
            .await?;

        let Some(call) = completion.tool_calls.first() else {
            return Ok(self.drop(&envelope, DropReason::NoToolCall));
        };
        if call.name != tool_def.name {
            return Ok(self.drop(&envelope, DropReason::WrongTool));
        }

        let distilled_context = match task.status {
            TaskStatus::Success => match serde_json::from_value::<SuccessAnalysisArgs>(call.arguments.clone()) {
                Ok(args) => format_success(&args),
                Err(_) => return Ok(self.drop(&envelope, DropReason::MissingFields)),
            },
            TaskStatus::Failed => match serde_json::from_value::<FailureAnalysisArgs>(call.arguments.clone()) {
                Ok(args) => format_failure(&args),
                Err(_) => return Ok(self.drop(&envelope, DropReason::MissingFields)),
            },
            TaskStatus::Pending | TaskStatus::Running => unreachable!("checked is_terminal above"),
        };

        let out = SkillLearnDistilled {
            project_id: envelope.project_id,
            session_id: envelope.session_id,
            task_id: task.id,
            learning_space_id,
            distilled_context,
        };
        let body = acontext_broker::encode(&out)?;
        self.broker
            .publish(topology::LEARNING_SKILL_EXCHANGE, topology::LEARNING_SKILL_AGENT_RK, &body)
            .await?;
        Ok(DistillOutcome::Published)
    }

    fn drop(&self, envelope: &SkillLearnTask, reason: DropReason) -> DistillOutcome {
        tracing::info!(
            session_id = %envelope.session_id,
            task_id = %envelope.task_id,
            reason = reason.as_str(),
            "dropping skill-learn task: no retry"
        );
        DistillOutcome::Dropped(reason)
    }
}

fn format_message(m: &Message) -> String {
    let text: String = m
        .parts
        .iter()
        .filter_map(|p| match p {
            acontext_domain::entities::MessagePart::Text { text } => Some(text.clone()),
            acontext_domain::entities::MessagePart::ToolCall { name, .. } => Some(format!("(called {name})")),
            acontext_domain::entities::MessagePart::ToolResult { content, .. } => Some(content.clone()),
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{:?}] {text}", m.role)
}

fn build_prompt(task: &Task, messages: &[Message], session_tasks: &[Task]) -> String {
    let mut out = String::new();
    out.push_str("## Target task\n");
    out.push_str(&task.to_string_view());
    out.push('\n');
    if !task.data.progresses.is_empty() {
        out.push_str("\nProgress log:\n");
        for p in &task.data.progresses {
            out.push_str("- ");
            out.push_str(p);
            out.push('\n');
        }
    }

    out.push_str("\n## Linked messages\n");
    for m in messages {
        out.push_str(&format_message(m));
        out.push('\n');
    }

    out.push_str("\n## Other tasks in this session (context only)\n");
    for t in session_tasks {
        if t.id != task.id {
            out.push_str(&t.to_string_view());
            out.push('\n');
        }
    }

    out
}
