use uuid::Uuid;

use acontext_broker::Broker;
use acontext_domain::entities::{Message as DomainMessage, MessagePart};
use acontext_domain::envelope::{topology, SkillLearnDistilled, SkillLearnTask};
use acontext_domain::tool::Message as LlmMessage;
use acontext_domain::{Error, Result};
use acontext_llm::LlmClient;

use crate::ctx::{DrainedAccumulators, TaskCtx};
use crate::tools::{parse_tool_call, tool_definitions, TaskAgentTool};
use crate::txn::{TaskAgentStore, TaskAgentTxn};

const SYSTEM_PROMPT: &str = "You are the task-planning agent for a coding assistant session. \
Given the current task plan, known user preferences, and a batch of new messages, use the \
provided tools to keep the plan up to date. Call `finish` once no further tool calls are needed.";

/// One request to run the bounded task-agent loop over a batch of pending
/// messages (§4.2).
pub struct TaskAgentInput {
    pub project_id: Uuid,
    pub session_id: Uuid,
    pub learning_space_id: Option<Uuid>,
    pub message_ids: Vec<Uuid>,
}

pub struct TaskAgentRunner<'a> {
    pub store: &'a dyn TaskAgentStore,
    pub llm: &'a dyn LlmClient,
    pub broker: &'a dyn Broker,
    pub max_iterations: u32,
}

impl<'a> TaskAgentRunner<'a> {
    /// Runs iterations until the LLM emits `finish`/no tool calls or
    /// `max_iterations` is reached. A hard tool error on the last remaining
    /// iteration still propagates (and still drains accumulators) rather
    /// than being swallowed, since a caller-visible rollback is a real
    /// outcome the caller's NACK/ACK decision depends on.
    pub async fn run(&self, input: TaskAgentInput) -> Result<()> {
        for _ in 0..self.max_iterations {
            let should_continue = self.run_iteration(&input).await?;
            if !should_continue {
                break;
            }
        }
        Ok(())
    }

    /// Returns `Ok(true)` if the loop should keep iterating.
    async fn run_iteration(&self, input: &TaskAgentInput) -> Result<bool> {
        let mut txn = self.store.begin().await?;

        let tasks = txn.list_tasks(input.session_id).await?;
        let mut ctx = TaskCtx::new(input.session_id, input.project_id, tasks);
        let preferences = txn.planning_preferences(input.session_id).await?;
        let messages = txn.get_messages(&input.message_ids).await?;

        let prompt = build_user_prompt(&ctx, &preferences, &messages);
        let completion = self
            .llm
            .complete(SYSTEM_PROMPT, &[LlmMessage::user(prompt)], &tool_definitions())
            .await?;

        if !completion.has_tool_calls() {
            txn.commit().await?;
            return Ok(false);
        }

        let mut drained = DrainedAccumulators::default();
        let mut finish_requested = false;
        let mut failure: Option<Error> = None;

        for call in &completion.tool_calls {
            let tool = match parse_tool_call(call) {
                Ok(tool) => tool,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            let invalidates = tool.is_ctx_invalidating();

            match dispatch_tool(txn.as_mut(), &mut ctx, tool).await {
                Ok(DispatchOutcome::Continue) => {}
                Ok(DispatchOutcome::Finish) => finish_requested = true,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }

            if invalidates {
                // §4.2.2: the ctx-invalidating tool's write is already visible
                // to this transaction under read-committed; rebuild by
                // re-querying rather than trusting the stale in-memory list.
                drained.flush_from(&mut ctx);
                ctx.tasks = txn.list_tasks(input.session_id).await?;
            }

            if finish_requested {
                break;
            }
        }

        // §4.2.4: final transfer before any error-return.
        drained.flush_from(&mut ctx);

        match failure {
            Some(err) => {
                txn.rollback().await?;
                drained.clear_learning_task_ids_on_error();
                self.publish_accumulators(input, &drained).await;
                Err(err)
            }
            None => {
                txn.commit().await?;
                self.publish_accumulators(input, &drained).await;
                Ok(!finish_requested)
            }
        }
    }

    async fn publish_accumulators(&self, input: &TaskAgentInput, drained: &DrainedAccumulators) {
        let Some(learning_space_id) = input.learning_space_id else {
            return;
        };

        for task_id in &drained.learning_task_ids {
            let envelope = SkillLearnTask {
                project_id: input.project_id,
                session_id: input.session_id,
                task_id: *task_id,
            };
            if let Err(e) = self.publish_envelope(topology::LEARNING_SKILL_DISTILL_RK, &envelope).await {
                tracing::warn!(error = %e, %task_id, "failed to publish SkillLearnTask; skipping this id");
            }
        }

        if !drained.pending_preferences.is_empty() {
            let distilled_context = format_preferences_only(&drained.pending_preferences);
            let envelope = SkillLearnDistilled {
                project_id: input.project_id,
                session_id: input.session_id,
                task_id: Uuid::nil(),
                learning_space_id,
                distilled_context,
            };
            if let Err(e) = self.publish_envelope(topology::LEARNING_SKILL_AGENT_RK, &envelope).await {
                tracing::warn!(error = %e, "failed to publish preference-only SkillLearnDistilled");
            }
        }
    }

    async fn publish_envelope<T: serde::Serialize>(&self, routing_key: &str, envelope: &T) -> Result<()> {
        let body = acontext_broker::encode(envelope)?;
        self.broker
            .publish(topology::LEARNING_SKILL_EXCHANGE, routing_key, &body)
            .await
    }
}

enum DispatchOutcome {
    Continue,
    Finish,
}

async fn dispatch_tool(txn: &mut dyn TaskAgentTxn, ctx: &mut TaskCtx, tool: TaskAgentTool) -> Result<DispatchOutcome> {
    match tool {
        TaskAgentTool::InsertTask { description, order_after } => {
            txn.insert_task(ctx.session_id, &description, order_after).await?;
            Ok(DispatchOutcome::Continue)
        }
        TaskAgentTool::UpdateTask { order, description, status } => {
            let task = txn
                .update_task(ctx.session_id, order, description.as_deref(), status)
                .await?;
            if matches!(status, Some(s) if s.is_terminal()) {
                ctx.learning_task_ids.push(task.id);
            }
            Ok(DispatchOutcome::Continue)
        }
        TaskAgentTool::AppendMessagesToTask { order, message_ids } => {
            txn.append_messages_to_task(ctx.session_id, order, &message_ids).await?;
            Ok(DispatchOutcome::Continue)
        }
        TaskAgentTool::AppendTaskProgress { order, progress } => {
            txn.append_task_progress(ctx.session_id, order, &progress).await?;
            Ok(DispatchOutcome::Continue)
        }
        TaskAgentTool::SetTaskUserPreference { order, pref } => {
            txn.set_task_user_preference(ctx.session_id, order, &pref).await?;
            Ok(DispatchOutcome::Continue)
        }
        TaskAgentTool::AppendMessagesToPlanningSection { message_ids } => {
            txn.append_messages_to_planning_section(ctx.session_id, &message_ids).await?;
            Ok(DispatchOutcome::Continue)
        }
        TaskAgentTool::SubmitUserPreference { pref } => {
            // §4.2.4/§4.3: the MQ path (ctx.pending_preferences) is the
            // durable guarantee; the DB write is best-effort.
            ctx.pending_preferences.push(pref.clone());
            if let Err(e) = txn.append_planning_user_preference(ctx.session_id, &pref).await {
                tracing::warn!(error = %e, "best-effort planning-task preference persist failed");
            }
            Ok(DispatchOutcome::Continue)
        }
        TaskAgentTool::ReportThinking { .. } => Ok(DispatchOutcome::Continue),
        TaskAgentTool::Finish => Ok(DispatchOutcome::Finish),
    }
}

fn format_preferences_only(prefs: &[String]) -> String {
    let bullets = prefs.iter().map(|p| format!("- {p}")).collect::<Vec<_>>().join("\n");
    format!("## Task Analysis\n\nUser preferences submitted outside a completed task:\n{bullets}")
}

fn format_message(m: &DomainMessage) -> String {
    let text = m
        .parts
        .iter()
        .filter_map(|p| match p {
            MessagePart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{}] {:?}: {}", m.id, m.role, text)
}

fn build_user_prompt(ctx: &TaskCtx, preferences: &[String], messages: &[DomainMessage]) -> String {
    let tasks_view = ctx.to_string_view();
    let prefs_view = if preferences.is_empty() {
        "(none)".to_string()
    } else {
        preferences.iter().map(|p| format!("- {p}")).collect::<Vec<_>>().join("\n")
    };
    let messages_view = messages.iter().map(format_message).collect::<Vec<_>>().join("\n");

    format!(
        "## Current tasks\n{}\n\n## Known user preferences\n{}\n\n## New messages\n{}",
        if tasks_view.is_empty() { "(none)" } else { &tasks_view },
        prefs_view,
        if messages_view.is_empty() { "(none)" } else { &messages_view },
    )
}
