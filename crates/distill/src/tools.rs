use serde::Deserialize;
use serde_json::json;

use acontext_domain::entities::TaskStatus;
use acontext_domain::tool::ToolDefinition;

/// Picks the tool schema by task outcome (§4.4 step 4). Exactly one is ever
/// offered to the model per invocation — the outcome is already known from
/// the task's terminal status, so there is nothing to branch on at the tool
/// layer.
pub fn tool_definition_for(status: TaskStatus) -> ToolDefinition {
    match status {
        TaskStatus::Success => ToolDefinition::new(
            "report_success_analysis",
            "Report what made this completed task succeed, for generalization into a reusable skill",
            json!({
                "type": "object",
                "properties": {
                    "task_goal": {"type": "string"},
                    "approach": {"type": "string"},
                    "key_decisions": {"type": "string"},
                    "generalizable_pattern": {"type": "string"}
                },
                "required": ["task_goal", "approach", "key_decisions", "generalizable_pattern"]
            }),
        ),
        TaskStatus::Failed => ToolDefinition::new(
            "report_failure_analysis",
            "Report why this task failed, for generalization into a corrective skill",
            json!({
                "type": "object",
                "properties": {
                    "task_goal": {"type": "string"},
                    "failure_point": {"type": "string"},
                    "flawed_reasoning": {"type": "string"},
                    "what_should_have_been_done": {"type": "string"},
                    "prevention_principle": {"type": "string"}
                },
                "required": ["task_goal", "failure_point", "flawed_reasoning", "what_should_have_been_done", "prevention_principle"]
            }),
        ),
        TaskStatus::Pending | TaskStatus::Running => {
            unreachable!("tool_definition_for only called after a terminal-status check")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SuccessAnalysisArgs {
    pub task_goal: String,
    pub approach: String,
    pub key_decisions: String,
    pub generalizable_pattern: String,
}

#[derive(Debug, Deserialize)]
pub struct FailureAnalysisArgs {
    pub task_goal: String,
    pub failure_point: String,
    pub flawed_reasoning: String,
    pub what_should_have_been_done: String,
    pub prevention_principle: String,
}

pub fn format_success(args: &SuccessAnalysisArgs) -> String {
    format!(
        "## Task Analysis\n\n\
         **Outcome:** success\n\n\
         **Goal:** {}\n\n\
         **Approach:** {}\n\n\
         **Key decisions:** {}\n\n\
         **Generalizable pattern:** {}\n",
        args.task_goal, args.approach, args.key_decisions, args.generalizable_pattern
    )
}

pub fn format_failure(args: &FailureAnalysisArgs) -> String {
    format!(
        "## Task Analysis\n\n\
         **Outcome:** failure\n\n\
         **Goal:** {}\n\n\
         **Failure point:** {}\n\n\
         **Flawed reasoning:** {}\n\n\
         **What should have been done:** {}\n\n\
         **Prevention principle:** {}\n",
        args.task_goal,
        args.failure_point,
        args.flawed_reasoning,
        args.what_should_have_been_done,
        args.prevention_principle
    )
}
