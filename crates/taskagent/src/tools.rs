use acontext_domain::entities::TaskStatus;
use acontext_domain::tool::{ToolCall, ToolDefinition};
use acontext_domain::Error;
use serde::Deserialize;
use uuid::Uuid;

/// The task-agent tool set as a sum type (§9: "Dynamic tool registry" ->
/// tagged variants dispatched in a match over the tool-name field).
#[derive(Debug, Clone)]
pub enum TaskAgentTool {
    InsertTask {
        description: String,
        order_after: Option<i32>,
    },
    UpdateTask {
        order: i32,
        description: Option<String>,
        status: Option<TaskStatus>,
    },
    AppendMessagesToTask {
        order: i32,
        message_ids: Vec<Uuid>,
    },
    AppendTaskProgress {
        order: i32,
        progress: String,
    },
    SetTaskUserPreference {
        order: i32,
        pref: String,
    },
    AppendMessagesToPlanningSection {
        message_ids: Vec<Uuid>,
    },
    SubmitUserPreference {
        pref: String,
    },
    ReportThinking {
        text: String,
    },
    Finish,
}

impl TaskAgentTool {
    /// §4.2.2: tools that mutate the structural task set and require a ctx
    /// rebuild on the next use.
    pub fn is_ctx_invalidating(&self) -> bool {
        matches!(self, TaskAgentTool::InsertTask { .. } | TaskAgentTool::UpdateTask { .. })
    }
}

#[derive(Deserialize)]
struct InsertTaskArgs {
    description: String,
    order_after: Option<i32>,
}

#[derive(Deserialize)]
struct UpdateTaskArgs {
    order: i32,
    description: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct AppendMessagesArgs {
    order: i32,
    message_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
struct AppendProgressArgs {
    order: i32,
    progress: String,
}

#[derive(Deserialize)]
struct SetPrefArgs {
    order: i32,
    pref: String,
}

#[derive(Deserialize)]
struct PlanningMessagesArgs {
    message_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
struct SubmitPrefArgs {
    pref: String,
}

#[derive(Deserialize)]
struct ThinkingArgs {
    text: String,
}

fn parse_status(s: &str) -> acontext_domain::Result<TaskStatus> {
    Ok(match s {
        "pending" => TaskStatus::Pending,
        "running" => TaskStatus::Running,
        "success" => TaskStatus::Success,
        "failed" => TaskStatus::Failed,
        other => {
            return Err(Error::ToolReject(format!("invalid status: {other}")));
        }
    })
}

pub fn parse_tool_call(call: &ToolCall) -> acontext_domain::Result<TaskAgentTool> {
    match call.name.as_str() {
        "insert_task" => {
            let args: InsertTaskArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(TaskAgentTool::InsertTask {
                description: args.description,
                order_after: args.order_after,
            })
        }
        "update_task" => {
            let args: UpdateTaskArgs = serde_json::from_value(call.arguments.clone())?;
            let status = args.status.as_deref().map(parse_status).transpose()?;
            Ok(TaskAgentTool::UpdateTask {
                order: args.order,
                description: args.description,
                status,
            })
        }
        "append_messages_to_task" => {
            let args: AppendMessagesArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(TaskAgentTool::AppendMessagesToTask {
                order: args.order,
                message_ids: args.message_ids,
            })
        }
        "append_task_progress" => {
            let args: AppendProgressArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(TaskAgentTool::AppendTaskProgress {
                order: args.order,
                progress: args.progress,
            })
        }
        "set_task_user_preference" => {
            let args: SetPrefArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(TaskAgentTool::SetTaskUserPreference {
                order: args.order,
                pref: args.pref,
            })
        }
        "append_messages_to_planning_section" => {
            let args: PlanningMessagesArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(TaskAgentTool::AppendMessagesToPlanningSection {
                message_ids: args.message_ids,
            })
        }
        "submit_user_preference" => {
            let args: SubmitPrefArgs = serde_json::from_value(call.arguments.clone())?;
            if args.pref.trim().is_empty() {
                return Err(Error::Validation("empty preference".to_string()));
            }
            Ok(TaskAgentTool::SubmitUserPreference { pref: args.pref })
        }
        "report_thinking" => {
            let args: ThinkingArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(TaskAgentTool::ReportThinking { text: args.text })
        }
        "finish" => Ok(TaskAgentTool::Finish),
        other => Err(Error::ToolReject(format!("unknown tool: {other}"))),
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    use serde_json::json;
    vec![
        ToolDefinition::new(
            "insert_task",
            "Insert a new task into the session's plan",
            json!({
                "type": "object",
                "properties": {
                    "description": {"type": "string"},
                    "order_after": {"type": ["integer", "null"]}
                },
                "required": ["description"]
            }),
        ),
        ToolDefinition::new(
            "update_task",
            "Update an existing task's description or status",
            json!({
                "type": "object",
                "properties": {
                    "order": {"type": "integer"},
                    "description": {"type": ["string", "null"]},
                    "status": {"type": ["string", "null"], "enum": ["pending", "running", "success", "failed", null]}
                },
                "required": ["order"]
            }),
        ),
        ToolDefinition::new(
            "append_messages_to_task",
            "Link messages to a task and transition it to running",
            json!({
                "type": "object",
                "properties": {
                    "order": {"type": "integer"},
                    "message_ids": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["order", "message_ids"]
            }),
        ),
        ToolDefinition::new(
            "append_task_progress",
            "Append one progress line to a task",
            json!({
                "type": "object",
                "properties": {"order": {"type": "integer"}, "progress": {"type": "string"}},
                "required": ["order", "progress"]
            }),
        ),
        ToolDefinition::new(
            "set_task_user_preference",
            "Replace a task's recorded user preference",
            json!({
                "type": "object",
                "properties": {"order": {"type": "integer"}, "pref": {"type": "string"}},
                "required": ["order", "pref"]
            }),
        ),
        ToolDefinition::new(
            "append_messages_to_planning_section",
            "Route messages to the session's hidden planning task",
            json!({
                "type": "object",
                "properties": {"message_ids": {"type": "array", "items": {"type": "string"}}},
                "required": ["message_ids"]
            }),
        ),
        ToolDefinition::new(
            "submit_user_preference",
            "Record a user preference independent of task outcome",
            json!({
                "type": "object",
                "properties": {"pref": {"type": "string"}},
                "required": ["pref"]
            }),
        ),
        ToolDefinition::new(
            "report_thinking",
            "Record reasoning before making further edits",
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            }),
        ),
        ToolDefinition::new("finish", "Terminate the current iteration loop", json!({"type": "object", "properties": {}})),
    ]
}
