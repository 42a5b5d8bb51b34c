use serde::Deserialize;
use serde_json::json;

use acontext_domain::tool::{ToolCall, ToolDefinition};
use acontext_domain::Error;

/// The skill-agent tool set as a sum type, dispatched by name (§4.5.3).
#[derive(Debug, Clone)]
pub enum SkillAgentTool {
    GetSkill { name: String },
    GetSkillFile { name: String, path: String },
    StrReplaceSkillFile { name: String, path: String, old: String, new: String },
    CreateSkillFile { name: String, path: String, content: String },
    CreateSkill { skill_md_content: String },
    DeleteSkillFile { name: String, path: String },
    ReportThinking { text: String },
    Finish,
}

#[derive(Deserialize)]
struct NameArgs {
    name: String,
}

#[derive(Deserialize)]
struct GetFileArgs {
    name: String,
    path: String,
}

#[derive(Deserialize)]
struct StrReplaceArgs {
    name: String,
    path: String,
    old: String,
    new: String,
}

#[derive(Deserialize)]
struct CreateFileArgs {
    name: String,
    path: String,
    content: String,
}

#[derive(Deserialize)]
struct CreateSkillArgs {
    skill_md_content: String,
}

#[derive(Deserialize)]
struct ThinkingArgs {
    text: String,
}

pub fn parse_tool_call(call: &ToolCall) -> acontext_domain::Result<SkillAgentTool> {
    match call.name.as_str() {
        "get_skill" => {
            let args: NameArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(SkillAgentTool::GetSkill { name: args.name })
        }
        "get_skill_file" => {
            let args: GetFileArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(SkillAgentTool::GetSkillFile {
                name: args.name,
                path: args.path,
            })
        }
        "str_replace_skill_file" => {
            let args: StrReplaceArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(SkillAgentTool::StrReplaceSkillFile {
                name: args.name,
                path: args.path,
                old: args.old,
                new: args.new,
            })
        }
        "create_skill_file" => {
            let args: CreateFileArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(SkillAgentTool::CreateSkillFile {
                name: args.name,
                path: args.path,
                content: args.content,
            })
        }
        "create_skill" => {
            let args: CreateSkillArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(SkillAgentTool::CreateSkill {
                skill_md_content: args.skill_md_content,
            })
        }
        "delete_skill_file" => {
            let args: GetFileArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(SkillAgentTool::DeleteSkillFile {
                name: args.name,
                path: args.path,
            })
        }
        "report_thinking" => {
            let args: ThinkingArgs = serde_json::from_value(call.arguments.clone())?;
            Ok(SkillAgentTool::ReportThinking { text: args.text })
        }
        "finish" => Ok(SkillAgentTool::Finish),
        other => Err(Error::ToolReject(format!("unknown tool: {other}"))),
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "get_skill",
            "Look up a skill's metadata and file list",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
        ),
        ToolDefinition::new(
            "get_skill_file",
            "Read a skill file's inline text content",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}, "path": {"type": "string"}},
                "required": ["name", "path"]
            }),
        ),
        ToolDefinition::new(
            "str_replace_skill_file",
            "Replace one exact occurrence of text in a skill file",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "path": {"type": "string"},
                    "old": {"type": "string"},
                    "new": {"type": "string"}
                },
                "required": ["name", "path", "old", "new"]
            }),
        ),
        ToolDefinition::new(
            "create_skill_file",
            "Create a new file under an existing skill (not SKILL.md)",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "path": {"type": "string"},
                    "content": {"type": "string"}
                },
                "required": ["name", "path", "content"]
            }),
        ),
        ToolDefinition::new(
            "create_skill",
            "Create a brand new skill from a full SKILL.md document",
            json!({
                "type": "object",
                "properties": {"skill_md_content": {"type": "string"}},
                "required": ["skill_md_content"]
            }),
        ),
        ToolDefinition::new(
            "delete_skill_file",
            "Delete a file from a skill (not SKILL.md)",
            json!({
                "type": "object",
                "properties": {"name": {"type": "string"}, "path": {"type": "string"}},
                "required": ["name", "path"]
            }),
        ),
        ToolDefinition::new(
            "report_thinking",
            "Record reasoning before making edits",
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            }),
        ),
        ToolDefinition::new("finish", "Terminate the current iteration loop", json!({"type": "object", "properties": {}})),
    ]
}
