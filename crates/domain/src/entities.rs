use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::meta::MetaMap;

pub type ProjectId = Uuid;
pub type SessionId = Uuid;
pub type MessageId = Uuid;
pub type TaskId = Uuid;
pub type LearningSpaceId = Uuid;
pub type SkillId = Uuid;
pub type DiskId = Uuid;
pub type ArtifactId = Uuid;
pub type UserId = Uuid;

/// Root of isolation for every other entity (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub config: MetaMap,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub project_id: ProjectId,
    pub user_id: Option<UserId>,
    pub configs: MetaMap,
    pub learning_space_id: Option<LearningSpaceId>,
    /// Cursor into `messages`: everything at or before this id has already
    /// been folded into a task-agent run. Messages after it are "pending"
    /// for buffering purposes (§4.1).
    pub last_processed_message_id: Option<MessageId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One ordered part of a message's content (text, tool-call, tool-result…).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text { text: String },
    ToolCall { id: String, name: String, arguments: serde_json::Value },
    ToolResult { tool_call_id: String, content: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: Role,
    pub parts: Vec<MessagePart>,
    /// Format-derived meta (provider-specific fields) plus the reserved
    /// `__user_meta__` compartment, kept opaque to the pipeline.
    pub meta: MetaMap,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user_meta(&self) -> MetaMap {
        self.meta.compartment(crate::meta::USER_META_COMPARTMENT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

/// The JSON payload stored in `tasks.data` (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskData {
    pub description: String,
    #[serde(default)]
    pub progresses: Vec<String>,
    #[serde(default)]
    pub user_preferences: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub session_id: SessionId,
    pub order: i32,
    pub status: TaskStatus,
    pub data: TaskData,
    pub is_planning: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn to_string_view(&self) -> String {
        format!(
            "#{} [{:?}]{} {}",
            self.order,
            self.status,
            if self.is_planning { " (planning)" } else { "" },
            self.data.description
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSpace {
    pub id: LearningSpaceId,
    pub project_id: ProjectId,
    pub user_id: Option<UserId>,
    pub meta: MetaMap,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSpaceSession {
    pub learning_space_id: LearningSpaceId,
    pub session_id: SessionId,
    pub status: LearnStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSpaceSkill {
    pub learning_space_id: LearningSpaceId,
    pub skill_id: SkillId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub project_id: ProjectId,
    pub user_id: Option<UserId>,
    pub name: String,
    pub description: String,
    pub disk_id: DiskId,
    pub meta: MetaMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sanitizes a raw skill name into the charset the store's unique index
/// assumes: lowercase alnum and `-`, everything else collapsed to `-`.
pub fn sanitize_skill_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_dash = false;
    for c in raw.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disk {
    pub id: DiskId,
    pub project_id: ProjectId,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetMeta {
    pub bucket: String,
    pub s3_key: String,
    pub etag: String,
    pub sha256: String,
    pub mime: String,
    pub size_b: u64,
    /// Inline text content, kept for grep-style reads without a blob round
    /// trip. Only populated for text-ish mime types.
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub disk_id: DiskId,
    /// Directory portion, always ending in `/`; root is `/`.
    pub path: String,
    pub filename: String,
    pub asset_meta: AssetMeta,
    pub meta: MetaMap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    pub fn full_path(&self) -> String {
        format!("{}{}", self.path, self.filename)
    }
}

/// Splits a normalized `/a/b/c.txt` path into (`/a/b/`, `c.txt`).
pub fn split_skill_path(full: &str) -> crate::error::Result<(String, String)> {
    if !full.starts_with('/') {
        return Err(crate::error::Error::Validation(format!(
            "path must be absolute: {full}"
        )));
    }
    if full.contains("..") {
        return Err(crate::error::Error::Validation(format!(
            "path traversal rejected: {full}"
        )));
    }
    match full.rfind('/') {
        Some(idx) => {
            let (dir, name) = full.split_at(idx + 1);
            if name.is_empty() {
                return Err(crate::error::Error::Validation(format!(
                    "path has no filename: {full}"
                )));
            }
            Ok((dir.to_string(), name.to_string()))
        }
        None => unreachable!("full path always starts with '/'"),
    }
}

pub fn join_skill_path(path: &str, filename: &str) -> String {
    format!("{path}{filename}")
}

pub const SKILL_MD_PATH: &str = "/";
pub const SKILL_MD_FILENAME: &str = "SKILL.md";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_special_chars() {
        assert_eq!(sanitize_skill_name("Daily Logs!!"), "daily-logs");
        assert_eq!(sanitize_skill_name("  user_general facts  "), "user-general-facts");
    }

    #[test]
    fn split_join_round_trip() {
        let (p, f) = split_skill_path("/scripts/a.py").unwrap();
        assert_eq!(p, "/scripts/");
        assert_eq!(f, "a.py");
        assert_eq!(join_skill_path(&p, &f), "/scripts/a.py");

        let (p, f) = split_skill_path("/SKILL.md").unwrap();
        assert_eq!(p, "/");
        assert_eq!(f, "SKILL.md");
        assert_eq!(join_skill_path(&p, &f), "/SKILL.md");
    }

    #[test]
    fn split_rejects_traversal_and_relative() {
        assert!(split_skill_path("../x").is_err());
        assert!(split_skill_path("a/b").is_err());
        assert!(split_skill_path("/a/../b").is_err());
    }

    #[test]
    fn task_status_terminal() {
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }
}
