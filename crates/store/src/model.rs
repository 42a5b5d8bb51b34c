use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use acontext_domain::entities::{
    AssetMeta, Artifact, Disk, LearnStatus, LearningSpace, LearningSpaceSession, LearningSpaceSkill,
    Message, MessagePart, Project, Role, Session, Skill, Task, TaskData, TaskStatus,
};
use acontext_domain::meta::MetaMap;

#[derive(FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub config: Json<serde_json::Map<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(r: ProjectRow) -> Self {
        Project {
            id: r.id,
            config: MetaMap(r.config.0),
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Option<Uuid>,
    pub configs: Json<serde_json::Map<String, serde_json::Value>>,
    pub learning_space_id: Option<Uuid>,
    pub last_processed_message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<SessionRow> for Session {
    fn from(r: SessionRow) -> Self {
        Session {
            id: r.id,
            project_id: r.project_id,
            user_id: r.user_id,
            configs: MetaMap(r.configs.0),
            learning_space_id: r.learning_space_id,
            last_processed_message_id: r.last_processed_message_id,
            created_at: r.created_at,
        }
    }
}

fn role_to_text(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn role_from_text(s: &str) -> Role {
    match s {
        "system" => Role::System,
        "assistant" => Role::Assistant,
        "tool" => Role::Tool,
        _ => Role::User,
    }
}

#[derive(FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: String,
    pub parts: Json<Vec<MessagePart>>,
    pub meta: Json<serde_json::Map<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(r: MessageRow) -> Self {
        Message {
            id: r.id,
            session_id: r.session_id,
            role: role_from_text(&r.role),
            parts: r.parts.0,
            meta: MetaMap(r.meta.0),
            created_at: r.created_at,
        }
    }
}

pub fn role_as_text(role: Role) -> &'static str {
    role_to_text(role)
}

fn status_to_text(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::Pending => "pending",
        TaskStatus::Running => "running",
        TaskStatus::Success => "success",
        TaskStatus::Failed => "failed",
    }
}

fn status_from_text(s: &str) -> acontext_domain::Result<TaskStatus> {
    Ok(match s {
        "pending" => TaskStatus::Pending,
        "running" => TaskStatus::Running,
        "success" => TaskStatus::Success,
        "failed" => TaskStatus::Failed,
        other => {
            return Err(acontext_domain::Error::Validation(format!(
                "invalid task status: {other}"
            )))
        }
    })
}

pub fn status_as_text(status: TaskStatus) -> &'static str {
    status_to_text(status)
}

pub fn parse_status(s: &str) -> acontext_domain::Result<TaskStatus> {
    status_from_text(s)
}

#[derive(FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub order_idx: i32,
    pub status: String,
    pub data: Json<TaskData>,
    pub is_planning: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = acontext_domain::Error;

    fn try_from(r: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: r.id,
            session_id: r.session_id,
            order: r.order_idx,
            status: status_from_text(&r.status)?,
            data: r.data.0,
            is_planning: r.is_planning,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(FromRow)]
pub struct LearningSpaceRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Option<Uuid>,
    pub meta: Json<serde_json::Map<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

impl From<LearningSpaceRow> for LearningSpace {
    fn from(r: LearningSpaceRow) -> Self {
        LearningSpace {
            id: r.id,
            project_id: r.project_id,
            user_id: r.user_id,
            meta: MetaMap(r.meta.0),
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
pub struct LearningSpaceSessionRow {
    pub learning_space_id: Uuid,
    pub session_id: Uuid,
    pub status: String,
}

impl TryFrom<LearningSpaceSessionRow> for LearningSpaceSession {
    type Error = acontext_domain::Error;

    fn try_from(r: LearningSpaceSessionRow) -> Result<Self, Self::Error> {
        Ok(LearningSpaceSession {
            learning_space_id: r.learning_space_id,
            session_id: r.session_id,
            status: match r.status.as_str() {
                "pending" => LearnStatus::Pending,
                "completed" => LearnStatus::Completed,
                "failed" => LearnStatus::Failed,
                other => {
                    return Err(acontext_domain::Error::Validation(format!(
                        "invalid learn status: {other}"
                    )))
                }
            },
        })
    }
}

pub fn learn_status_as_text(status: LearnStatus) -> &'static str {
    match status {
        LearnStatus::Pending => "pending",
        LearnStatus::Completed => "completed",
        LearnStatus::Failed => "failed",
    }
}

#[derive(FromRow)]
pub struct LearningSpaceSkillRow {
    pub learning_space_id: Uuid,
    pub skill_id: Uuid,
}

impl From<LearningSpaceSkillRow> for LearningSpaceSkill {
    fn from(r: LearningSpaceSkillRow) -> Self {
        LearningSpaceSkill {
            learning_space_id: r.learning_space_id,
            skill_id: r.skill_id,
        }
    }
}

#[derive(FromRow)]
pub struct SkillRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub disk_id: Uuid,
    pub meta: Json<serde_json::Map<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SkillRow> for Skill {
    fn from(r: SkillRow) -> Self {
        Skill {
            id: r.id,
            project_id: r.project_id,
            user_id: r.user_id,
            name: r.name,
            description: r.description,
            disk_id: r.disk_id,
            meta: MetaMap(r.meta.0),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
pub struct DiskRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<DiskRow> for Disk {
    fn from(r: DiskRow) -> Self {
        Disk {
            id: r.id,
            project_id: r.project_id,
            user_id: r.user_id,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
pub struct ArtifactRow {
    pub id: Uuid,
    pub disk_id: Uuid,
    pub path: String,
    pub filename: String,
    pub asset_meta: Json<AssetMeta>,
    pub meta: Json<serde_json::Map<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ArtifactRow> for Artifact {
    fn from(r: ArtifactRow) -> Self {
        Artifact {
            id: r.id,
            disk_id: r.disk_id,
            path: r.path,
            filename: r.filename,
            asset_meta: r.asset_meta.0,
            meta: MetaMap(r.meta.0),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
