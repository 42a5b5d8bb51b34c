use async_trait::async_trait;
use uuid::Uuid;

use acontext_domain::entities::{Artifact, Skill};
use acontext_domain::Result;

/// What one skill-agent tool call needs from durable storage. Every method
/// opens and commits its own unit of work — §4.5.2: "each iteration: open a
/// fresh DB session (tool-level mutations are individually durable)".
#[async_trait]
pub trait SkillAgentStore: Send + Sync {
    async fn skills_in_space(&self, learning_space_id: Uuid) -> Result<Vec<(Uuid, String, String)>>;
    async fn get_skill_by_name(&self, project_id: Uuid, name: &str) -> Result<Skill>;
    async fn list_artifacts(&self, disk_id: Uuid) -> Result<Vec<Artifact>>;
    async fn get_artifact(&self, disk_id: Uuid, path: &str, filename: &str) -> Result<Artifact>;
    async fn upsert_artifact(
        &self,
        disk_id: Uuid,
        path: &str,
        filename: &str,
        asset_meta: acontext_domain::entities::AssetMeta,
        artifact_info_patch: serde_json::Value,
    ) -> Result<Artifact>;
    async fn rename_artifact(
        &self,
        artifact_id: Uuid,
        new_path: &str,
        new_filename: &str,
        artifact_info: serde_json::Value,
    ) -> Result<Artifact>;
    async fn delete_artifact(&self, disk_id: Uuid, path: &str, filename: &str) -> Result<()>;
    async fn update_skill_description(&self, skill_id: Uuid, description: &str) -> Result<()>;
    async fn create_skill(
        &self,
        project_id: Uuid,
        user_id: Option<Uuid>,
        name: &str,
        description: &str,
    ) -> Result<Skill>;
    async fn link_skill_to_space(&self, learning_space_id: Uuid, skill_id: Uuid) -> Result<()>;
}
