use async_trait::async_trait;
use uuid::Uuid;

use acontext_domain::entities::{Artifact, AssetMeta, Skill};
use acontext_domain::Result;
use acontext_store::Store;

use crate::store::SkillAgentStore;

pub struct PgSkillAgentStore {
    store: Store,
}

impl PgSkillAgentStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SkillAgentStore for PgSkillAgentStore {
    async fn skills_in_space(&self, learning_space_id: Uuid) -> Result<Vec<(Uuid, String, String)>> {
        acontext_store::learning::skills_in_space(self.store.pool(), learning_space_id).await
    }

    async fn get_skill_by_name(&self, project_id: Uuid, name: &str) -> Result<Skill> {
        acontext_store::skills::get_skill_by_name(self.store.pool(), project_id, name).await
    }

    async fn list_artifacts(&self, disk_id: Uuid) -> Result<Vec<Artifact>> {
        acontext_store::skills::list_artifacts(self.store.pool(), disk_id).await
    }

    async fn get_artifact(&self, disk_id: Uuid, path: &str, filename: &str) -> Result<Artifact> {
        acontext_store::skills::get_artifact(self.store.pool(), disk_id, path, filename).await
    }

    async fn upsert_artifact(
        &self,
        disk_id: Uuid,
        path: &str,
        filename: &str,
        asset_meta: AssetMeta,
        artifact_info_patch: serde_json::Value,
    ) -> Result<Artifact> {
        acontext_store::skills::upsert_artifact(self.store.pool(), disk_id, path, filename, asset_meta, artifact_info_patch).await
    }

    async fn rename_artifact(
        &self,
        artifact_id: Uuid,
        new_path: &str,
        new_filename: &str,
        artifact_info: serde_json::Value,
    ) -> Result<Artifact> {
        acontext_store::skills::rename_artifact(self.store.pool(), artifact_id, new_path, new_filename, artifact_info).await
    }

    async fn delete_artifact(&self, disk_id: Uuid, path: &str, filename: &str) -> Result<()> {
        acontext_store::skills::delete_artifact(self.store.pool(), disk_id, path, filename).await
    }

    async fn update_skill_description(&self, skill_id: Uuid, description: &str) -> Result<()> {
        acontext_store::skills::update_skill_description(self.store.pool(), skill_id, description).await
    }

    async fn create_skill(&self, project_id: Uuid, user_id: Option<Uuid>, name: &str, description: &str) -> Result<Skill> {
        let mut tx = self.store.begin().await?;
        let skill = acontext_store::skills::create_skill(tx.conn(), project_id, user_id, name, description).await?;
        tx.commit().await?;
        Ok(skill)
    }

    async fn link_skill_to_space(&self, learning_space_id: Uuid, skill_id: Uuid) -> Result<()> {
        acontext_store::learning::link_skill_to_space(self.store.pool(), learning_space_id, skill_id).await
    }
}
