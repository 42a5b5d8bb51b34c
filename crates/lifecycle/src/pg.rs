use async_trait::async_trait;
use uuid::Uuid;

use acontext_domain::entities::{AssetMeta, Skill};
use acontext_domain::meta::MetaMap;
use acontext_domain::Result;
use acontext_store::Store;

use crate::store::LifecycleStore;

pub struct PgLifecycleStore {
    store: Store,
}

impl PgLifecycleStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LifecycleStore for PgLifecycleStore {
    async fn create_learning_space(&self, project_id: Uuid, user_id: Option<Uuid>, meta: MetaMap) -> Result<Uuid> {
        let space = acontext_store::learning::create_learning_space(self.store.pool(), project_id, user_id, meta).await?;
        Ok(space.id)
    }

    async fn delete_learning_space(&self, learning_space_id: Uuid) -> Result<()> {
        acontext_store::learning::delete_learning_space(self.store.pool(), learning_space_id).await
    }

    async fn create_skill_from_template(
        &self,
        project_id: Uuid,
        user_id: Option<Uuid>,
        name: &str,
        description: &str,
        asset_meta: AssetMeta,
        artifact_info_patch: serde_json::Value,
    ) -> Result<Skill> {
        let mut tx = self.store.begin().await?;
        let skill = acontext_store::skills::create_skill(tx.conn(), project_id, user_id, name, description).await?;
        acontext_store::skills::upsert_artifact(tx.conn(), skill.disk_id, "/", "SKILL.md", asset_meta, artifact_info_patch).await?;
        tx.commit().await?;
        Ok(skill)
    }

    async fn link_skill_to_space(&self, learning_space_id: Uuid, skill_id: Uuid) -> Result<()> {
        acontext_store::learning::link_skill_to_space(self.store.pool(), learning_space_id, skill_id).await
    }

    async fn delete_skill(&self, skill_id: Uuid) -> Result<()> {
        acontext_store::skills::delete_skill(self.store.pool(), skill_id).await
    }
}
