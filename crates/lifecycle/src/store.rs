use async_trait::async_trait;
use uuid::Uuid;

use acontext_domain::entities::{AssetMeta, Skill};
use acontext_domain::meta::MetaMap;
use acontext_domain::Result;

/// Durable-store seam for Learning-Space lifecycle hooks (§4.6). Kept
/// narrow: only what seeding and its compensation need.
#[async_trait]
pub trait LifecycleStore: Send + Sync {
    async fn create_learning_space(&self, project_id: Uuid, user_id: Option<Uuid>, meta: MetaMap) -> Result<Uuid>;
    async fn delete_learning_space(&self, learning_space_id: Uuid) -> Result<()>;

    /// Atomically creates the disk + skill row for one seeded template, then
    /// upserts its `/SKILL.md` artifact. All in one transaction, mirroring
    /// the skill-agent's `create_skill` tool (§4.5.3).
    async fn create_skill_from_template(
        &self,
        project_id: Uuid,
        user_id: Option<Uuid>,
        name: &str,
        description: &str,
        asset_meta: AssetMeta,
        artifact_info_patch: serde_json::Value,
    ) -> Result<Skill>;

    async fn link_skill_to_space(&self, learning_space_id: Uuid, skill_id: Uuid) -> Result<()>;

    /// Compensation path: best-effort delete of a skill created mid-seeding.
    async fn delete_skill(&self, skill_id: Uuid) -> Result<()>;
}
