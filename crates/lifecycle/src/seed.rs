use std::sync::Arc;

use uuid::Uuid;

use acontext_blob::BlobStore;
use acontext_domain::entities::sanitize_skill_name;
use acontext_domain::meta::MetaMap;
use acontext_domain::{Error, Result};
use acontext_skillagent::artifact::upload_and_build_artifact_meta;
use acontext_skillagent::frontmatter::parse_front_matter;

use crate::store::LifecycleStore;
use crate::templates::TEMPLATES;

/// Seeds a newly created Learning Space with the default skill templates
/// (§4.6). On any failure, attempts best-effort compensation: delete every
/// skill already created this call, then delete the space itself, and wrap
/// the original error together with any compensation errors.
///
/// Compensation intentionally keeps running through individual failures
/// (§4.6 step 3: "continue on individual failure") rather than aborting at
/// the first one — a partially-compensated space is strictly worse than a
/// best-effort one.
pub struct LearningSpaceSeeder {
    pub store: Arc<dyn LifecycleStore>,
    pub blob: Arc<dyn BlobStore>,
    pub bucket: String,
}

#[derive(Debug, thiserror::Error)]
#[error("learning space seeding failed: {cause}{compensation}")]
pub struct SeedError {
    cause: Error,
    compensation: CompensationSummary,
}

#[derive(Debug, Default)]
struct CompensationSummary(Vec<String>);

impl std::fmt::Display for CompensationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        write!(f, " (compensation errors: {})", self.0.join("; "))
    }
}

impl LearningSpaceSeeder {
    /// Creates the space, seeds every template skill into it, and links
    /// each. Returns the new Learning Space id.
    pub async fn seed(&self, project_id: Uuid, user_id: Option<Uuid>, meta: MetaMap) -> std::result::Result<Uuid, SeedError> {
        let learning_space_id = self
            .store
            .create_learning_space(project_id, user_id, meta)
            .await
            .map_err(|e| SeedError {
                cause: e,
                compensation: CompensationSummary::default(),
            })?;

        let mut created_skill_ids = Vec::with_capacity(TEMPLATES.len());
        for (slug, content) in TEMPLATES {
            match self.seed_one(project_id, user_id, learning_space_id, content).await {
                Ok(skill_id) => created_skill_ids.push(skill_id),
                Err(cause) => {
                    tracing::warn!(%slug, learning_space_id = %learning_space_id, error = %cause, "learning space seeding failed, compensating");
                    let compensation = self.compensate(&created_skill_ids, learning_space_id).await;
                    return Err(SeedError { cause, compensation });
                }
            }
        }

        Ok(learning_space_id)
    }

    async fn seed_one(&self, project_id: Uuid, user_id: Option<Uuid>, learning_space_id: Uuid, content: &str) -> Result<Uuid> {
        let (name, description) = parse_front_matter(content)?;
        let name = sanitize_skill_name(&name);
        let uploaded = upload_and_build_artifact_meta(&self.blob, &self.bucket, project_id, "/", "SKILL.md", content).await?;
        let skill = self
            .store
            .create_skill_from_template(project_id, user_id, &name, &description, uploaded.asset_meta, uploaded.artifact_info_patch)
            .await?;
        self.store.link_skill_to_space(learning_space_id, skill.id).await?;
        Ok(skill.id)
    }

    /// Best-effort undo, run to completion regardless of the caller's own
    /// cancellation — there is no cancellation token threaded into this
    /// path, so every compensating call always runs to completion once
    /// started (the Rust analogue of "use a background context").
    async fn compensate(&self, created_skill_ids: &[Uuid], learning_space_id: Uuid) -> CompensationSummary {
        let mut errors = Vec::new();
        for skill_id in created_skill_ids {
            if let Err(e) = self.store.delete_skill(*skill_id).await {
                errors.push(format!("delete_skill({skill_id}): {e}"));
            }
        }
        if let Err(e) = self.store.delete_learning_space(learning_space_id).await {
            errors.push(format!("delete_learning_space({learning_space_id}): {e}"));
        }
        CompensationSummary(errors)
    }
}
