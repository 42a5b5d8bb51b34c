use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use acontext_domain::entities::{sanitize_skill_name, AssetMeta, Disk, LearningSpace, Skill};
use acontext_domain::meta::MetaMap;
use acontext_domain::{Error, Result};

use crate::store::LifecycleStore;

#[derive(Default)]
struct Db {
    spaces: Vec<LearningSpace>,
    skills: Vec<Skill>,
    disks: Vec<Disk>,
    artifacts: Vec<(Uuid, String, String)>,
    space_skills: Vec<(Uuid, Uuid)>,
    fail_after: Option<usize>,
}

/// In-memory `LifecycleStore`, seeded/inspected directly by tests.
#[derive(Clone, Default)]
pub struct InMemoryLifecycleStore {
    inner: Arc<Mutex<Db>>,
}

impl InMemoryLifecycleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spaces(&self) -> Vec<LearningSpace> {
        self.inner.lock().spaces.clone()
    }

    pub fn skills(&self) -> Vec<Skill> {
        self.inner.lock().skills.clone()
    }

    pub fn space_skill_links(&self) -> Vec<(Uuid, Uuid)> {
        self.inner.lock().space_skills.clone()
    }

    /// Test hook: makes every subsequent `create_skill_from_template` call
    /// fail after the given number of successes, to exercise compensation.
    pub fn fail_after(&self, successes: usize) {
        self.inner.lock().fail_after = Some(successes);
    }
}

#[async_trait]
impl LifecycleStore for InMemoryLifecycleStore {
    async fn create_learning_space(&self, project_id: Uuid, user_id: Option<Uuid>, meta: MetaMap) -> Result<Uuid> {
        let mut db = self.inner.lock();
        let space = LearningSpace {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            meta,
            created_at: chrono::Utc::now(),
        };
        let id = space.id;
        db.spaces.push(space);
        Ok(id)
    }

    async fn delete_learning_space(&self, learning_space_id: Uuid) -> Result<()> {
        let mut db = self.inner.lock();
        db.spaces.retain(|s| s.id != learning_space_id);
        db.space_skills.retain(|(ls, _)| *ls != learning_space_id);
        Ok(())
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
        let mut db = self.inner.lock();
        if let Some(budget) = db.fail_after {
            if budget == 0 {
                return Err(Error::Transient("simulated skill-creation failure".to_string()));
            }
            db.fail_after = Some(budget - 1);
        }
        let now = chrono::Utc::now();
        let disk = Disk {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            created_at: now,
        };
        let sanitized = sanitize_skill_name(name);
        let skill = Skill {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            name: sanitized,
            description: description.to_string(),
            disk_id: disk.id,
            meta: MetaMap::new(),
            created_at: now,
            updated_at: now,
        };
        db.disks.push(disk);
        db.skills.push(skill.clone());
        db.artifacts.push((skill.disk_id, "/".to_string(), "SKILL.md".to_string()));
        let _ = (asset_meta, artifact_info_patch);
        Ok(skill)
    }

    async fn link_skill_to_space(&self, learning_space_id: Uuid, skill_id: Uuid) -> Result<()> {
        self.inner.lock().space_skills.push((learning_space_id, skill_id));
        Ok(())
    }

    async fn delete_skill(&self, skill_id: Uuid) -> Result<()> {
        let mut db = self.inner.lock();
        db.skills.retain(|s| s.id != skill_id);
        db.space_skills.retain(|(_, s)| *s != skill_id);
        Ok(())
    }
}
