use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use acontext_domain::entities::{sanitize_skill_name, Artifact, AssetMeta, Disk, Skill};
use acontext_domain::meta::MetaMap;
use acontext_domain::{Error, Result};

use crate::store::SkillAgentStore;

#[derive(Default)]
struct Db {
    skills: Vec<Skill>,
    disks: Vec<Disk>,
    artifacts: Vec<Artifact>,
    space_skills: Vec<(Uuid, Uuid)>,
}

/// In-memory `SkillAgentStore`, seeded directly by tests. Mirrors the real
/// upsert/rename semantics (merge `__artifact_info__`, last-writer-wins for
/// the rest of `meta`) closely enough to exercise the tool layer.
#[derive(Clone, Default)]
pub struct InMemorySkillAgentStore {
    inner: Arc<Mutex<Db>>,
}

impl InMemorySkillAgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_skill(&self, skill: Skill) {
        self.inner.lock().skills.push(skill);
    }

    pub fn seed_disk(&self, disk: Disk) {
        self.inner.lock().disks.push(disk);
    }

    pub fn seed_artifact(&self, artifact: Artifact) {
        self.inner.lock().artifacts.push(artifact);
    }

    pub fn link(&self, learning_space_id: Uuid, skill_id: Uuid) {
        self.inner.lock().space_skills.push((learning_space_id, skill_id));
    }
}

#[async_trait]
impl SkillAgentStore for InMemorySkillAgentStore {
    async fn skills_in_space(&self, learning_space_id: Uuid) -> Result<Vec<(Uuid, String, String)>> {
        let db = self.inner.lock();
        let mut out: Vec<(Uuid, String, String)> = db
            .space_skills
            .iter()
            .filter(|(ls, _)| *ls == learning_space_id)
            .filter_map(|(_, skill_id)| db.skills.iter().find(|s| s.id == *skill_id))
            .map(|s| (s.id, s.name.clone(), s.description.clone()))
            .collect();
        out.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(out)
    }

    async fn get_skill_by_name(&self, project_id: Uuid, name: &str) -> Result<Skill> {
        self.inner
            .lock()
            .skills
            .iter()
            .find(|s| s.project_id == project_id && s.name == name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("skill {name}")))
    }

    async fn list_artifacts(&self, disk_id: Uuid) -> Result<Vec<Artifact>> {
        Ok(self
            .inner
            .lock()
            .artifacts
            .iter()
            .filter(|a| a.disk_id == disk_id)
            .cloned()
            .collect())
    }

    async fn get_artifact(&self, disk_id: Uuid, path: &str, filename: &str) -> Result<Artifact> {
        self.inner
            .lock()
            .artifacts
            .iter()
            .find(|a| a.disk_id == disk_id && a.path == path && a.filename == filename)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("artifact {path}{filename}")))
    }

    async fn upsert_artifact(
        &self,
        disk_id: Uuid,
        path: &str,
        filename: &str,
        asset_meta: AssetMeta,
        artifact_info_patch: serde_json::Value,
    ) -> Result<Artifact> {
        let mut db = self.inner.lock();
        if let Some(existing) = db
            .artifacts
            .iter_mut()
            .find(|a| a.disk_id == disk_id && a.path == path && a.filename == filename)
        {
            existing.asset_meta = asset_meta;
            existing.meta.patch(&artifact_info_patch);
            existing.updated_at = chrono::Utc::now();
            return Ok(existing.clone());
        }
        let mut meta = MetaMap::new();
        meta.patch(&artifact_info_patch);
        let now = chrono::Utc::now();
        let artifact = Artifact {
            id: Uuid::new_v4(),
            disk_id,
            path: path.to_string(),
            filename: filename.to_string(),
            asset_meta,
            meta,
            created_at: now,
            updated_at: now,
        };
        db.artifacts.push(artifact.clone());
        Ok(artifact)
    }

    async fn rename_artifact(
        &self,
        artifact_id: Uuid,
        new_path: &str,
        new_filename: &str,
        artifact_info: serde_json::Value,
    ) -> Result<Artifact> {
        let mut db = self.inner.lock();
        let artifact = db
            .artifacts
            .iter_mut()
            .find(|a| a.id == artifact_id)
            .ok_or_else(|| Error::NotFound(format!("artifact {artifact_id}")))?;
        artifact.path = new_path.to_string();
        artifact.filename = new_filename.to_string();
        artifact.meta.set_compartment(
            acontext_domain::meta::ARTIFACT_INFO_COMPARTMENT,
            MetaMap(artifact_info.as_object().cloned().unwrap_or_default()),
        );
        artifact.updated_at = chrono::Utc::now();
        Ok(artifact.clone())
    }

    async fn delete_artifact(&self, disk_id: Uuid, path: &str, filename: &str) -> Result<()> {
        self.inner
            .lock()
            .artifacts
            .retain(|a| !(a.disk_id == disk_id && a.path == path && a.filename == filename));
        Ok(())
    }

    async fn update_skill_description(&self, skill_id: Uuid, description: &str) -> Result<()> {
        let mut db = self.inner.lock();
        if let Some(skill) = db.skills.iter_mut().find(|s| s.id == skill_id) {
            skill.description = description.to_string();
            skill.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn create_skill(&self, project_id: Uuid, user_id: Option<Uuid>, name: &str, description: &str) -> Result<Skill> {
        let mut db = self.inner.lock();
        let sanitized = sanitize_skill_name(name);
        let now = chrono::Utc::now();
        let disk = Disk {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            created_at: now,
        };
        db.disks.push(disk.clone());
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
        db.skills.push(skill.clone());
        Ok(skill)
    }

    async fn link_skill_to_space(&self, learning_space_id: Uuid, skill_id: Uuid) -> Result<()> {
        self.inner.lock().space_skills.push((learning_space_id, skill_id));
        Ok(())
    }
}
