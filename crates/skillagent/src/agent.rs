use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use acontext_blob::BlobStore;
use acontext_domain::entities::{sanitize_skill_name, split_skill_path};
use acontext_domain::tool::Message as LlmMessage;
use acontext_domain::{Error, Result};
use acontext_llm::LlmClient;

use crate::artifact::upload_and_build_artifact_meta;
use crate::ctx::SkillAgentCtx;
use crate::frontmatter::parse_front_matter;
use crate::store::SkillAgentStore;
use crate::tools::{parse_tool_call, tool_definitions, SkillAgentTool};

const SYSTEM_PROMPT: &str = "\
You maintain a Learning Space's skill library. Given a distilled task analysis \
and the list of skills that already exist, decide whether to update an \
existing skill or create a new one. Call `report_thinking` before any edit or \
creation tool. Call `finish` once the library reflects the new information.";

pub struct SkillAgentInput {
    pub project_id: Uuid,
    pub user_id: Option<Uuid>,
    pub learning_space_id: Uuid,
    pub distilled_context: String,
}

pub struct SkillAgentRunner {
    pub store: Arc<dyn SkillAgentStore>,
    pub llm: Arc<dyn LlmClient>,
    pub blob: Arc<dyn BlobStore>,
    pub bucket: String,
    pub max_iterations: u32,
}

enum DispatchOutcome {
    Continue(String),
    Finish,
}

impl SkillAgentRunner {
    /// The bounded agent loop (§4.5.2). Each call re-queries existing
    /// skills once up front; `create_skill` appends to the in-memory list
    /// so later iterations in the same run see it without a re-query.
    pub async fn run(&self, input: SkillAgentInput) -> Result<()> {
        let skills = self.store.skills_in_space(input.learning_space_id).await?;
        let mut ctx = SkillAgentCtx::new(input.project_id, input.user_id, input.learning_space_id, skills);
        let tool_defs = tool_definitions();
        let mut history = vec![LlmMessage::user(build_user_prompt(&input.distilled_context, &ctx))];

        for _ in 0..self.max_iterations {
            let completion = self.llm.complete(SYSTEM_PROMPT, &history, &tool_defs).await?;
            if !completion.has_tool_calls() {
                return Ok(());
            }
            history.push(LlmMessage::assistant_with_tool_calls(
                completion.text.clone(),
                completion.tool_calls.clone(),
            ));

            let mut finished = false;
            for call in &completion.tool_calls {
                let tool = match parse_tool_call(call) {
                    Ok(tool) => tool,
                    Err(e) => {
                        history.push(LlmMessage::tool_result(call.id.clone(), format!("error: {e}")));
                        continue;
                    }
                };
                match self.dispatch_tool(&mut ctx, tool).await? {
                    DispatchOutcome::Continue(text) => {
                        history.push(LlmMessage::tool_result(call.id.clone(), text));
                    }
                    DispatchOutcome::Finish => {
                        finished = true;
                        break;
                    }
                }
            }
            if finished {
                return Ok(());
            }
        }
        tracing::warn!(learning_space_id = %input.learning_space_id, "skill-agent hit max_iterations without finishing");
        Ok(())
    }

    async fn dispatch_tool(&self, ctx: &mut SkillAgentCtx, tool: SkillAgentTool) -> Result<DispatchOutcome> {
        match tool {
            SkillAgentTool::GetSkill { name } => self.get_skill(ctx, &name).await,
            SkillAgentTool::GetSkillFile { name, path } => self.get_skill_file(ctx, &name, &path).await,
            SkillAgentTool::StrReplaceSkillFile { name, path, old, new } => {
                self.str_replace_skill_file(ctx, &name, &path, &old, &new).await
            }
            SkillAgentTool::CreateSkillFile { name, path, content } => {
                self.create_skill_file(ctx, &name, &path, &content).await
            }
            SkillAgentTool::CreateSkill { skill_md_content } => self.create_skill(ctx, &skill_md_content).await,
            SkillAgentTool::DeleteSkillFile { name, path } => self.delete_skill_file(ctx, &name, &path).await,
            SkillAgentTool::ReportThinking { text } => {
                ctx.has_reported_thinking = true;
                Ok(DispatchOutcome::Continue(format!("noted: {text}")))
            }
            SkillAgentTool::Finish => Ok(DispatchOutcome::Finish),
        }
    }

    async fn get_skill(&self, ctx: &SkillAgentCtx, name: &str) -> Result<DispatchOutcome> {
        match self.store.get_skill_by_name(ctx.project_id, name).await {
            Ok(skill) => {
                let artifacts = self.store.list_artifacts(skill.disk_id).await?;
                let file_paths: Vec<String> = artifacts.iter().map(|a| a.full_path()).collect();
                let info = json!({
                    "id": skill.id,
                    "disk_id": skill.disk_id,
                    "name": skill.name,
                    "description": skill.description,
                    "file_paths": file_paths,
                });
                Ok(DispatchOutcome::Continue(info.to_string()))
            }
            Err(e) if e.is_permanent_drop() => Ok(DispatchOutcome::Continue(format!("error: {e}"))),
            Err(e) => Err(e),
        }
    }

    async fn get_skill_file(&self, ctx: &SkillAgentCtx, name: &str, path: &str) -> Result<DispatchOutcome> {
        if let Err(e) = validate_relative_path(path) {
            return Ok(DispatchOutcome::Continue(format!("error: {e}")));
        }
        let skill = match self.store.get_skill_by_name(ctx.project_id, name).await {
            Ok(s) => s,
            Err(e) if e.is_permanent_drop() => return Ok(DispatchOutcome::Continue(format!("error: {e}"))),
            Err(e) => return Err(e),
        };
        let (dir, filename) = match split_skill_path(&format!("/{path}")) {
            Ok(v) => v,
            Err(e) => return Ok(DispatchOutcome::Continue(format!("error: {e}"))),
        };
        match self.store.get_artifact(skill.disk_id, &dir, &filename).await {
            Ok(artifact) => match artifact.asset_meta.content {
                Some(content) => Ok(DispatchOutcome::Continue(content)),
                None => Ok(DispatchOutcome::Continue("error: file has no inline text content".to_string())),
            },
            Err(e) if e.is_permanent_drop() => Ok(DispatchOutcome::Continue(format!("error: {e}"))),
            Err(e) => Err(e),
        }
    }

    async fn str_replace_skill_file(
        &self,
        ctx: &mut SkillAgentCtx,
        name: &str,
        path: &str,
        old: &str,
        new: &str,
    ) -> Result<DispatchOutcome> {
        if !ctx.has_reported_thinking {
            return Ok(DispatchOutcome::Continue(
                "error: call report_thinking before editing a file".to_string(),
            ));
        }
        if let Err(e) = validate_relative_path(path) {
            return Ok(DispatchOutcome::Continue(format!("error: {e}")));
        }
        let skill = match self.store.get_skill_by_name(ctx.project_id, name).await {
            Ok(s) => s,
            Err(e) if e.is_permanent_drop() => return Ok(DispatchOutcome::Continue(format!("error: {e}"))),
            Err(e) => return Err(e),
        };
        let (dir, filename) = match split_skill_path(&format!("/{path}")) {
            Ok(v) => v,
            Err(e) => return Ok(DispatchOutcome::Continue(format!("error: {e}"))),
        };
        let artifact = match self.store.get_artifact(skill.disk_id, &dir, &filename).await {
            Ok(a) => a,
            Err(e) if e.is_permanent_drop() => return Ok(DispatchOutcome::Continue(format!("error: {e}"))),
            Err(e) => return Err(e),
        };
        let Some(content) = artifact.asset_meta.content else {
            return Ok(DispatchOutcome::Continue("error: file has no inline text content".to_string()));
        };
        let occurrences = content.matches(old).count();
        if occurrences != 1 {
            return Ok(DispatchOutcome::Continue(format!(
                "error: `old` occurs {occurrences} times; it must occur exactly once"
            )));
        }
        let new_content = content.replacen(old, new, 1);

        let is_skill_md = dir == "/" && filename == "SKILL.md";
        if is_skill_md {
            let (parsed_name, parsed_description) = match parse_front_matter(&new_content) {
                Ok(v) => v,
                Err(e) => return Ok(DispatchOutcome::Continue(format!("error: {e}"))),
            };
            if parsed_name != skill.name {
                return Ok(DispatchOutcome::Continue(
                    "error: SKILL.md edits may not change the skill's name".to_string(),
                ));
            }
            self.store.update_skill_description(skill.id, &parsed_description).await?;
        }

        let uploaded = upload_and_build_artifact_meta(&self.blob, &self.bucket, ctx.project_id, &dir, &filename, &new_content).await?;
        self.store
            .upsert_artifact(skill.disk_id, &dir, &filename, uploaded.asset_meta, uploaded.artifact_info_patch)
            .await?;
        Ok(DispatchOutcome::Continue(format!("updated {path}")))
    }

    async fn create_skill_file(&self, ctx: &mut SkillAgentCtx, name: &str, path: &str, content: &str) -> Result<DispatchOutcome> {
        if !ctx.has_reported_thinking {
            return Ok(DispatchOutcome::Continue(
                "error: call report_thinking before creating a file".to_string(),
            ));
        }
        if let Err(e) = validate_relative_path(path) {
            return Ok(DispatchOutcome::Continue(format!("error: {e}")));
        }
        if path.eq_ignore_ascii_case("skill.md") {
            return Ok(DispatchOutcome::Continue(
                "error: SKILL.md cannot be created with create_skill_file; use create_skill or str_replace_skill_file".to_string(),
            ));
        }
        let skill = match self.store.get_skill_by_name(ctx.project_id, name).await {
            Ok(s) => s,
            Err(e) if e.is_permanent_drop() => return Ok(DispatchOutcome::Continue(format!("error: {e}"))),
            Err(e) => return Err(e),
        };
        let (dir, filename) = match split_skill_path(&format!("/{path}")) {
            Ok(v) => v,
            Err(e) => return Ok(DispatchOutcome::Continue(format!("error: {e}"))),
        };
        let uploaded = upload_and_build_artifact_meta(&self.blob, &self.bucket, ctx.project_id, &dir, &filename, content).await?;
        self.store
            .upsert_artifact(skill.disk_id, &dir, &filename, uploaded.asset_meta, uploaded.artifact_info_patch)
            .await?;
        Ok(DispatchOutcome::Continue(format!("created {path}")))
    }

    async fn create_skill(&self, ctx: &mut SkillAgentCtx, skill_md_content: &str) -> Result<DispatchOutcome> {
        if !ctx.has_reported_thinking {
            return Ok(DispatchOutcome::Continue(
                "error: call report_thinking before creating a skill".to_string(),
            ));
        }
        let (name, description) = match parse_front_matter(skill_md_content) {
            Ok(v) => v,
            Err(e) => return Ok(DispatchOutcome::Continue(format!("error: {e}"))),
        };
        let name = sanitize_skill_name(&name);
        let skill = self.store.create_skill(ctx.project_id, ctx.user_id, &name, &description).await?;
        let uploaded = upload_and_build_artifact_meta(&self.blob, &self.bucket, ctx.project_id, "/", "SKILL.md", skill_md_content).await?;
        self.store
            .upsert_artifact(skill.disk_id, "/", "SKILL.md", uploaded.asset_meta, uploaded.artifact_info_patch)
            .await?;
        self.store.link_skill_to_space(ctx.learning_space_id, skill.id).await?;
        ctx.skills.push((skill.id, skill.name.clone(), skill.description.clone()));
        Ok(DispatchOutcome::Continue(format!("created skill {}", skill.name)))
    }

    async fn delete_skill_file(&self, ctx: &mut SkillAgentCtx, name: &str, path: &str) -> Result<DispatchOutcome> {
        if !ctx.has_reported_thinking {
            return Ok(DispatchOutcome::Continue(
                "error: call report_thinking before deleting a file".to_string(),
            ));
        }
        if let Err(e) = validate_relative_path(path) {
            return Ok(DispatchOutcome::Continue(format!("error: {e}")));
        }
        if path.eq_ignore_ascii_case("skill.md") {
            return Ok(DispatchOutcome::Continue("error: SKILL.md cannot be deleted".to_string()));
        }
        let skill = match self.store.get_skill_by_name(ctx.project_id, name).await {
            Ok(s) => s,
            Err(e) if e.is_permanent_drop() => return Ok(DispatchOutcome::Continue(format!("error: {e}"))),
            Err(e) => return Err(e),
        };
        let (dir, filename) = match split_skill_path(&format!("/{path}")) {
            Ok(v) => v,
            Err(e) => return Ok(DispatchOutcome::Continue(format!("error: {e}"))),
        };
        self.store.delete_artifact(skill.disk_id, &dir, &filename).await?;
        Ok(DispatchOutcome::Continue(format!("deleted {path}")))
    }
}

/// §4.5.3: the tool takes a path relative to the skill root (no leading
/// `/`); traversal segments are rejected before it's joined into the
/// absolute artifact path the store expects.
fn validate_relative_path(path: &str) -> Result<()> {
    if path.starts_with('/') {
        return Err(Error::Validation("path must be relative to the skill root".to_string()));
    }
    if path.split('/').any(|seg| seg == "..") {
        return Err(Error::Validation("path traversal rejected".to_string()));
    }
    Ok(())
}

fn build_user_prompt(distilled_context: &str, ctx: &SkillAgentCtx) -> String {
    format!(
        "## Distilled task analysis\n\n{}\n\n## Existing skills in this Learning Space\n\n{}\n",
        distilled_context,
        if ctx.skills.is_empty() {
            "(none yet)".to_string()
        } else {
            ctx.skills_view()
        }
    )
}
