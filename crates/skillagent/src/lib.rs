pub mod agent;
pub mod artifact;
pub mod consumer;
pub mod ctx;
pub mod fake;
pub mod frontmatter;
pub mod pg;
pub mod store;
pub mod tools;

pub use agent::{SkillAgentInput, SkillAgentRunner};
pub use consumer::{ConsumeOutcome, SkillAgentConsumer};
pub use store::SkillAgentStore;

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use uuid::Uuid;

    use acontext_blob::memory::InMemoryBlobStore;
    use acontext_blob::BlobStore;
    use acontext_broker::fake::FakeBroker;
    use acontext_broker::{Broker, Consumer};
    use acontext_cache::lock::DistributedLock;
    use acontext_cache::memory::InMemoryCache;
    use acontext_cache::KvCache;
    use acontext_domain::config::SkillAgentConfig;
    use acontext_domain::entities::{Artifact, AssetMeta, Disk};
    use acontext_domain::envelope::{topology, SkillLearnDistilled};
    use acontext_domain::tool::{CompletionResponse, Message as LlmMessage, ToolCall, ToolDefinition};
    use acontext_domain::Result;
    use acontext_llm::LlmClient;

    use crate::agent::{SkillAgentInput, SkillAgentRunner};
    use crate::consumer::{ConsumeOutcome, SkillAgentConsumer};
    use crate::fake::InMemorySkillAgentStore;
    use crate::store::SkillAgentStore;

    struct ScriptedBatches {
        batches: Mutex<VecDeque<Vec<ToolCall>>>,
    }

    impl ScriptedBatches {
        fn new(batches: Vec<Vec<ToolCall>>) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedBatches {
        async fn complete(&self, _system: &str, _messages: &[LlmMessage], _tools: &[ToolDefinition]) -> Result<CompletionResponse> {
            let tool_calls = self.batches.lock().pop_front().unwrap_or_default();
            Ok(CompletionResponse {
                text: None,
                tool_calls,
            })
        }
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            arguments: args,
        }
    }

    fn make_runner(store: InMemorySkillAgentStore, llm: Arc<dyn LlmClient>, blob: Arc<dyn BlobStore>) -> SkillAgentRunner {
        SkillAgentRunner {
            store: Arc::new(store),
            llm,
            blob,
            bucket: "acontext-test".to_string(),
            max_iterations: 5,
        }
    }

    #[tokio::test]
    async fn create_skill_flow_persists_skill_md_and_links_to_space() {
        let store = InMemorySkillAgentStore::new();
        let blob = Arc::new(InMemoryBlobStore::new());
        let skill_md = "---\nname: daily-logs\ndescription: Summarizes daily activity\n---\n\nAlways group by day.";
        let llm = Arc::new(ScriptedBatches::new(vec![
            vec![
                call("report_thinking", serde_json::json!({"text": "no matching skill exists yet, create one"})),
                call("create_skill", serde_json::json!({"skill_md_content": skill_md})),
            ],
            vec![call("finish", serde_json::json!({}))],
        ]));
        let runner = make_runner(store.clone(), llm, blob.clone());

        let project_id = Uuid::new_v4();
        let learning_space_id = Uuid::new_v4();
        runner
            .run(SkillAgentInput {
                project_id,
                user_id: None,
                learning_space_id,
                distilled_context: "## Task Analysis\n\nLearned something about daily logs.".to_string(),
            })
            .await
            .unwrap();

        let skills = store.skills_in_space(learning_space_id).await.unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].1, "daily-logs");
    }

    #[tokio::test]
    async fn edit_without_report_thinking_is_rejected_and_agent_can_recover() {
        let store = InMemorySkillAgentStore::new();
        let blob: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
        let skill = store.create_skill(Uuid::new_v4(), None, "daily-logs", "desc").await.unwrap();
        let project_id = skill.project_id;
        let learning_space_id = Uuid::new_v4();
        store.link(learning_space_id, skill.id);
        let uploaded = crate::artifact::upload_and_build_artifact_meta(&blob, "bucket", project_id, "/", "SKILL.md", "---\nname: daily-logs\ndescription: desc\n---\nold body")
            .await
            .unwrap();
        store
            .upsert_artifact(skill.disk_id, "/", "SKILL.md", uploaded.asset_meta, uploaded.artifact_info_patch)
            .await
            .unwrap();

        let llm = Arc::new(ScriptedBatches::new(vec![
            vec![call(
                "str_replace_skill_file",
                serde_json::json!({"name": "daily-logs", "path": "SKILL.md", "old": "old body", "new": "new body"}),
            )],
            vec![call("finish", serde_json::json!({}))],
        ]));
        let runner = make_runner(store.clone(), llm, blob.clone());

        runner
            .run(SkillAgentInput {
                project_id,
                user_id: None,
                learning_space_id,
                distilled_context: "context".to_string(),
            })
            .await
            .unwrap();

        let artifact = store.get_artifact(skill.disk_id, "/", "SKILL.md").await.unwrap();
        assert_eq!(artifact.asset_meta.content.as_deref(), Some("---\nname: daily-logs\ndescription: desc\n---\nold body"));
    }

    #[tokio::test]
    async fn str_replace_rejects_non_unique_occurrence() {
        let store = InMemorySkillAgentStore::new();
        let blob: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
        let skill = store.create_skill(Uuid::new_v4(), None, "daily-logs", "desc").await.unwrap();
        let project_id = skill.project_id;
        let uploaded = crate::artifact::upload_and_build_artifact_meta(&blob, "bucket", project_id, "/", "notes.md", "dup dup")
            .await
            .unwrap();
        store
            .upsert_artifact(skill.disk_id, "/", "notes.md", uploaded.asset_meta, uploaded.artifact_info_patch)
            .await
            .unwrap();

        let learning_space_id = Uuid::new_v4();
        store.link(learning_space_id, skill.id);
        let llm = Arc::new(ScriptedBatches::new(vec![
            vec![
                call("report_thinking", serde_json::json!({"text": "editing notes"})),
                call(
                    "str_replace_skill_file",
                    serde_json::json!({"name": "daily-logs", "path": "notes.md", "old": "dup", "new": "single"}),
                ),
            ],
            vec![call("finish", serde_json::json!({}))],
        ]));
        let runner = make_runner(store.clone(), llm, blob);

        runner
            .run(SkillAgentInput {
                project_id,
                user_id: None,
                learning_space_id,
                distilled_context: "context".to_string(),
            })
            .await
            .unwrap();

        let artifact = store.get_artifact(skill.disk_id, "/", "notes.md").await.unwrap();
        assert_eq!(artifact.asset_meta.content.as_deref(), Some("dup dup"));
    }

    /// §8 end-to-end scenario 4: "Skill-agent lock retry." Lock already held
    /// for the Learning Space; expect the envelope is republished to the
    /// retry queue rather than running the agent loop.
    #[tokio::test]
    async fn lock_contention_republishes_to_retry_queue() {
        let store = InMemorySkillAgentStore::new();
        let blob: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
        let llm = Arc::new(ScriptedBatches::new(vec![]));
        let runner = make_runner(store, llm, blob);

        let broker = Arc::new(FakeBroker::new());
        let cache: Arc<dyn KvCache> = Arc::new(InMemoryCache::new());
        let lock = DistributedLock::new(cache);
        let config = SkillAgentConfig::default();

        let project_id = Uuid::new_v4();
        let learning_space_id = Uuid::new_v4();
        let key = DistributedLock::skill_learn_key(&project_id.to_string(), &learning_space_id.to_string());
        let held = lock.try_acquire(&key, config.skill_learn_lock_ttl_seconds).await.unwrap().unwrap();

        let consumer = SkillAgentConsumer::new(runner, broker.clone(), lock, config);
        let mut retry_queue = broker.consume(topology::LEARNING_SKILL_AGENT_RETRY_QUEUE).await.unwrap();

        let outcome = consumer
            .handle(SkillLearnDistilled {
                project_id,
                session_id: Uuid::new_v4(),
                task_id: Uuid::new_v4(),
                learning_space_id,
                distilled_context: "context".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, ConsumeOutcome::Republished);

        let delivery = retry_queue.recv().await.unwrap().expect("expected a republished envelope");
        let body: SkillLearnDistilled = serde_json::from_slice(&delivery.body).unwrap();
        assert_eq!(body.learning_space_id, learning_space_id);

        held.release().await;
    }

    /// §8 end-to-end scenario 5: "Artifact rename preserves bytes." Renaming
    /// a skill file keeps `asset_meta` (bytes/etag/sha256) untouched and only
    /// updates path/filename and `__artifact_info__`.
    #[tokio::test]
    async fn rename_preserves_asset_bytes() {
        let store = InMemorySkillAgentStore::new();
        let disk = Disk {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            user_id: None,
            created_at: chrono::Utc::now(),
        };
        store.seed_disk(disk.clone());
        let original = Artifact {
            id: Uuid::new_v4(),
            disk_id: disk.id,
            path: "/scripts/".to_string(),
            filename: "old_name.py".to_string(),
            asset_meta: AssetMeta {
                bucket: "b".to_string(),
                s3_key: "disks/p/2026/01/01/abc.py".to_string(),
                etag: "abc123".to_string(),
                sha256: "abc123".to_string(),
                mime: "text/x-python".to_string(),
                size_b: 7,
                content: Some("print(1)".to_string()),
            },
            meta: Default::default(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        store.seed_artifact(original.clone());

        let artifact_info = serde_json::json!({"path": "/scripts/", "filename": "new_name.py", "mime": "text/x-python", "size": 8});
        let renamed = store
            .rename_artifact(original.id, "/scripts/", "new_name.py", artifact_info)
            .await
            .unwrap();

        assert_eq!(renamed.filename, "new_name.py");
        assert_eq!(renamed.asset_meta.sha256, original.asset_meta.sha256);
        assert_eq!(renamed.asset_meta.s3_key, original.asset_meta.s3_key);
        assert_eq!(renamed.asset_meta.content, original.asset_meta.content);
    }
}
