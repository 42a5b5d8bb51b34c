use std::sync::Arc;

use acontext_blob::s3::S3BlobStore;
use acontext_blob::BlobStore;
use acontext_broker::lapin_broker::LapinBroker;
use acontext_broker::Broker;
use acontext_cache::lock::DistributedLock;
use acontext_cache::redis::RedisCache;
use acontext_cache::KvCache;
use acontext_distill::consumer::DistillConsumer;
use acontext_distill::pg::PgDistillStore;
use acontext_domain::config::Config;
use acontext_lifecycle::pg::PgLifecycleStore;
use acontext_lifecycle::seed::LearningSpaceSeeder;
use acontext_llm::http::HttpLlmClient;
use acontext_llm::LlmClient;
use acontext_skillagent::agent::SkillAgentRunner;
use acontext_skillagent::consumer::SkillAgentConsumer;
use acontext_skillagent::pg::PgSkillAgentStore;
use acontext_store::Store;

use crate::adapters::TaskAgentProcessor;

/// Every long-lived handle the worker needs, built once at startup. Mirrors
/// the "process-wide clients" line in §5's shared-resources list: one
/// `Store`/broker/cache/blob/LLM client, shared across every consumer loop.
pub struct AppContext {
    pub config: Config,
    pub store: Store,
    pub broker: Arc<dyn Broker>,
    pub cache: Arc<dyn KvCache>,
    pub blob: Arc<dyn BlobStore>,
    pub llm: Arc<dyn LlmClient>,
}

impl AppContext {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let store = Store::connect(&config.store.database_url, config.store.max_connections).await?;
        let broker: Arc<dyn Broker> = Arc::new(LapinBroker::connect(&config.broker.amqp_url).await?);
        let cache: Arc<dyn KvCache> = Arc::new(RedisCache::new(&config.cache.redis_url)?);
        let blob: Arc<dyn BlobStore> = Arc::new(S3BlobStore::new(config.blob.bucket.clone(), config.blob.endpoint.as_deref()).await);
        let llm: Arc<dyn LlmClient> = Arc::new(HttpLlmClient::new(
            config.llm.api_base.clone(),
            config.llm.model.clone(),
            config.llm.api_key.clone(),
        ));
        Ok(Self {
            config,
            store,
            broker,
            cache,
            blob,
            llm,
        })
    }

    pub fn lock(&self) -> DistributedLock {
        DistributedLock::new(self.cache.clone())
    }

    pub fn buffer_service(&self) -> acontext_buffer::service::BufferService {
        let processor = Arc::new(TaskAgentProcessor::new(
            self.store.clone(),
            self.llm.clone(),
            self.broker.clone(),
            self.config.task_agent.max_iterations,
        ));
        let state: Arc<dyn acontext_buffer::state::SessionStateStore> =
            Arc::new(acontext_buffer::pg::PgSessionStateStore::new(self.store.clone()));
        acontext_buffer::service::BufferService::new(state, self.broker.clone(), self.lock(), self.config.buffer.clone(), processor)
    }

    pub fn distill_consumer(&self) -> DistillConsumer {
        DistillConsumer::new(
            Arc::new(PgDistillStore::new(self.store.clone())),
            self.llm.clone(),
            self.broker.clone(),
        )
    }

    pub fn skill_agent_consumer(&self) -> SkillAgentConsumer {
        let runner = SkillAgentRunner {
            store: Arc::new(PgSkillAgentStore::new(self.store.clone())),
            llm: self.llm.clone(),
            blob: self.blob.clone(),
            bucket: self.config.blob.bucket.clone(),
            max_iterations: self.config.skill_agent.max_iterations,
        };
        SkillAgentConsumer::new(runner, self.broker.clone(), self.lock(), self.config.skill_agent.clone())
    }

    pub fn learning_space_seeder(&self) -> LearningSpaceSeeder {
        LearningSpaceSeeder {
            store: Arc::new(PgLifecycleStore::new(self.store.clone())),
            blob: self.blob.clone(),
            bucket: self.config.blob.bucket.clone(),
        }
    }
}
