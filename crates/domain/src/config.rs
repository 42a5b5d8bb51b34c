use serde::{Deserialize, Serialize};

fn default_buffer_max_turns() -> u32 {
    16
}
fn default_buffer_ttl_seconds() -> u64 {
    8
}
fn default_lock_wait_seconds() -> u64 {
    1
}
fn default_processing_timeout_seconds() -> u64 {
    60
}
fn default_flush_max_retries() -> u32 {
    60
}
fn default_skill_learn_lock_ttl_seconds() -> u64 {
    240
}
fn default_skill_learn_retry_delay_seconds() -> u64 {
    16
}
fn default_consumer_handler_timeout_seconds() -> u64 {
    96
}
fn default_max_iterations_task_agent() -> u32 {
    3
}
fn default_max_iterations_skill_agent() -> u32 {
    5
}
fn default_bucket() -> String {
    "acontext-artifacts".to_string()
}
fn default_presign_ttl_seconds() -> u64 {
    900
}

/// Buffering & turn-admission knobs (buffer module, §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    #[serde(default = "default_buffer_max_turns")]
    pub session_message_buffer_max_turns: u32,
    #[serde(default = "default_buffer_ttl_seconds")]
    pub session_message_buffer_ttl_seconds: u64,
    #[serde(default = "default_lock_wait_seconds")]
    pub session_message_session_lock_wait_seconds: u64,
    #[serde(default = "default_processing_timeout_seconds")]
    pub session_message_processing_timeout_seconds: u64,
    #[serde(default = "default_flush_max_retries")]
    pub session_message_flush_max_retries: u32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            session_message_buffer_max_turns: default_buffer_max_turns(),
            session_message_buffer_ttl_seconds: default_buffer_ttl_seconds(),
            session_message_session_lock_wait_seconds: default_lock_wait_seconds(),
            session_message_processing_timeout_seconds: default_processing_timeout_seconds(),
            session_message_flush_max_retries: default_flush_max_retries(),
        }
    }
}

/// Task-agent loop knobs (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAgentConfig {
    #[serde(default = "default_max_iterations_task_agent")]
    pub max_iterations: u32,
}

impl Default for TaskAgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations_task_agent(),
        }
    }
}

/// Skill-agent loop + distributed-lock knobs (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillAgentConfig {
    #[serde(default = "default_max_iterations_skill_agent")]
    pub max_iterations: u32,
    #[serde(default = "default_skill_learn_lock_ttl_seconds")]
    pub skill_learn_lock_ttl_seconds: u64,
    #[serde(default = "default_skill_learn_retry_delay_seconds")]
    pub skill_learn_agent_retry_delay_seconds: u64,
}

impl Default for SkillAgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations_skill_agent(),
            skill_learn_lock_ttl_seconds: default_skill_learn_lock_ttl_seconds(),
            skill_learn_agent_retry_delay_seconds: default_skill_learn_retry_delay_seconds(),
        }
    }
}

/// Durable store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database_url: String,
    #[serde(default = "default_pool_size")]
    pub max_connections: u32,
}

fn default_pool_size() -> u32 {
    10
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/acontext".to_string(),
            max_connections: default_pool_size(),
        }
    }
}

/// AMQP broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub amqp_url: String,
    #[serde(default = "default_consumer_handler_timeout_seconds")]
    pub mq_consumer_handler_timeout_seconds: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            amqp_url: "amqp://127.0.0.1:5672/%2f".to_string(),
            mq_consumer_handler_timeout_seconds: default_consumer_handler_timeout_seconds(),
        }
    }
}

/// KV cache (locks + timer dedup) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1/".to_string(),
        }
    }
}

/// Blob store (artifact bytes) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    pub endpoint: Option<String>,
    #[serde(default = "default_presign_ttl_seconds")]
    pub presign_ttl_seconds: u64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            endpoint: None,
            presign_ttl_seconds: default_presign_ttl_seconds(),
        }
    }
}

/// LLM completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_base: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub task_agent: TaskAgentConfig,
    #[serde(default)]
    pub skill_agent: SkillAgentConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub blob: BlobConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl Config {
    pub fn from_toml_str(s: &str) -> crate::error::Result<Self> {
        toml::from_str(s).map_err(|e| crate::error::Error::Validation(e.to_string()))
    }

    /// Sanity checks that can't be expressed as `serde` defaults. Called once
    /// from bootstrap before any subsystem starts; a single `Error`-severity
    /// issue aborts startup.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.store.database_url.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "store.database_url must not be empty".to_string(),
            });
        }
        if self.skill_agent.skill_learn_lock_ttl_seconds
            < self.skill_agent.skill_learn_agent_retry_delay_seconds
        {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "skill_learn_lock_ttl_seconds is shorter than the retry delay; \
                          retries will rarely find the lock free"
                    .to_string(),
            });
        }
        if self.llm.api_key.is_none() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "llm.api_key not set; requests will fail unless the provider allows \
                          anonymous access"
                    .to_string(),
            });
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let cfg = Config::default();
        let s = toml::to_string(&cfg).unwrap();
        let back = Config::from_toml_str(&s).unwrap();
        assert_eq!(
            back.buffer.session_message_buffer_max_turns,
            cfg.buffer.session_message_buffer_max_turns
        );
    }

    #[test]
    fn empty_database_url_is_an_error_severity_issue() {
        let mut cfg = Config::default();
        cfg.store.database_url.clear();
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [store]
            database_url = "postgres://x/y"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.buffer.session_message_buffer_max_turns, 16);
        assert_eq!(cfg.store.database_url, "postgres://x/y");
    }
}
