pub mod http;
pub mod scripted;

use async_trait::async_trait;

use acontext_domain::tool::{CompletionResponse, Message, ToolDefinition};

/// The single LLM interface the core consumes (§6): `complete(system,
/// messages, tools) -> {text?, tool_calls}`. No streaming.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> acontext_domain::Result<CompletionResponse>;
}
