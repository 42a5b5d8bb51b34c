use async_trait::async_trait;
use parking_lot::Mutex;

use acontext_domain::tool::{CompletionResponse, Message, ToolDefinition};

use crate::LlmClient;

/// Replays a fixed sequence of responses, one per `complete()` call. Used by
/// task-agent/skill-agent tests to drive the iteration loop through a known
/// script without a real model.
pub struct ScriptedLlmClient {
    responses: Mutex<std::collections::VecDeque<CompletionResponse>>,
}

impl ScriptedLlmClient {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(
        &self,
        _system: &str,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> acontext_domain::Result<CompletionResponse> {
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| acontext_domain::Error::FatalBug("scripted LLM exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acontext_domain::tool::ToolCall;

    #[tokio::test]
    async fn replays_responses_in_order() {
        let client = ScriptedLlmClient::new(vec![
            CompletionResponse {
                text: None,
                tool_calls: vec![ToolCall {
                    id: "1".into(),
                    name: "finish".into(),
                    arguments: serde_json::json!({}),
                }],
            },
            CompletionResponse::default(),
        ]);
        let first = client.complete("sys", &[], &[]).await.unwrap();
        assert_eq!(first.tool_calls[0].name, "finish");
        let second = client.complete("sys", &[], &[]).await.unwrap();
        assert!(!second.has_tool_calls());
    }
}
