use super::client::LLMClient;
use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Replays queued responses in order and records every prompt it receives
pub struct MockLLMClient {
    responses: Mutex<VecDeque<MockResponse>>,
    prompts: Mutex<Vec<String>>,
    name: String,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub content: String,
    pub error: Option<BackendError>,
}

impl MockResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            error: None,
        }
    }

    pub fn error(error: BackendError) -> Self {
        Self {
            content: String::new(),
            error: Some(error),
        }
    }
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self::with_name("MockLLM")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            name: name.into(),
        }
    }

    pub fn add_response(&self, response: MockResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        let mut queue = self.responses.lock().unwrap_or_else(|p| p.into_inner());
        queue.extend(responses);
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Concatenated message contents of every request seen so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Default for MockLLMClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let prompt = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(prompt);

        let response = self
            .responses
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .ok_or_else(|| BackendError::Other {
                message: "MockLLMClient: No more responses in queue".to_string(),
            })?;

        if let Some(error) = response.error {
            return Err(error);
        }

        Ok(LLMResponse::text(response.content, Duration::from_millis(10)))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model_info(&self) -> Option<String> {
        Some("mock-model".to_string())
    }
}

impl std::fmt::Debug for MockLLMClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLLMClient")
            .field("name", &self.name)
            .field("remaining_responses", &self.remaining_responses())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[tokio::test]
    async fn test_replays_in_order_and_records_prompts() {
        let client = MockLLMClient::with_name("strategist");
        client.add_responses([MockResponse::text("[]"), MockResponse::text("{}")]);

        let first = client
            .chat(LLMRequest::new(vec![
                ChatMessage::system("be brief"),
                ChatMessage::user("propose strategies"),
            ]))
            .await
            .unwrap();
        assert_eq!(first.content, "[]");
        assert_eq!(client.remaining_responses(), 1);
        assert_eq!(client.prompts(), vec!["be brief\npropose strategies".to_string()]);
        assert_eq!(client.name(), "strategist");
    }

    #[tokio::test]
    async fn test_scripted_error_and_exhaustion() {
        let client = MockLLMClient::new();
        client.add_response(MockResponse::error(BackendError::RateLimitError {
            retry_after: Some(5),
        }));

        let scripted = client.chat(LLMRequest::new(vec![])).await;
        assert!(matches!(
            scripted,
            Err(BackendError::RateLimitError { retry_after: Some(5) })
        ));

        let exhausted = client.chat(LLMRequest::new(vec![])).await;
        assert!(matches!(exhausted, Err(BackendError::Other { .. })));
        assert_eq!(client.prompts().len(), 2);
    }
}
