//! LLM client abstraction layer
//!
//! A trait-based abstraction over chat-style LLM backends so the strategy
//! generator can run against a real provider or a scripted mock.

mod client;
mod error;
mod genai;
mod mock;
mod types;

pub use client::LLMClient;
pub use error::BackendError;
pub use genai::GenAIClient;
pub use mock::{MockLLMClient, MockResponse};
pub use types::{extract_json_from_markdown, ChatMessage, LLMRequest, LLMResponse, MessageRole};
