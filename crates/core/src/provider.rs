//! ChatBackend trait — the abstraction over chat-completion endpoints.
//!
//! A backend knows how to send a list of messages to a model and get a reply
//! back. The workspace engine calls it from `dispatch`; it never sees which
//! HTTP endpoint answers.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// One chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to use (e.g., "deepseek/deepseek-r1-0528")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature, provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete response from a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated text
    pub content: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Blocking chat-completion backend.
pub trait ChatBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Send a request and wait for the complete reply.
    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}
