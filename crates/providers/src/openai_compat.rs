//! OpenAI-compatible backend implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, DeepSeek, and any endpoint
//! exposing `/v1/chat/completions`. Requests are blocking; the engine waits
//! for the full reply before recording the turn.

use contextfit_core::error::ProviderError;
use contextfit_core::message::Message;
use contextfit_core::provider::{ChatBackend, ChatRequest, ChatResponse, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// An OpenAI-compatible chat backend.
pub struct OpenAiCompatBackend {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl OpenAiCompatBackend {
    /// Create a new OpenAI-compatible backend.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::blocking::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenRouter backend (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an OpenAI backend (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama backend (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model identifier as the endpoint expects it: a leading
    /// `<backend name>/` routing prefix is removed.
    fn wire_model<'a>(&self, model: &'a str) -> &'a str {
        model
            .strip_prefix(self.name.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(model)
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().into(),
                content: m.content.clone(),
            })
            .collect()
    }

    fn request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.wire_model(&request.model),
            "messages": Self::to_api_messages(&request.messages),
            "stream": false,
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }
}

impl ChatBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(request);

        debug!(
            backend = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response.json().map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        parse_response(api_response, &request.model)
    }
}

/// Turn a decoded API response into a [`ChatResponse`].
fn parse_response(api_response: ApiResponse, requested: &str) -> Result<ChatResponse, ProviderError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::ApiError {
            status_code: 200,
            message: "No choices in response".into(),
        })?;

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(ChatResponse {
        content: choice.message.content.unwrap_or_default(),
        model: api_response.model.unwrap_or_else(|| requested.to_string()),
        usage,
    })
}

// --- OpenAI API types ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openrouter_constructor() {
        let backend = OpenAiCompatBackend::openrouter("sk-test");
        assert_eq!(backend.name(), "openrouter");
        assert!(backend.base_url().contains("openrouter.ai"));
    }

    #[test]
    fn ollama_constructor() {
        let backend = OpenAiCompatBackend::ollama(None);
        assert_eq!(backend.name(), "ollama");
        assert!(backend.base_url().contains("localhost:11434"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let backend = OpenAiCompatBackend::new("vllm", "http://localhost:8000/v1/", "");
        assert_eq!(backend.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatBackend::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn openrouter_prefix_is_stripped_on_the_wire() {
        let backend = OpenAiCompatBackend::openrouter("sk-test");
        let body = backend.request_body(&ChatRequest {
            model: "openrouter/deepseek/deepseek-r1-0528".into(),
            messages: vec![Message::user("hi")],
            temperature: None,
            max_tokens: Some(256),
        });
        assert_eq!(body["model"], "deepseek/deepseek-r1-0528");
        assert_eq!(body["max_tokens"], 256);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn backend_strips_its_own_prefix_only() {
        let backend = OpenAiCompatBackend::openai("sk-test");
        assert_eq!(backend.wire_model("openai/gpt-4o"), "gpt-4o");
        assert_eq!(backend.wire_model("gpt-4o"), "gpt-4o");
        assert_eq!(
            backend.wire_model("openrouter/deepseek/deepseek-r1-0528"),
            "openrouter/deepseek/deepseek-r1-0528"
        );
        assert_eq!(backend.wire_model("openai-compat/x"), "openai-compat/x");

        let local = OpenAiCompatBackend::ollama(None);
        assert_eq!(local.wire_model("ollama/llama3.1"), "llama3.1");
    }

    #[test]
    fn openai_request_body_sends_bare_model() {
        let backend = OpenAiCompatBackend::openai("sk-test");
        let body = backend.request_body(&ChatRequest {
            model: "openai/gpt-4o".into(),
            messages: vec![Message::user("hi")],
            temperature: None,
            max_tokens: None,
        });
        assert_eq!(body["model"], "gpt-4o");
    }

    #[test]
    fn parse_completion_response() {
        let data = r#"{
            "model": "deepseek/deepseek-r1-0528",
            "choices": [{"message": {"role": "assistant", "content": "Done."}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let api: ApiResponse = serde_json::from_str(data).unwrap();
        let response = parse_response(api, "openrouter/deepseek/deepseek-r1-0528").unwrap();
        assert_eq!(response.content, "Done.");
        assert_eq!(response.model, "deepseek/deepseek-r1-0528");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn missing_model_falls_back_to_requested() {
        let data = r#"{"choices": [{"message": {"content": null}}]}"#;
        let api: ApiResponse = serde_json::from_str(data).unwrap();
        let response = parse_response(api, "gpt-4o").unwrap();
        assert_eq!(response.content, "");
        assert_eq!(response.model, "gpt-4o");
        assert!(response.usage.is_none());
    }

    #[test]
    fn empty_choices_is_an_error() {
        let api: ApiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            parse_response(api, "gpt-4o"),
            Err(ProviderError::ApiError { status_code: 200, .. })
        ));
    }
}
