//! Backend router — selects the correct chat backend based on config.
//!
//! Handles backend creation and routing requests to the right endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use contextfit_core::error::ProviderError;
use contextfit_core::provider::{ChatBackend, ChatRequest, ChatResponse};

use crate::openai_compat::OpenAiCompatBackend;

/// Routes chat requests to the correct backend.
pub struct BackendRouter {
    backends: HashMap<String, Arc<dyn ChatBackend>>,
    default_backend: String,
}

impl BackendRouter {
    /// Create a new router with a default backend name.
    pub fn new(default_backend: impl Into<String>) -> Self {
        Self {
            backends: HashMap::new(),
            default_backend: default_backend.into(),
        }
    }

    /// Register a backend.
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn ChatBackend>) {
        self.backends.insert(name.into(), backend);
    }

    /// Get the default backend.
    pub fn default_backend(&self) -> Option<Arc<dyn ChatBackend>> {
        self.backends.get(&self.default_backend).cloned()
    }

    /// Get a specific backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ChatBackend>> {
        self.backends.get(name).cloned()
    }

    /// List all registered backend names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl ChatBackend for BackendRouter {
    fn name(&self) -> &str {
        &self.default_backend
    }

    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let backend = self
            .default_backend()
            .ok_or_else(|| ProviderError::NotConfigured(self.default_backend.clone()))?;
        backend.complete(request)
    }
}

/// Build backends from configuration.
pub fn build_from_config(config: &contextfit_config::AppConfig) -> BackendRouter {
    let mut router = BackendRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        router.register(
            name.clone(),
            Arc::new(OpenAiCompatBackend::new(name, &base_url, &api_key)),
        );
    }

    // Ensure the default backend exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&config.default_provider);
        router.register(
            config.default_provider.clone(),
            Arc::new(OpenAiCompatBackend::new(
                &config.default_provider,
                &base_url,
                &api_key,
            )),
        );
    }

    router
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
