//! Configuration loading, validation, and management for contextfit.
//!
//! Loads configuration from `~/.contextfit/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.contextfit/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Session defaults
    #[serde(default)]
    pub session: SessionConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Model metadata overrides (model name → pricing and limits)
    #[serde(default)]
    pub models: HashMap<String, ModelOverrideConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "openrouter/deepseek/deepseek-r1-0528".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("session", &self.session)
            .field("providers", &self.providers)
            .field("models", &self.models)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Defaults applied to every fitted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory that relative request directories are resolved against
    #[serde(default = "default_session_root")]
    pub root: PathBuf,

    /// Token budget for the repository map (0 disables it)
    #[serde(default = "default_repo_map_tokens")]
    pub repo_map_tokens: usize,

    /// Commit successful edits automatically
    #[serde(default)]
    pub commit: bool,

    /// Tokens reserved for the model's reply
    #[serde(default = "default_write_tokens")]
    pub write_tokens: usize,

    /// Fail when no candidate subset leaves room for the reply
    #[serde(default = "default_true")]
    pub error_if_no_context: bool,

    /// Cap on generated tokens per reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_reply_tokens: Option<u32>,
}

fn default_session_root() -> PathBuf {
    AppConfig::workspace_dir()
}
fn default_repo_map_tokens() -> usize {
    1024
}
fn default_write_tokens() -> usize {
    4096
}
fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            root: default_session_root(),
            repo_map_tokens: default_repo_map_tokens(),
            commit: false,
            write_tokens: default_write_tokens(),
            error_if_no_context: true,
            max_reply_tokens: None,
        }
    }
}

impl SessionConfig {
    /// Resolve a request directory: relative paths are joined onto `root`,
    /// absolute paths are used as given.
    pub fn resolve_directory(&self, directory: &Path) -> PathBuf {
        if directory.is_absolute() {
            directory.to_path_buf()
        } else {
            self.root.join(directory)
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Custom per-million-token pricing and input limit for a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOverrideConfig {
    /// Price per 1M input tokens in USD
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD
    #[serde(default)]
    pub output_per_m: f64,
    /// Maximum input tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_input_tokens: Option<usize>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.contextfit/config.toml).
    ///
    /// Also checks environment variables:
    /// - `CONTEXTFIT_API_KEY` (highest priority), `OPENROUTER_API_KEY`,
    ///   `OPENAI_API_KEY` for the key
    /// - `CONTEXTFIT_PROVIDER`, `CONTEXTFIT_MODEL`
    /// - `CONTEXTFIT_SESSION_ROOT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides read through `var`.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = var("CONTEXTFIT_API_KEY")
                .or_else(|| var("OPENROUTER_API_KEY"))
                .or_else(|| var("OPENAI_API_KEY"));
        }

        if let Some(provider) = var("CONTEXTFIT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = var("CONTEXTFIT_MODEL") {
            self.default_model = model;
        }

        if let Some(root) = var("CONTEXTFIT_SESSION_ROOT") {
            self.session.root = PathBuf::from(root);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".contextfit")
    }

    /// Get the default session root.
    pub fn workspace_dir() -> PathBuf {
        Self::config_dir().join("workspace")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        if self.session.write_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "session.write_tokens must be > 0".into(),
            ));
        }

        for (name, model) in &self.models {
            if model.input_per_m < 0.0 || model.output_per_m < 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "model '{name}' has a negative price"
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            session: SessionConfig::default(),
            providers: HashMap::new(),
            models: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
