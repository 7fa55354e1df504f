//! Error types for the contextfit domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::InteractionKind;

/// The top-level error type for all contextfit operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Engine errors ---
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Context budget ---
    #[error(
        "Session has no context: {remaining_tokens} tokens remaining of {max_tokens}, \
         {write_tokens} required for the reply"
    )]
    ContextExhausted {
        write_tokens: usize,
        remaining_tokens: i64,
        max_tokens: usize,
    },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures raised by an engine implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Path is outside the working directory: {0}")]
    OutsideWorkspace(PathBuf),

    #[error("Cannot price image {path}: {reason}")]
    Image { path: PathBuf, reason: String },

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] ProviderError),

    /// The engine handed control back to another persona after a message.
    /// Not a fault: callers treat this as a completed dispatch.
    #[error("Switching persona to {to}")]
    PersonaSwitch { to: InteractionKind },
}

impl EngineError {
    /// Wrap an I/O failure for `path`.
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Whether this is the persona-switch signal rather than a failure.
    pub fn is_persona_switch(&self) -> bool {
        matches!(self, Self::PersonaSwitch { .. })
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}
