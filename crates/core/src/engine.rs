//! Engine trait — the abstraction over the assistant backend.
//!
//! An engine owns the model connection, the tokenizer, the tracked file sets
//! and the conversation. The session and budget code consume it only through
//! this narrow capability set:
//!
//! - **tokenize** — count tokens for text, messages, and images
//! - **describe** — model metadata, prompts, fences, the repository map
//! - **list** — every visible file vs. the writable / read-only subsets
//! - **mutate** — add files, dispatch a message under an interaction kind
//!
//! Implementations: `contextfit_engine::WorkspaceEngine`, plus scripted
//! engines in tests.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::message::Message;
use crate::model::ModelInfo;
use crate::output::OutputChannel;

/// The ways a message can be sent to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    /// Question answering, no edits.
    Ask,
    /// Design and planning, no direct edits.
    Architect,
    /// Direct code edits.
    Code,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 3] = [Self::Ask, Self::Architect, Self::Code];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::Architect => "architect",
            Self::Code => "code",
        }
    }
}

impl std::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ask" => Ok(Self::Ask),
            "architect" => Ok(Self::Architect),
            "code" => Ok(Self::Code),
            other => Err(format!("unknown interaction kind: {other}")),
        }
    }
}

/// A pair of markers wrapping file content inside prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fence {
    pub open: String,
    pub close: String,
}

impl Fence {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Triple backticks.
    pub fn backticks() -> Self {
        Self::new("```", "```")
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::backticks()
    }
}

/// Everything needed to construct an engine for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSpec {
    /// Working directory the engine is bound to.
    pub directory: PathBuf,
    /// Model identifier (e.g. `openrouter/deepseek/deepseek-r1-0528`).
    pub model: String,
    /// Token budget for the repository map. `0` disables the map.
    pub map_tokens: usize,
    /// Whether successful edits are committed automatically.
    pub auto_commit: bool,
}

/// The core Engine trait.
///
/// All paths handed out by `all_files`, `writable_files` and
/// `readonly_files` are absolute; `relative_path` maps them back to
/// working-directory-relative names.
pub trait Engine {
    /// Model metadata (cost per token, max input size). Fields may be absent.
    fn model_info(&self) -> &ModelInfo;

    /// Token count of arbitrary text.
    fn token_count(&self, text: &str) -> usize;

    /// Token count of a message list, including per-message overhead.
    fn token_count_messages(&self, messages: &[Message]) -> usize;

    /// Token count of an image file.
    fn token_count_image(&self, path: &Path) -> Result<usize, EngineError>;

    /// Whether `path` is an image file.
    fn is_image(&self, path: &Path) -> bool;

    /// Pick the fence used to wrap file content in prompts.
    fn choose_fence(&mut self) -> Fence;

    /// Main system prompt of the current persona, placeholders filled.
    fn system_prompt(&self) -> String;

    /// System reminder of the current persona, placeholders filled.
    fn system_reminder(&self) -> String;

    /// All completed turns followed by the turn in progress.
    fn conversation(&self) -> Vec<Message>;

    /// Every file the engine can see.
    fn all_files(&self) -> Vec<PathBuf>;

    /// Files loaded as writable.
    fn writable_files(&self) -> Vec<PathBuf>;

    /// Files loaded as read-only.
    fn readonly_files(&self) -> Vec<PathBuf>;

    /// Path relative to the working directory.
    fn relative_path(&self, path: &Path) -> String;

    /// Repository map over `other` files, or `None` when no map is produced.
    fn repo_map(&self, loaded: &[PathBuf], other: &[PathBuf]) -> Option<String>;

    /// Text content of a file. `Ok(None)` when the file is not text.
    fn read_text(&self, path: &Path) -> Result<Option<String>, EngineError>;

    /// Track `path` as writable. Drops any read-only entry for the same file.
    fn add_writable(&mut self, path: &str) -> Result<(), EngineError>;

    /// Track `path` as read-only.
    fn add_readonly(&mut self, path: &str) -> Result<(), EngineError>;

    /// Send `message` under `kind`. May end with [`EngineError::PersonaSwitch`].
    fn dispatch(&mut self, kind: InteractionKind, message: &str) -> Result<(), EngineError>;
}

/// Builds engines. The session rebuilds its engine at every fitting step.
pub trait EngineFactory {
    fn create(
        &self,
        spec: &EngineSpec,
        output: OutputChannel,
    ) -> Result<Box<dyn Engine>, EngineError>;
}
