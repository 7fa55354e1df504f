//! Session construction parameters.

use std::path::PathBuf;

use contextfit_core::EngineSpec;
use serde::{Deserialize, Serialize};

fn default_repo_map_tokens() -> usize {
    1024
}
fn default_write_tokens() -> usize {
    4096
}
fn default_true() -> bool {
    true
}

/// Everything a caller supplies to build a fitted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Working directory the engine is bound to.
    pub directory: PathBuf,

    /// Model identifier.
    pub model: String,

    /// Files the model may edit. Always loaded in full.
    #[serde(default)]
    pub write_files: Vec<String>,

    /// Read-only candidates, most important first. Trailing entries are
    /// dropped until the context fits.
    #[serde(default)]
    pub read_files: Vec<String>,

    /// Commit successful edits automatically.
    #[serde(default)]
    pub commit: bool,

    /// Token budget for the repository map. `0` disables the map.
    #[serde(default = "default_repo_map_tokens")]
    pub repo_map_tokens: usize,

    /// Headroom guaranteed for the reply.
    #[serde(default = "default_write_tokens")]
    pub write_tokens: usize,

    /// Fail instead of returning an overflowing session.
    #[serde(default = "default_true")]
    pub error_if_no_context: bool,
}

impl SessionOptions {
    pub fn new(directory: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            model: model.into(),
            write_files: Vec::new(),
            read_files: Vec::new(),
            commit: false,
            repo_map_tokens: default_repo_map_tokens(),
            write_tokens: default_write_tokens(),
            error_if_no_context: true,
        }
    }

    pub fn with_write_files<S: Into<String>>(mut self, files: impl IntoIterator<Item = S>) -> Self {
        self.write_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_read_files<S: Into<String>>(mut self, files: impl IntoIterator<Item = S>) -> Self {
        self.read_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    pub fn with_repo_map_tokens(mut self, tokens: usize) -> Self {
        self.repo_map_tokens = tokens;
        self
    }

    pub fn with_write_tokens(mut self, tokens: usize) -> Self {
        self.write_tokens = tokens;
        self
    }

    /// Return a best-effort session instead of failing when nothing fits.
    pub fn lenient(mut self) -> Self {
        self.error_if_no_context = false;
        self
    }

    /// The engine construction parameters.
    pub fn engine_spec(&self) -> EngineSpec {
        EngineSpec {
            directory: self.directory.clone(),
            model: self.model.clone(),
            map_tokens: self.repo_map_tokens,
            auto_commit: self.commit,
        }
    }
}
