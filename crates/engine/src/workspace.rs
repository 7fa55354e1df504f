//! The built-in workspace engine.
//!
//! Binds one working directory to one model: tracks which files are loaded
//! (writable or read-only), estimates tokens, renders persona prompts, and
//! dispatches messages to a [`ChatBackend`]. Replies are written to the
//! engine's [`OutputChannel`]; edits in replies are not applied to disk.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contextfit_core::{
    ChatBackend, ChatRequest, Engine, EngineError, EngineSpec, Fence, InteractionKind, Message,
    ModelInfo, OutputChannel,
};
use contextfit_telemetry::render_file;
use tracing::{debug, info};

use crate::fence::choose_fence;
use crate::image::{is_image_path, token_count_image};
use crate::prompts::Persona;
use crate::repo_map::build_repo_map;
use crate::token::{estimate_messages_tokens, estimate_tokens};
use crate::walk::{list_files, normalize};

/// Assistant acknowledgement after context blocks.
const ACK: &str = "Ok.";

pub struct WorkspaceEngine {
    root: PathBuf,
    spec: EngineSpec,
    info: ModelInfo,
    backend: Arc<dyn ChatBackend>,
    output: OutputChannel,

    /// Persona the engine returns to after every dispatch.
    base: InteractionKind,
    persona: Persona,
    fence: Fence,
    max_reply_tokens: Option<u32>,

    /// Every visible file, absolute, sorted.
    files: Vec<PathBuf>,
    writable: BTreeSet<PathBuf>,
    readonly: BTreeSet<PathBuf>,

    done_messages: Vec<Message>,
    cur_messages: Vec<Message>,
}

impl WorkspaceEngine {
    /// Open an engine over `spec.directory`.
    pub fn open(
        spec: EngineSpec,
        info: ModelInfo,
        backend: Arc<dyn ChatBackend>,
        output: OutputChannel,
    ) -> Result<Self, EngineError> {
        let root = spec
            .directory
            .canonicalize()
            .map_err(|_| EngineError::NotFound(spec.directory.clone()))?;
        if !root.is_dir() {
            return Err(EngineError::NotFound(spec.directory.clone()));
        }

        let files: Vec<PathBuf> = list_files(&root)?
            .into_iter()
            .map(|rel| root.join(rel))
            .collect();

        debug!(
            root = %root.display(),
            model = %spec.model,
            files = files.len(),
            map_tokens = spec.map_tokens,
            "Workspace engine opened"
        );

        let base = InteractionKind::Code;
        Ok(Self {
            root,
            spec,
            info,
            backend,
            output,
            base,
            persona: Persona::for_kind(base),
            fence: Fence::backticks(),
            max_reply_tokens: None,
            files,
            writable: BTreeSet::new(),
            readonly: BTreeSet::new(),
            done_messages: Vec::new(),
            cur_messages: Vec::new(),
        })
    }

    /// Use `kind` as the resting persona.
    pub fn with_base(mut self, kind: InteractionKind) -> Self {
        self.base = kind;
        self.persona = Persona::for_kind(kind);
        self
    }

    /// Cap generated tokens per reply.
    pub fn with_max_reply_tokens(mut self, max: Option<u32>) -> Self {
        self.max_reply_tokens = max;
        self
    }

    /// The canonical working directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The active persona.
    pub fn persona(&self) -> InteractionKind {
        self.persona.kind
    }

    /// Resolve a user-supplied path to an absolute path inside the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, EngineError> {
        let given = Path::new(path);
        let joined = if given.is_absolute() {
            given.to_path_buf()
        } else {
            self.root.join(given)
        };
        let resolved = normalize(&joined);
        if !resolved.starts_with(&self.root) {
            return Err(EngineError::OutsideWorkspace(given.to_path_buf()));
        }
        Ok(resolved)
    }

    fn loaded(&self) -> Vec<PathBuf> {
        self.writable.iter().chain(self.readonly.iter()).cloned().collect()
    }

    fn unloaded(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|p| !self.writable.contains(*p) && !self.readonly.contains(*p))
            .cloned()
            .collect()
    }

    /// Loaded text files rendered with the current fence.
    fn render_loaded(&self) -> String {
        let mut text = String::new();
        for path in self.loaded() {
            if self.is_image(&path) {
                continue;
            }
            if let Ok(Some(content)) = self.read_text(&path) {
                text.push_str(&render_file(&self.relative_path(&path), &content, &self.fence));
            }
        }
        text
    }

    /// The full message list sent for `message`.
    fn format_messages(&self, message: &str) -> Vec<Message> {
        let mut messages = vec![Message::system(self.system_prompt())];

        if let Some(map) = self.repo_map(&self.loaded(), &self.unloaded()) {
            messages.push(Message::user(map));
            messages.push(Message::assistant(ACK));
        }

        let files = self.render_loaded();
        if !files.is_empty() {
            messages.push(Message::user(files));
            messages.push(Message::assistant(ACK));
        }

        messages.extend(self.done_messages.iter().cloned());
        messages.push(Message::user(message));
        messages.push(Message::system(self.system_reminder()));
        messages
    }
}

impl Engine for WorkspaceEngine {
    fn model_info(&self) -> &ModelInfo {
        &self.info
    }

    fn token_count(&self, text: &str) -> usize {
        estimate_tokens(text)
    }

    fn token_count_messages(&self, messages: &[Message]) -> usize {
        estimate_messages_tokens(messages)
    }

    fn token_count_image(&self, path: &Path) -> Result<usize, EngineError> {
        token_count_image(path)
    }

    fn is_image(&self, path: &Path) -> bool {
        is_image_path(path)
    }

    fn choose_fence(&mut self) -> Fence {
        let contents: Vec<String> = self
            .loaded()
            .iter()
            .filter(|p| !self.is_image(p))
            .filter_map(|p| self.read_text(p).ok().flatten())
            .collect();
        self.fence = choose_fence(contents.iter().map(String::as_str));
        self.fence.clone()
    }

    fn system_prompt(&self) -> String {
        self.persona.render_main(&self.fence)
    }

    fn system_reminder(&self) -> String {
        self.persona.render_reminder(&self.fence)
    }

    fn conversation(&self) -> Vec<Message> {
        self.done_messages
            .iter()
            .chain(self.cur_messages.iter())
            .cloned()
            .collect()
    }

    fn all_files(&self) -> Vec<PathBuf> {
        self.files.clone()
    }

    fn writable_files(&self) -> Vec<PathBuf> {
        self.writable.iter().cloned().collect()
    }

    fn readonly_files(&self) -> Vec<PathBuf> {
        self.readonly.iter().cloned().collect()
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn repo_map(&self, _loaded: &[PathBuf], other: &[PathBuf]) -> Option<String> {
        let names: Vec<String> = other.iter().map(|p| self.relative_path(p)).collect();
        build_repo_map(&names, self.spec.map_tokens)
    }

    fn read_text(&self, path: &Path) -> Result<Option<String>, EngineError> {
        let bytes = std::fs::read(path).map_err(|e| EngineError::io(path, &e))?;
        Ok(String::from_utf8(bytes).ok())
    }

    fn add_writable(&mut self, path: &str) -> Result<(), EngineError> {
        let resolved = self.resolve(path)?;
        let rel = self.relative_path(&resolved);
        if !resolved.is_file() {
            self.output.writeln(&format!("{rel} does not exist, skipping"));
            return Ok(());
        }
        if self.readonly.remove(&resolved) {
            debug!(file = %rel, "Promoted read-only file to writable");
        }
        if self.writable.insert(resolved) {
            self.output.writeln(&format!("Added {rel} to the chat"));
        }
        Ok(())
    }

    fn add_readonly(&mut self, path: &str) -> Result<(), EngineError> {
        let resolved = self.resolve(path)?;
        let rel = self.relative_path(&resolved);
        if !resolved.is_file() {
            self.output.writeln(&format!("{rel} does not exist, skipping"));
            return Ok(());
        }
        if self.writable.contains(&resolved) {
            self.output
                .writeln(&format!("{rel} is already in the chat as an editable file"));
            return Ok(());
        }
        if self.readonly.insert(resolved) {
            self.output.writeln(&format!("Added {rel} to read-only files"));
        }
        Ok(())
    }

    fn dispatch(&mut self, kind: InteractionKind, message: &str) -> Result<(), EngineError> {
        self.persona = Persona::for_kind(kind);
        self.choose_fence();
        let messages = self.format_messages(message);
        self.cur_messages.push(Message::user(message));

        let request = ChatRequest {
            model: self.spec.model.clone(),
            messages,
            temperature: None,
            max_tokens: self.max_reply_tokens,
        };

        debug!(
            kind = %kind,
            backend = self.backend.name(),
            prompt_tokens = estimate_messages_tokens(&request.messages),
            "Dispatching message"
        );

        let result = self.backend.complete(&request);
        self.persona = Persona::for_kind(self.base);
        let response = result?;

        self.output.writeln(&response.content);
        self.cur_messages.push(Message::assistant(response.content));
        self.done_messages.append(&mut self.cur_messages);

        if kind == InteractionKind::Code && self.spec.auto_commit {
            info!("Auto-commit requested; replies are returned as text and nothing is committed");
        }

        Err(EngineError::PersonaSwitch { to: self.base })
    }
}
