//! Scripted engine and factory for session tests.
//!
//! Token counts are fixed per file so fitting scenarios can be written as
//! plain arithmetic.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use contextfit_core::{
    Engine, EngineError, EngineFactory, EngineSpec, Fence, InteractionKind, Message, ModelInfo,
    OutputChannel, ProviderError,
};

const ROOT: &str = "/w";
const MAP: &str = "<repo map>";

/// Tokens charged for each conversation message.
pub const CHAT_TOKENS_PER_MESSAGE: usize = 10;

#[derive(Debug, Clone)]
pub enum FileKind {
    /// Text file rendering to this many tokens.
    Text(usize),
    /// Image priced at this many tokens.
    Image(usize),
    /// Non-text file.
    Binary,
}

/// The world every scripted engine is built from.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub max_tokens: Option<usize>,
    pub unit_cost: Option<f64>,
    /// System prompt tokens.
    pub overhead: usize,
    /// Repository map tokens; `0` produces no map.
    pub repo_map_tokens: usize,
    pub files: HashMap<String, FileKind>,
    pub reply: Result<String, String>,
}

impl Scenario {
    pub fn new(max_tokens: usize, overhead: usize) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            unit_cost: Some(0.001),
            overhead,
            repo_map_tokens: 0,
            files: HashMap::new(),
            reply: Ok("scripted reply".into()),
        }
    }

    pub fn text(mut self, name: &str, tokens: usize) -> Self {
        self.files.insert(name.into(), FileKind::Text(tokens));
        self
    }

    pub fn image(mut self, name: &str, tokens: usize) -> Self {
        self.files.insert(name.into(), FileKind::Image(tokens));
        self
    }

    pub fn binary(mut self, name: &str) -> Self {
        self.files.insert(name.into(), FileKind::Binary);
        self
    }

    pub fn repo_map(mut self, tokens: usize) -> Self {
        self.repo_map_tokens = tokens;
        self
    }

    pub fn failing_dispatch(mut self, message: &str) -> Self {
        self.reply = Err(message.into());
        self
    }
}

pub struct ScriptedEngine {
    scenario: Scenario,
    info: ModelInfo,
    output: OutputChannel,
    writable: Vec<PathBuf>,
    readonly: Vec<PathBuf>,
    conversation: Vec<Message>,
}

impl ScriptedEngine {
    pub fn new(scenario: Scenario, model: &str, output: OutputChannel) -> Self {
        let info = ModelInfo {
            name: model.into(),
            input_cost_per_token: scenario.unit_cost,
            output_cost_per_token: None,
            max_input_tokens: scenario.max_tokens,
        };
        Self {
            scenario,
            info,
            output,
            writable: Vec::new(),
            readonly: Vec::new(),
            conversation: Vec::new(),
        }
    }

    fn abs(name: &str) -> PathBuf {
        Path::new(ROOT).join(name)
    }

    /// Paths climbing out of the root are rejected, as the real engine does.
    fn check_inside(path: &str) -> Result<(), EngineError> {
        if path.starts_with("../") || path.starts_with('/') {
            return Err(EngineError::OutsideWorkspace(PathBuf::from(path)));
        }
        Ok(())
    }

    fn kind(&self, path: &Path) -> Option<&FileKind> {
        self.scenario.files.get(&self.relative_path(path))
    }
}

impl Engine for ScriptedEngine {
    fn model_info(&self) -> &ModelInfo {
        &self.info
    }

    fn token_count(&self, text: &str) -> usize {
        if text == MAP {
            return self.scenario.repo_map_tokens;
        }
        let name = text.lines().next().unwrap_or_default();
        match self.scenario.files.get(name) {
            Some(FileKind::Text(tokens)) => *tokens,
            _ => 0,
        }
    }

    fn token_count_messages(&self, messages: &[Message]) -> usize {
        if messages.iter().any(|m| m.role == contextfit_core::Role::System) {
            self.scenario.overhead
        } else {
            messages.len() * CHAT_TOKENS_PER_MESSAGE
        }
    }

    fn token_count_image(&self, path: &Path) -> Result<usize, EngineError> {
        match self.kind(path) {
            Some(FileKind::Image(tokens)) => Ok(*tokens),
            _ => Err(EngineError::Image {
                path: path.to_path_buf(),
                reason: "not an image".into(),
            }),
        }
    }

    fn is_image(&self, path: &Path) -> bool {
        matches!(self.kind(path), Some(FileKind::Image(_)))
    }

    fn choose_fence(&mut self) -> Fence {
        Fence::backticks()
    }

    fn system_prompt(&self) -> String {
        "system".into()
    }

    fn system_reminder(&self) -> String {
        "reminder".into()
    }

    fn conversation(&self) -> Vec<Message> {
        self.conversation.clone()
    }

    fn all_files(&self) -> Vec<PathBuf> {
        let mut names: Vec<&String> = self.scenario.files.keys().collect();
        names.sort();
        names.into_iter().map(|n| Self::abs(n)).collect()
    }

    fn writable_files(&self) -> Vec<PathBuf> {
        self.writable.clone()
    }

    fn readonly_files(&self) -> Vec<PathBuf> {
        self.readonly.clone()
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(ROOT)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    fn repo_map(&self, _loaded: &[PathBuf], other: &[PathBuf]) -> Option<String> {
        (self.scenario.repo_map_tokens > 0 && !other.is_empty()).then(|| MAP.to_string())
    }

    fn read_text(&self, path: &Path) -> Result<Option<String>, EngineError> {
        match self.kind(path) {
            Some(FileKind::Text(_)) => Ok(Some(String::new())),
            Some(_) => Ok(None),
            None => Err(EngineError::io(
                path,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            )),
        }
    }

    fn add_writable(&mut self, path: &str) -> Result<(), EngineError> {
        Self::check_inside(path)?;
        if !self.scenario.files.contains_key(path) {
            self.output.writeln(&format!("{path} does not exist, skipping"));
            return Ok(());
        }
        let abs = Self::abs(path);
        self.readonly.retain(|p| p != &abs);
        if !self.writable.contains(&abs) {
            self.writable.push(abs);
        }
        self.output.writeln(&format!("Added {path} to the chat"));
        Ok(())
    }

    fn add_readonly(&mut self, path: &str) -> Result<(), EngineError> {
        Self::check_inside(path)?;
        if !self.scenario.files.contains_key(path) {
            self.output.writeln(&format!("{path} does not exist, skipping"));
            return Ok(());
        }
        let abs = Self::abs(path);
        if self.writable.contains(&abs) {
            self.output
                .writeln(&format!("{path} is already in the chat as an editable file"));
            return Ok(());
        }
        if !self.readonly.contains(&abs) {
            self.readonly.push(abs);
        }
        self.output.writeln(&format!("Added {path} to read-only files"));
        Ok(())
    }

    fn dispatch(&mut self, _kind: InteractionKind, message: &str) -> Result<(), EngineError> {
        match &self.scenario.reply {
            Ok(reply) => {
                self.output.writeln(reply);
                self.conversation.push(Message::user(message));
                self.conversation.push(Message::assistant(reply.clone()));
                Err(EngineError::PersonaSwitch {
                    to: InteractionKind::Code,
                })
            }
            Err(e) => Err(EngineError::Dispatch(ProviderError::Network(e.clone()))),
        }
    }
}

/// Factory building [`ScriptedEngine`]s and counting constructions.
pub struct ScriptedFactory {
    pub scenario: Scenario,
    pub creates: Cell<usize>,
    pub fail_create: bool,
}

impl ScriptedFactory {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            creates: Cell::new(0),
            fail_create: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_create: true,
            ..Self::new(Scenario::new(1000, 0))
        }
    }
}

impl EngineFactory for ScriptedFactory {
    fn create(
        &self,
        spec: &EngineSpec,
        output: OutputChannel,
    ) -> Result<Box<dyn Engine>, EngineError> {
        self.creates.set(self.creates.get() + 1);
        if self.fail_create {
            return Err(EngineError::NotFound(spec.directory.clone()));
        }
        Ok(Box::new(ScriptedEngine::new(
            self.scenario.clone(),
            &spec.model,
            output,
        )))
    }
}
