//! Context budget accounting for one session.
//!
//! A [`BudgetSnapshot`] is a point-in-time view of how much of the model's
//! input window the session would consume: system prompt, conversation,
//! repository map, and every loaded file. It holds no state of its own
//! between loads: [`BudgetSnapshot::load`] resets every figure and re-derives
//! it from the live engine.
//!
//! # Computation order
//!
//! 1. System tokens — the persona prompt and its reminder as system messages
//! 2. Chat tokens — completed turns plus the turn in progress
//! 3. Repository map tokens — map over every visible file not loaded
//! 4. Writable files — rendered with a fence, or priced as images
//! 5. Read-only files — rendered with a fence, images skipped
//! 6. Totals and remaining headroom

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use contextfit_core::{Engine, EngineError, Fence, Message};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Count the system reminder a second time as its own system message.
///
/// The reminder is already part of the combined system message and is
/// priced again standalone. Set to `false` to price it once.
pub const COUNT_REMINDER_TWICE: bool = true;

/// One file currently loaded into context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the working directory.
    pub name: String,
    /// Loaded for context only; the model may not edit it.
    pub readonly: bool,
    /// Tokens of the rendered file (or image-specific count).
    pub tokens: usize,
    /// `tokens × token_unit_cost`.
    pub cost: f64,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, tokens: usize, token_unit_cost: f64, readonly: bool) -> Self {
        Self {
            name: name.into(),
            readonly,
            tokens,
            cost: tokens as f64 * token_unit_cost,
        }
    }

    /// Plain key/value form.
    pub fn export(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "readonly": self.readonly,
            "tokens": self.tokens,
            "cost": self.cost,
        })
    }
}

impl std::fmt::Display for FileRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_pretty(f, &self.export())
    }
}

/// Render a file the way it is placed in the prompt: path, fence, content.
///
/// The closing fence follows the content directly; content normally ends
/// with its own newline.
pub fn render_file(relative_path: &str, content: &str, fence: &Fence) -> String {
    format!(
        "{relative_path}\n{open}\n{content}{close}\n",
        open = fence.open,
        close = fence.close
    )
}

/// Token and cost accounting for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSnapshot {
    pub model_name: String,
    pub token_unit_cost: f64,
    pub max_tokens: usize,

    pub system_tokens: usize,
    pub system_token_cost: f64,
    pub chat_tokens: usize,
    pub chat_token_cost: f64,
    pub repo_map_tokens: usize,
    pub repo_map_token_cost: f64,

    pub total_tokens: usize,
    pub total_cost: f64,
    /// `max_tokens - total_tokens`; negative when the session overflows.
    pub remaining_tokens: i64,

    /// Loaded files keyed by relative path.
    pub files: BTreeMap<String, FileRecord>,

    /// Fence used to render files.
    fence: Fence,
}

impl BudgetSnapshot {
    /// An empty snapshot for `model_name`. Call [`load`](Self::load) to fill it.
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            token_unit_cost: 0.0,
            max_tokens: 0,
            system_tokens: 0,
            system_token_cost: 0.0,
            chat_tokens: 0,
            chat_token_cost: 0.0,
            repo_map_tokens: 0,
            repo_map_token_cost: 0.0,
            total_tokens: 0,
            total_cost: 0.0,
            remaining_tokens: 0,
            files: BTreeMap::new(),
            fence: Fence::backticks(),
        }
    }

    /// Render files with `fence` instead of triple backticks.
    pub fn with_fence(mut self, fence: Fence) -> Self {
        self.fence = fence;
        self
    }

    /// Zero every aggregate and forget all files.
    pub fn reset(&mut self) {
        self.token_unit_cost = 0.0;
        self.max_tokens = 0;
        self.system_tokens = 0;
        self.system_token_cost = 0.0;
        self.chat_tokens = 0;
        self.chat_token_cost = 0.0;
        self.repo_map_tokens = 0;
        self.repo_map_token_cost = 0.0;
        self.total_tokens = 0;
        self.total_cost = 0.0;
        self.remaining_tokens = 0;
        self.files.clear();
    }

    /// Re-derive every figure from the live engine.
    ///
    /// File read failures from the engine are returned unchanged.
    pub fn load(&mut self, engine: &mut dyn Engine) -> Result<&Self, EngineError> {
        self.reset();
        engine.choose_fence();

        let info = engine.model_info();
        self.token_unit_cost = info.token_unit_cost();
        self.max_tokens = info.max_tokens();
        let unit = self.token_unit_cost;

        // ── System prompt ───────────────────────────────────────────
        self.system_tokens = engine.token_count_messages(&system_messages(engine));
        self.system_token_cost = self.system_tokens as f64 * unit;

        // ── Conversation ────────────────────────────────────────────
        let conversation = engine.conversation();
        if !conversation.is_empty() {
            self.chat_tokens = engine.token_count_messages(&conversation);
            self.chat_token_cost = self.chat_tokens as f64 * unit;
        }

        // ── Repository map ──────────────────────────────────────────
        let writable = engine.writable_files();
        let readonly = engine.readonly_files();
        let loaded: Vec<PathBuf> = writable.iter().chain(readonly.iter()).cloned().collect();
        let loaded_set: BTreeSet<&PathBuf> = loaded.iter().collect();
        let other: Vec<PathBuf> = engine
            .all_files()
            .into_iter()
            .filter(|path| !loaded_set.contains(path))
            .collect();
        if let Some(map) = engine.repo_map(&loaded, &other)
            && !map.is_empty()
        {
            self.repo_map_tokens = engine.token_count(&map);
            self.repo_map_token_cost = self.repo_map_tokens as f64 * unit;
        }

        // ── Writable files ──────────────────────────────────────────
        for path in &writable {
            let name = engine.relative_path(path);
            let tokens = if engine.is_image(path) {
                engine.token_count_image(path)?
            } else {
                let content = engine.read_text(path)?.ok_or_else(|| EngineError::Io {
                    path: path.clone(),
                    reason: "not a text file".into(),
                })?;
                engine.token_count(&render_file(&name, &content, &self.fence))
            };
            self.files
                .insert(name.clone(), FileRecord::new(name, tokens, unit, false));
        }

        // ── Read-only files ─────────────────────────────────────────
        for path in &readonly {
            let name = engine.relative_path(path);
            if engine.is_image(path) || self.files.contains_key(&name) {
                continue;
            }
            if let Some(content) = engine.read_text(path)? {
                let tokens = engine.token_count(&render_file(&name, &content, &self.fence));
                self.files
                    .insert(name.clone(), FileRecord::new(name, tokens, unit, true));
            }
        }

        // ── Totals ──────────────────────────────────────────────────
        self.total_tokens = self.system_tokens + self.chat_tokens + self.repo_map_tokens;
        self.total_cost = self.system_token_cost + self.chat_token_cost + self.repo_map_token_cost;
        for record in self.files.values() {
            self.total_tokens += record.tokens;
            self.total_cost += record.cost;
        }
        self.remaining_tokens = self.max_tokens as i64 - self.total_tokens as i64;

        debug!(
            model = %self.model_name,
            files = self.files.len(),
            total = self.total_tokens,
            remaining = self.remaining_tokens,
            "Budget snapshot loaded"
        );
        Ok(self)
    }

    /// Writable file records.
    pub fn writable(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values().filter(|r| !r.readonly)
    }

    /// Read-only file records.
    pub fn readonly(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values().filter(|r| r.readonly)
    }

    /// Sum of all file tokens.
    pub fn file_tokens(&self) -> usize {
        self.files.values().map(|r| r.tokens).sum()
    }

    /// Whether at least `reserve` tokens are left for the reply.
    pub fn fits(&self, reserve: usize) -> bool {
        self.remaining_tokens >= reserve as i64
    }

    /// Plain key/value form, suitable for logs and API responses.
    pub fn export(&self) -> serde_json::Value {
        let files: serde_json::Map<String, serde_json::Value> = self
            .files
            .iter()
            .map(|(path, record)| (path.clone(), record.export()))
            .collect();

        serde_json::json!({
            "model": self.model_name,
            "token_unit_cost": self.token_unit_cost,
            "system_tokens": self.system_tokens,
            "system_token_cost": self.system_token_cost,
            "chat_tokens": self.chat_tokens,
            "repo_map_tokens": self.repo_map_tokens,
            "repo_map_token_cost": self.repo_map_token_cost,
            "total_tokens": self.total_tokens,
            "total_cost": self.total_cost,
            "max_tokens": self.max_tokens,
            "remaining_tokens": self.remaining_tokens,
            "files": files,
        })
    }
}

impl std::fmt::Display for BudgetSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_pretty(f, &self.export())
    }
}

/// The system messages as priced: combined prompt + reminder, then the
/// reminder alone when [`COUNT_REMINDER_TWICE`] is set.
pub fn system_messages(engine: &dyn Engine) -> Vec<Message> {
    let reminder = engine.system_reminder();
    let mut messages = vec![Message::system(format!(
        "{}\n{}",
        engine.system_prompt(),
        reminder
    ))];
    if COUNT_REMINDER_TWICE {
        messages.push(Message::system(reminder));
    }
    messages
}

fn write_pretty(f: &mut std::fmt::Formatter<'_>, value: &serde_json::Value) -> std::fmt::Result {
    match serde_json::to_string_pretty(value) {
        Ok(text) => f.write_str(&text),
        Err(_) => Err(std::fmt::Error),
    }
}
