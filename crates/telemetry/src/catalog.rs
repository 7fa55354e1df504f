//! Built-in metadata table for common LLM models.
//!
//! Prices are in USD per 1 million tokens, converted to per-token figures on
//! lookup. Each model also carries its maximum input size. Custom entries can
//! be added at runtime (the config crate feeds its overrides through `set`).

use contextfit_core::ModelInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Routing prefixes that precede the vendor in model names
/// (`openrouter/deepseek/deepseek-r1-0528`).
const ROUTING_PREFIXES: &[&str] = &["openrouter/", "litellm/", "custom/"];

/// Vendor prefixes tried when a bare model name is requested.
const VENDOR_PREFIXES: &[&str] = &[
    "openai",
    "anthropic",
    "google",
    "mistral",
    "deepseek",
    "meta-llama",
];

/// Per-million-token pricing and context size for a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Price per 1M input tokens in USD.
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD.
    pub output_per_m: f64,
    /// Maximum input tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_input_tokens: Option<usize>,
}

impl ModelEntry {
    /// Create a new entry.
    pub fn new(input_per_m: f64, output_per_m: f64, max_input_tokens: usize) -> Self {
        Self {
            input_per_m,
            output_per_m,
            max_input_tokens: Some(max_input_tokens),
        }
    }

    /// Metadata for `name` built from this entry.
    pub fn to_info(&self, name: &str) -> ModelInfo {
        ModelInfo {
            name: name.to_string(),
            input_cost_per_token: Some(self.input_per_m / 1_000_000.0),
            output_cost_per_token: Some(self.output_per_m / 1_000_000.0),
            max_input_tokens: self.max_input_tokens,
        }
    }
}

/// Thread-safe model table with built-in defaults and custom overrides.
pub struct ModelCatalog {
    entries: RwLock<HashMap<String, ModelEntry>>,
}

impl ModelCatalog {
    /// Create a catalog with built-in model metadata.
    pub fn with_defaults() -> Self {
        let mut entries = HashMap::new();

        // ── Anthropic ──────────────────────────────────────────────
        entries.insert(
            "anthropic/claude-sonnet-4".into(),
            ModelEntry::new(3.0, 15.0, 200_000),
        );
        entries.insert(
            "anthropic/claude-opus-4".into(),
            ModelEntry::new(15.0, 75.0, 200_000),
        );
        entries.insert(
            "anthropic/claude-3.5-sonnet".into(),
            ModelEntry::new(3.0, 15.0, 200_000),
        );
        entries.insert(
            "anthropic/claude-3.5-haiku".into(),
            ModelEntry::new(0.8, 4.0, 200_000),
        );

        // ── OpenAI ─────────────────────────────────────────────────
        entries.insert("openai/gpt-4o".into(), ModelEntry::new(2.5, 10.0, 128_000));
        entries.insert(
            "openai/gpt-4o-mini".into(),
            ModelEntry::new(0.15, 0.6, 128_000),
        );
        entries.insert("openai/gpt-4.1".into(), ModelEntry::new(2.0, 8.0, 1_047_576));
        entries.insert("openai/o1".into(), ModelEntry::new(15.0, 60.0, 200_000));
        entries.insert("openai/o3-mini".into(), ModelEntry::new(1.1, 4.4, 200_000));

        // ── Google ─────────────────────────────────────────────────
        entries.insert(
            "google/gemini-2.0-flash".into(),
            ModelEntry::new(0.1, 0.4, 1_048_576),
        );
        entries.insert(
            "google/gemini-1.5-pro".into(),
            ModelEntry::new(1.25, 5.0, 2_097_152),
        );

        // ── Meta (via OpenRouter) ──────────────────────────────────
        entries.insert(
            "meta-llama/llama-3.1-405b".into(),
            ModelEntry::new(2.7, 2.7, 131_072),
        );
        entries.insert(
            "meta-llama/llama-3.1-70b".into(),
            ModelEntry::new(0.52, 0.75, 131_072),
        );

        // ── Mistral ────────────────────────────────────────────────
        entries.insert(
            "mistral/mistral-large".into(),
            ModelEntry::new(2.0, 6.0, 128_000),
        );
        entries.insert(
            "mistral/codestral".into(),
            ModelEntry::new(0.3, 0.9, 256_000),
        );

        // ── DeepSeek ───────────────────────────────────────────────
        entries.insert(
            "deepseek/deepseek-v3".into(),
            ModelEntry::new(0.27, 1.1, 64_000),
        );
        entries.insert(
            "deepseek/deepseek-r1".into(),
            ModelEntry::new(0.55, 2.19, 64_000),
        );
        entries.insert(
            "deepseek/deepseek-r1-0528".into(),
            ModelEntry::new(0.5, 2.15, 128_000),
        );

        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Create an empty catalog.
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Entry stored under exactly `model`.
    pub fn get(&self, model: &str) -> Option<ModelEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(model).cloned()
    }

    /// Add or update the entry for a model.
    pub fn set(&self, model: impl Into<String>, entry: ModelEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(model.into(), entry);
    }

    /// Look up metadata for a model, `None` if nothing matches.
    ///
    /// Supports flexible matching: tries the exact name, then the name with a
    /// routing prefix stripped (`openrouter/deepseek/x` → `deepseek/x`), then
    /// vendor-prefixed forms of a bare name (`gpt-4o` → `openai/gpt-4o`), then
    /// the longest entry whose bare name prefixes the model
    /// (`gpt-4o-mini-2024-07-18` matches `gpt-4o-mini`).
    pub fn lookup(&self, model: &str) -> Option<ModelInfo> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        // 1. Exact match
        if let Some(e) = entries.get(model) {
            return Some(e.to_info(model));
        }

        // 2. Routing prefix stripped
        let routed = ROUTING_PREFIXES
            .iter()
            .find_map(|prefix| model.strip_prefix(prefix))
            .unwrap_or(model);
        if let Some(e) = entries.get(routed) {
            return Some(e.to_info(model));
        }

        // 3. Vendor prefixes for bare names
        if !routed.contains('/') {
            for vendor in VENDOR_PREFIXES {
                if let Some(e) = entries.get(format!("{vendor}/{routed}").as_str()) {
                    return Some(e.to_info(model));
                }
            }
        }

        // 4. Longest bare-name prefix match
        let model_lower = routed.to_lowercase();
        let bare_model = model_lower.rsplit('/').next().unwrap_or(&model_lower);

        let mut best: Option<(&str, &ModelEntry)> = None;
        for (key, entry) in entries.iter() {
            let bare_key = key.rsplit('/').next().unwrap_or(key);
            if bare_model.starts_with(&bare_key.to_lowercase())
                && best.is_none_or(|(b, _)| bare_key.len() > b.len())
            {
                best = Some((bare_key, entry));
            }
        }

        match best {
            Some((_, e)) => Some(e.to_info(model)),
            None => {
                tracing::debug!(model, "No catalog metadata for model");
                None
            }
        }
    }

    /// Metadata for `model`, with every figure unknown when nothing matches.
    pub fn info_or_unknown(&self, model: &str) -> ModelInfo {
        self.lookup(model)
            .unwrap_or_else(|| ModelInfo::unknown(model))
    }

    /// List all known model names.
    pub fn models(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of models in the catalog.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}
