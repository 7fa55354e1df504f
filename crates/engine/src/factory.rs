//! Engine factory for the built-in workspace engine.

use std::sync::Arc;

use contextfit_core::{
    ChatBackend, Engine, EngineError, EngineFactory, EngineSpec, InteractionKind, OutputChannel,
};
use contextfit_telemetry::ModelCatalog;

use crate::workspace::WorkspaceEngine;

/// Builds [`WorkspaceEngine`]s sharing one backend and one model catalog.
pub struct WorkspaceEngineFactory {
    backend: Arc<dyn ChatBackend>,
    catalog: Arc<ModelCatalog>,
    base: InteractionKind,
    max_reply_tokens: Option<u32>,
}

impl WorkspaceEngineFactory {
    pub fn new(backend: Arc<dyn ChatBackend>, catalog: Arc<ModelCatalog>) -> Self {
        Self {
            backend,
            catalog,
            base: InteractionKind::Code,
            max_reply_tokens: None,
        }
    }

    /// Persona engines rest in between dispatches.
    pub fn with_base(mut self, kind: InteractionKind) -> Self {
        self.base = kind;
        self
    }

    /// Cap generated tokens per reply.
    pub fn with_max_reply_tokens(mut self, max: Option<u32>) -> Self {
        self.max_reply_tokens = max;
        self
    }
}

impl EngineFactory for WorkspaceEngineFactory {
    fn create(
        &self,
        spec: &EngineSpec,
        output: OutputChannel,
    ) -> Result<Box<dyn Engine>, EngineError> {
        let info = self.catalog.info_or_unknown(&spec.model);
        let engine = WorkspaceEngine::open(spec.clone(), info, self.backend.clone(), output)?
            .with_base(self.base)
            .with_max_reply_tokens(self.max_reply_tokens);
        Ok(Box::new(engine))
    }
}
