//! One engine, one working directory, one budget snapshot.

use contextfit_core::{
    Engine, EngineError, EngineFactory, EngineSpec, InteractionKind, OutputChannel, Result,
};
use contextfit_telemetry::BudgetSnapshot;
use tracing::{debug, info};

/// An assistant session.
///
/// Owned by the request that created it; never shared. Every operation that
/// reaches into the engine captures the engine's side output so nothing
/// leaks to the shared sink.
pub struct Session {
    engine: Box<dyn Engine>,
    snapshot: BudgetSnapshot,
    output: OutputChannel,
    /// Read-only candidates dropped while fitting, in drop order.
    dropped: Vec<String>,
}

impl Session {
    /// Build an engine for `spec` and load exactly the given files.
    ///
    /// The snapshot is loaded once on construction and again after each
    /// non-empty file list is added.
    pub fn open<S: AsRef<str>>(
        factory: &dyn EngineFactory,
        spec: &EngineSpec,
        write_files: &[S],
        read_files: &[S],
        output: OutputChannel,
    ) -> Result<Self> {
        let mut engine = factory.create(spec, output.clone())?;
        let mut snapshot = BudgetSnapshot::new(&spec.model);
        {
            let _quiet = output.capture();
            snapshot.load(engine.as_mut())?;
        }

        let mut session = Self {
            engine,
            snapshot,
            output,
            dropped: Vec::new(),
        };
        if !write_files.is_empty() {
            session.add_writable_files(write_files)?;
        }
        if !read_files.is_empty() {
            session.add_readonly_files(read_files)?;
        }

        debug!(
            model = %spec.model,
            writable = write_files.len(),
            readonly = read_files.len(),
            remaining = session.snapshot.remaining_tokens,
            "Session opened"
        );
        Ok(session)
    }

    /// The current budget snapshot.
    pub fn snapshot(&self) -> &BudgetSnapshot {
        &self.snapshot
    }

    /// Read access to the engine.
    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    /// Headroom left after the current context.
    pub fn remaining_tokens(&self) -> i64 {
        self.snapshot.remaining_tokens
    }

    /// Candidates dropped while fitting this session.
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    pub(crate) fn set_dropped(&mut self, dropped: Vec<String>) {
        self.dropped = dropped;
    }

    /// Recompute the snapshot from the live engine.
    pub fn reload(&mut self) -> Result<&BudgetSnapshot> {
        let _quiet = self.output.capture();
        self.snapshot.load(self.engine.as_mut())?;
        Ok(&self.snapshot)
    }

    /// Track `files` as writable, then reload. Returns the engine's notices.
    pub fn add_writable_files<S: AsRef<str>>(&mut self, files: &[S]) -> Result<String> {
        let capture = self.output.capture();
        let added = files
            .iter()
            .try_for_each(|file| self.engine.add_writable(file.as_ref()));
        self.reload_after_add(added)?;
        let notices = capture.finish();
        debug!(count = files.len(), total = self.snapshot.total_tokens, "Writable files added");
        Ok(notices)
    }

    /// Track `files` as read-only, then reload. Returns the engine's notices.
    pub fn add_readonly_files<S: AsRef<str>>(&mut self, files: &[S]) -> Result<String> {
        let capture = self.output.capture();
        let added = files
            .iter()
            .try_for_each(|file| self.engine.add_readonly(file.as_ref()));
        self.reload_after_add(added)?;
        let notices = capture.finish();
        debug!(count = files.len(), total = self.snapshot.total_tokens, "Read-only files added");
        Ok(notices)
    }

    /// Reload after a batch add. Files tracked before a failing path still
    /// count, so the snapshot is recomputed before the add error surfaces.
    fn reload_after_add(&mut self, added: std::result::Result<(), EngineError>) -> Result<()> {
        let loaded = self.snapshot.load(self.engine.as_mut()).map(|_| ());
        added?;
        loaded?;
        Ok(())
    }

    /// Send `text` under `kind` and return everything the engine wrote.
    ///
    /// A persona switch at the end of the dispatch counts as success.
    pub fn send(&mut self, kind: InteractionKind, text: &str) -> Result<String> {
        info!(kind = %kind, remaining = self.snapshot.remaining_tokens, "Dispatch started");
        let capture = self.output.capture();
        match self.engine.dispatch(kind, text) {
            Ok(()) => {}
            Err(EngineError::PersonaSwitch { to }) => {
                debug!(to = %to, "Engine switched persona");
            }
            Err(e) => return Err(e.into()),
        }
        let reply = capture.finish();
        info!(kind = %kind, chars = reply.len(), "Dispatch finished");
        Ok(reply)
    }

    pub fn ask(&mut self, message: &str) -> Result<String> {
        self.send(InteractionKind::Ask, message)
    }

    pub fn architect(&mut self, message: &str) -> Result<String> {
        self.send(InteractionKind::Architect, message)
    }

    pub fn code(&mut self, message: &str) -> Result<String> {
        self.send(InteractionKind::Code, message)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("snapshot", &self.snapshot)
            .field("dropped", &self.dropped)
            .finish_non_exhaustive()
    }
}
