//! The context-fitting algorithm.

use contextfit_core::{EngineFactory, Error, OutputChannel, Result};
use tracing::{debug, info, warn};

use crate::options::SessionOptions;
use crate::session::Session;

/// Build a session whose headroom covers `options.write_tokens`.
///
/// Every writable file is always loaded. Read-only candidates are tried in
/// full first; while the session is short of the reservation and more than
/// one candidate remains, the last candidate is dropped and the engine is
/// rebuilt from scratch. When a single candidate (or none) remains and the
/// session still does not fit, strict options fail with
/// [`Error::ContextExhausted`]; lenient options return the overflowing
/// session as is.
///
/// Engine construction and file read failures propagate unchanged.
pub fn fit_session(
    factory: &dyn EngineFactory,
    options: &SessionOptions,
    output: OutputChannel,
) -> Result<Session> {
    let spec = options.engine_spec();
    let mut candidates = options.read_files.clone();
    let mut dropped = Vec::new();

    loop {
        debug!(
            candidates = candidates.len(),
            writable = options.write_files.len(),
            "Fitting step"
        );
        let mut session = Session::open(
            factory,
            &spec,
            &options.write_files,
            &candidates,
            output.clone(),
        )?;

        if session.snapshot().fits(options.write_tokens) {
            session.set_dropped(dropped);
            return Ok(session);
        }

        if candidates.len() > 1 {
            if let Some(file) = candidates.pop() {
                info!(
                    file = %file,
                    remaining = session.remaining_tokens(),
                    required = options.write_tokens,
                    "Dropping read-only candidate"
                );
                dropped.push(file);
            }
            continue;
        }

        let snapshot = session.snapshot();
        if options.error_if_no_context {
            warn!(
                remaining = snapshot.remaining_tokens,
                required = options.write_tokens,
                max = snapshot.max_tokens,
                "Session has no context"
            );
            return Err(Error::ContextExhausted {
                write_tokens: options.write_tokens,
                remaining_tokens: snapshot.remaining_tokens,
                max_tokens: snapshot.max_tokens,
            });
        }

        warn!(
            remaining = snapshot.remaining_tokens,
            required = options.write_tokens,
            "Accepting session without reply headroom"
        );
        session.set_dropped(dropped);
        return Ok(session);
    }
}
