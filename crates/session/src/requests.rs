//! Request-facing operations: fit a session, send one message, return the
//! captured reply.
//!
//! Each call builds a fresh session; nothing survives between requests.
//! The verbs take `error_if_no_context` per call, overriding the value in
//! the options. `send_with_fitted_session` uses the options as given.

use std::borrow::Cow;

use contextfit_core::{EngineFactory, InteractionKind, OutputChannel, Result};

use crate::fit::fit_session;
use crate::options::SessionOptions;

/// Fit a session and send `text` under `kind`.
pub fn send_with_fitted_session(
    factory: &dyn EngineFactory,
    options: &SessionOptions,
    kind: InteractionKind,
    text: &str,
) -> Result<String> {
    let mut session = fit_session(factory, options, OutputChannel::discard())?;
    session.send(kind, text)
}

fn with_strictness(options: &SessionOptions, error_if_no_context: bool) -> Cow<'_, SessionOptions> {
    if options.error_if_no_context == error_if_no_context {
        Cow::Borrowed(options)
    } else {
        Cow::Owned(SessionOptions {
            error_if_no_context,
            ..options.clone()
        })
    }
}

/// Ask a question about the code.
pub fn ask_aider(
    factory: &dyn EngineFactory,
    options: &SessionOptions,
    query: &str,
    error_if_no_context: bool,
) -> Result<String> {
    let options = with_strictness(options, error_if_no_context);
    send_with_fitted_session(factory, &options, InteractionKind::Ask, query)
}

/// Request a design or plan.
pub fn architect_with_aider(
    factory: &dyn EngineFactory,
    options: &SessionOptions,
    instruction: &str,
    error_if_no_context: bool,
) -> Result<String> {
    let options = with_strictness(options, error_if_no_context);
    send_with_fitted_session(factory, &options, InteractionKind::Architect, instruction)
}

/// Request direct code edits.
pub fn code_with_aider(
    factory: &dyn EngineFactory,
    options: &SessionOptions,
    instruction: &str,
    error_if_no_context: bool,
) -> Result<String> {
    let options = with_strictness(options, error_if_no_context);
    send_with_fitted_session(factory, &options, InteractionKind::Code, instruction)
}
