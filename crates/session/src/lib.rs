//! Context-fitted assistant sessions.
//!
//! A [`Session`] owns one engine bound to one working directory and keeps a
//! [`BudgetSnapshot`](contextfit_telemetry::BudgetSnapshot) of what the
//! current context costs. [`fit_session`] builds a session whose headroom
//! covers the caller's reply reservation:
//!
//! 1. **Build** an engine with every writable file and the read-only candidates
//! 2. **Measure** the snapshot's remaining tokens
//! 3. **Narrow**: if short of the reservation, drop the last candidate and rebuild
//! 4. **Stop** when it fits, or when one candidate is left (strict mode fails)
//!
//! The request-facing helpers in [`requests`] fit a session and send one
//! message through it.

pub mod fit;
pub mod options;
pub mod requests;
pub mod session;

pub use fit::fit_session;
pub use options::SessionOptions;
pub use requests::{architect_with_aider, ask_aider, code_with_aider, send_with_fitted_session};
pub use session::Session;
