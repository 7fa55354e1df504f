//! Chat-completion backends for contextfit.
//!
//! All backends implement the `contextfit_core::ChatBackend` trait.
//! The router selects the correct backend based on configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatBackend;
pub use router::{BackendRouter, build_from_config};
