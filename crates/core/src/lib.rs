//! # contextfit core
//!
//! Domain types, traits, and error definitions shared by every contextfit
//! crate. Nothing in here touches the network or the filesystem — it defines
//! the domain model that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! The assistant engine is a capability, not a concrete type. The session
//! and budget code only ever see the [`Engine`] trait, so:
//! - the built-in workspace engine can be swapped for any compliant backend
//! - tests drive the fitting algorithm with scripted engines
//! - the dependency graph points inward (all crates depend on core)

pub mod engine;
pub mod error;
pub mod message;
pub mod model;
pub mod output;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use engine::{Engine, EngineFactory, EngineSpec, Fence, InteractionKind};
pub use error::{EngineError, Error, ProviderError, Result};
pub use message::{Message, Role};
pub use model::ModelInfo;
pub use output::{CaptureGuard, OutputChannel};
pub use provider::{ChatBackend, ChatRequest, ChatResponse, Usage};
