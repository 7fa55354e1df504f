//! # contextfit engine
//!
//! The built-in implementation of the `Engine` capability: a workspace
//! bound to one directory and one model.
//!
//! - [`walk`] — gitignore-aware file discovery
//! - [`token`] — character-heuristic token estimation
//! - [`image`] — image detection and tile-based pricing
//! - [`fence`] — fence selection for file content
//! - [`prompts`] — persona prompts per interaction kind
//! - [`repo_map`] — listing of files not loaded into the chat
//! - [`workspace`] — the engine itself, [`factory`] to build it per session

pub mod factory;
pub mod fence;
pub mod image;
pub mod prompts;
pub mod repo_map;
pub mod token;
pub mod walk;
pub mod workspace;

pub use factory::WorkspaceEngineFactory;
pub use prompts::Persona;
pub use workspace::WorkspaceEngine;
