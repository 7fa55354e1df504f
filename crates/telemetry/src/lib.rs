//! Token accounting and cost estimation for contextfit sessions.
//!
//! Provides the per-session [`BudgetSnapshot`] (what the current context
//! costs and how much of the model's window is left) and the built-in
//! [`ModelCatalog`] of per-model prices and input limits.

pub mod budget;
pub mod catalog;

pub use budget::{BudgetSnapshot, COUNT_REMINDER_TWICE, FileRecord, render_file};
pub use catalog::{ModelCatalog, ModelEntry};
