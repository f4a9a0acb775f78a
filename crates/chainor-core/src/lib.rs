//! Core types and error definitions for the Chainor orchestration engine.
//!
//! This crate provides the foundational pieces shared across all Chainor
//! crates: the unified error type, the narrow contracts for external
//! collaborators (text-generation backends and result evaluators), and the
//! text truncation helper every component uses to cap stored text.
//!
//! # Main types
//!
//! - [`ChainorError`] — Unified error enum for all Chainor subsystems.
//! - [`ChainorResult`] — Convenience alias for `Result<T, ChainorError>`.
//! - [`AgentExecutor`] — Contract for the external text-generation backend.
//! - [`Evaluator`] — Contract for the external result-scoring collaborator.

/// External collaborator contracts.
pub mod executor;
/// Character-boundary-safe text truncation.
pub mod text;

pub use executor::{AgentExecutor, Evaluator};
pub use text::truncate_chars;

/// Top-level error type for the Chainor engine.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Debug, thiserror::Error)]
pub enum ChainorError {
    /// A failure reported by an external agent execution call.
    #[error("Execution error: {0}")]
    Execution(String),

    /// An error related to blob persistence or lookup.
    #[error("Store error: {0}")]
    Store(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error raised by the external evaluation collaborator.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// An error from the chain/fan-out orchestration layer.
    #[error("Orchestration error: {0}")]
    Orchestration(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`ChainorError`].
pub type ChainorResult<T> = Result<T, ChainorError>;
