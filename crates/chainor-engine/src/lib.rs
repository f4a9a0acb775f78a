//! Top-level orchestration facade.
//!
//! Ties the pipeline together: classify a task, bias routing with
//! historical performance data, check the result cache, drive the agent
//! chain with retries, then score the result and feed the score back into
//! the optimizer. External collaborators (the text-generation backend and
//! the result evaluator) are injected behind the `chainor-core` traits.
//!
//! # Main types
//!
//! - [`Engine`] — The classify → route → chain → learn loop.
//! - [`EngineOutcome`] — Structured result of one `run` call.

/// The orchestration facade.
pub mod engine;
/// Tracing subscriber setup.
pub mod telemetry;

pub use engine::{Engine, EngineOutcome};
pub use telemetry::init_tracing;
