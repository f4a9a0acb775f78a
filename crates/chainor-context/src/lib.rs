//! Chained-execution context management.
//!
//! One [`ExecutionContext`] accumulates the state of a single chain run:
//! the ordered step log and the key/value shared-data bag. The
//! [`ContextManager`] persists every mutation write-through, and the
//! [`ChainRunner`] drives a plan's agents sequentially, folding prior
//! history and shared data into each subsequent prompt and wrapping every
//! invocation in the retry controller.
//!
//! # Main types
//!
//! - [`ExecutionContext`] — Step log + shared map for one chain run.
//! - [`Step`] — One immutable completed step.
//! - [`ContextManager`] — Store-backed context lifecycle.
//! - [`ChainRunner`] — Sequential plan execution with retry and triggers.
//! - [`ChainOutcome`] — Completed steps, final context, optional failure.

/// Sequential chain execution.
pub mod chain;
/// Context entities and prompt building.
pub mod context;
/// Store-backed lifecycle operations.
pub mod manager;

pub use chain::{ChainConfig, ChainOutcome, ChainRunner, CompletedStep, ExhaustionReport, ShareTrigger};
pub use context::{ExecutionContext, Step, STEP_RESULT_CHARS, SUMMARY_CHARS};
pub use manager::ContextManager;
