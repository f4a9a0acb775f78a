//! Historical performance tracking and user feedback.
//!
//! The optimizer records `(agent combination, task type, score)` tuples
//! over time and answers "which combination performs best"; the feedback
//! log collects discrete user ratings per agent. Both persist per
//! workflow as shared append-style blobs. The router is the only
//! component that acts on this data when deciding plans.
//!
//! # Main types
//!
//! - [`Optimizer`] — Combination/task-type score statistics.
//! - [`OptimizerStats`] — The persisted stats blob.
//! - [`FeedbackLog`] — User ratings with running per-agent sums.

/// User feedback records.
pub mod feedback;
/// Combination score statistics.
pub mod optimizer;

pub use feedback::{FeedbackEntry, FeedbackLog, FeedbackStats};
pub use optimizer::{Optimizer, OptimizerConfig, OptimizerStats, ScoreStat};
