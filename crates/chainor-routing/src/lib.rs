//! Task classification and plan routing.
//!
//! The classifier turns free-text task descriptions into a structured
//! [`Classification`] via weighted keyword scoring; the router turns a
//! classification into an executable [`Plan`] through a deterministic
//! decision table, optionally biased by historical performance data.
//!
//! # Main types
//!
//! - [`Classifier`] — Keyword-scoring complexity/type/domain analysis.
//! - [`Classification`] — The decision object produced per task.
//! - [`Router`] — `(complexity, task type)` → agent sequence lookup.
//! - [`Plan`] — Ordered agent sequence plus execution parameters.
//! - [`ComboInsight`] — Historical best-combination data fed by the optimizer.

/// Keyword-based task classification.
pub mod classifier;
/// Plan selection.
pub mod router;

pub use classifier::{
    Classification, Classifier, ClassifierConfig, Complexity, ComplexityScores, Domain,
    TaskParams, TaskType, WorkflowGroup,
};
pub use router::{ComboInsight, Plan, RouteConfig, Router};
