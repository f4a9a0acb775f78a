//! Retry and fallback control for agent invocations.
//!
//! Wraps a single agent call: failures are classified into a fixed
//! taxonomy, a substitute agent is selected from a static fallback table,
//! and the call is retried with linearly growing backoff up to a bound.
//! The controller never raises past its own boundary; every invocation
//! resolves to a structured [`RetryOutcome`].
//!
//! # Main types
//!
//! - [`RetryHandler`] — The bounded retry/substitution loop.
//! - [`RetryOutcome`] — Discriminated success/exhaustion result.
//! - [`RetryAttempt`] — One recorded failure within a retry session.
//! - [`ErrorKind`] — Failure taxonomy from error-message inspection.
//! - [`FallbackConfig`] — Substitute agents and remediation strategies.
//! - [`RetryHistory`] — Persisted log of recent retry outcomes.

/// Error taxonomy, substitute tables, remediation strategies.
pub mod fallback;
/// The retry loop.
pub mod handler;
/// Persisted outcome history.
pub mod history;

pub use fallback::{classify_error, ErrorKind, FallbackConfig};
pub use handler::{RetryAttempt, RetryHandler, RetryOutcome};
pub use history::{HistoryEntry, RetryHistory};
