//! Bounded concurrent execution of independent work items.
//!
//! The alternate entry point for callers that have already decomposed work
//! into independent units instead of a chain. Items run on a bounded
//! worker pool; each item's failure is isolated into its own outcome and
//! never affects siblings. Completion order is unspecified; outcomes are
//! keyed by item name, so the returned map is deterministic regardless.
//!
//! # Main types
//!
//! - [`ConcurrentRunner`] — Semaphore-bounded parallel executor.
//! - [`WorkItem`] — A named, zero-argument unit of work.
//! - [`ItemOutcome`] — Per-item status and pool-relative timing.
//! - [`RunSummary`] — Aggregate counts and wall time.

use chainor_core::ChainorResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{info, warn};

type BoxedWork = Pin<Box<dyn Future<Output = ChainorResult<String>> + Send>>;

/// A named, independent unit of work.
pub struct WorkItem {
    name: String,
    work: BoxedWork,
}

impl WorkItem {
    pub fn new(
        name: impl Into<String>,
        work: impl Future<Output = ChainorResult<String>> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            work: Box::pin(work),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// How one work item ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Success { result: String },
    Failed { error: String },
}

/// Outcome of one work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    #[serde(flatten)]
    pub status: ItemStatus,
    /// Elapsed time measured from pool start, not item dispatch.
    pub elapsed: Duration,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ItemStatus::Success { .. })
    }
}

/// Aggregate summary of one fan-out run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Per-name outcomes plus the aggregate summary.
#[derive(Debug)]
pub struct RunReport {
    pub outcomes: HashMap<String, ItemOutcome>,
    pub summary: RunSummary,
}

impl RunReport {
    /// Convenience accessor for a successful item's result text.
    pub fn result_of(&self, name: &str) -> Option<&str> {
        match self.outcomes.get(name)?.status {
            ItemStatus::Success { ref result } => Some(result),
            ItemStatus::Failed { .. } => None,
        }
    }
}

/// Semaphore-bounded parallel executor for independent tasks.
pub struct ConcurrentRunner {
    max_workers: usize,
}

impl Default for ConcurrentRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentRunner {
    /// Create a runner with the default pool width of 3.
    pub fn new() -> Self {
        Self { max_workers: 3 }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Run all items, collecting outcomes as they complete.
    ///
    /// Every item is submitted at once; the semaphore bounds how many run
    /// concurrently. A failing (or panicking) item resolves to a failed
    /// outcome without cancelling siblings.
    pub async fn run(&self, items: Vec<WorkItem>) -> RunReport {
        let start = Instant::now();
        let total = items.len();
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut set = JoinSet::new();
        let mut names: HashMap<tokio::task::Id, String> = HashMap::new();

        info!(items = total, max_workers = self.max_workers, "Starting fan-out");

        for item in items {
            let semaphore = semaphore.clone();
            let name = item.name.clone();
            let handle = set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            item.name,
                            ItemOutcome {
                                status: ItemStatus::Failed {
                                    error: "worker pool closed".to_string(),
                                },
                                elapsed: start.elapsed(),
                            },
                        );
                    }
                };
                let status = match item.work.await {
                    Ok(result) => ItemStatus::Success { result },
                    Err(e) => ItemStatus::Failed {
                        error: e.to_string(),
                    },
                };
                (
                    item.name,
                    ItemOutcome {
                        status,
                        elapsed: start.elapsed(),
                    },
                )
            });
            names.insert(handle.id(), name);
        }

        let mut outcomes = HashMap::with_capacity(total);
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, (name, outcome))) => {
                    names.remove(&id);
                    match &outcome.status {
                        ItemStatus::Success { .. } => {
                            info!(item = %name, elapsed_ms = outcome.elapsed.as_millis() as u64, "Item completed");
                        }
                        ItemStatus::Failed { error } => {
                            warn!(item = %name, error = %error, "Item failed");
                        }
                    }
                    outcomes.insert(name, outcome);
                }
                Err(join_err) => {
                    // A panicking item still yields an outcome for its name.
                    let name = names
                        .remove(&join_err.id())
                        .unwrap_or_else(|| "unknown".to_string());
                    warn!(item = %name, error = %join_err, "Item panicked");
                    outcomes.insert(
                        name,
                        ItemOutcome {
                            status: ItemStatus::Failed {
                                error: join_err.to_string(),
                            },
                            elapsed: start.elapsed(),
                        },
                    );
                }
            }
        }

        let succeeded = outcomes.values().filter(|o| o.is_success()).count();
        let summary = RunSummary {
            total,
            succeeded,
            failed: total - succeeded,
            elapsed: start.elapsed(),
        };
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Fan-out complete"
        );

        RunReport { outcomes, summary }
    }
}
