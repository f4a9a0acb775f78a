//! End-to-end pipeline test.
//!
//! Drives the full classify → route → chain → evaluate → learn loop with
//! mock backends. Checks: plan selection, prompt folding across steps,
//! caching, retry exhaustion reporting, and optimizer-biased routing.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use chainor_core::{AgentExecutor, ChainorError, ChainorResult, Evaluator};
use chainor_engine::Engine;
use chainor_feedback::Optimizer;
use chainor_retry::{ErrorKind, RetryHandler};
use chainor_runner::WorkItem;
use chainor_store::{BlobStore, FileBlobStore, MemoryBlobStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Mock collaborators
// ---------------------------------------------------------------------------

/// Echoes a deterministic per-agent response and counts invocations.
struct MockExecutor {
    calls: AtomicUsize,
    fail_with: Option<String>,
}

impl MockExecutor {
    fn healthy() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_with: None,
        }
    }

    fn failing(error: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_with: Some(error.to_string()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentExecutor for MockExecutor {
    async fn execute(&self, agent_id: &str, _prompt: &str) -> ChainorResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(error) => Err(ChainorError::Execution(error.clone())),
            None => Ok(format!("{agent_id} 的产出")),
        }
    }
}

struct FixedEvaluator {
    score: f64,
}

#[async_trait]
impl Evaluator for FixedEvaluator {
    async fn evaluate(&self, _task: &str, _result: &str) -> ChainorResult<f64> {
        Ok(self.score)
    }
}

struct BrokenEvaluator;

#[async_trait]
impl Evaluator for BrokenEvaluator {
    async fn evaluate(&self, _task: &str, _result: &str) -> ChainorResult<f64> {
        Err(ChainorError::Evaluation("scorer offline".into()))
    }
}

fn fast_retry() -> RetryHandler {
    RetryHandler::new(3).with_backoff_unit(Duration::from_millis(1))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_simple_task_runs_full_pipeline() {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let executor = Arc::new(MockExecutor::healthy());
    let engine = Engine::new(store, executor.clone())
        .unwrap()
        .with_retry(fast_retry())
        .with_evaluator(Arc::new(FixedEvaluator { score: 88.0 }));

    let outcome = engine.run("写一句话介绍AI").await.unwrap();

    assert!(outcome.is_complete());
    assert!(!outcome.cached);
    // A short writing task takes the two-agent fast path.
    assert_eq!(outcome.plan.agents, vec!["m25", "dsr"]);
    assert_eq!(outcome.steps.len(), 2);
    assert_eq!(outcome.result.as_deref(), Some("dsr 的产出"));
    assert_eq!(outcome.score, Some(88.0));
    assert_eq!(executor.calls(), 2);
}

#[tokio::test]
async fn test_second_run_hits_cache() {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let executor = Arc::new(MockExecutor::healthy());
    let engine = Engine::new(store, executor.clone())
        .unwrap()
        .with_retry(fast_retry());

    let first = engine.run("写一句话介绍AI").await.unwrap();
    let second = engine.run("写一句话介绍AI").await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(second.result, first.result);
    assert!(second.steps.is_empty());
    // No new backend calls for the cached run.
    assert_eq!(executor.calls(), 2);
}

#[tokio::test]
async fn test_exhaustion_surfaces_as_data() {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let executor = Arc::new(MockExecutor::failing("request timeout"));
    let engine = Engine::new(store.clone(), executor)
        .unwrap()
        .with_retry(fast_retry());

    let outcome = engine.run("写一句话介绍AI").await.unwrap();

    assert!(!outcome.is_complete());
    assert!(outcome.result.is_none());
    assert!(outcome.score.is_none());
    let failure = outcome.failure.unwrap();
    assert_eq!(failure.step_index, 0);
    assert_eq!(failure.last_agent, "dsr");
    assert_eq!(failure.error_type, ErrorKind::Timeout);
    assert_eq!(failure.attempts.len(), 3);

    // The exhausted outcome lands in the workflow's retry history.
    let history = store.load("retry", "artgroup_history").await.unwrap();
    assert!(history.is_some());
}

#[tokio::test]
async fn test_failed_run_is_not_cached() {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let engine = Engine::new(store.clone(), Arc::new(MockExecutor::failing("api 错误")))
        .unwrap()
        .with_retry(fast_retry());
    engine.run("写一句话介绍AI").await.unwrap();

    // A healthy engine over the same store must re-execute, not replay.
    let executor = Arc::new(MockExecutor::healthy());
    let engine = Engine::new(store, executor.clone())
        .unwrap()
        .with_retry(fast_retry());
    let outcome = engine.run("写一句话介绍AI").await.unwrap();

    assert!(!outcome.cached);
    assert!(outcome.is_complete());
    assert!(executor.calls() > 0);
}

#[tokio::test]
async fn test_strong_history_overrides_canonical_plan() {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());

    // Seed three high scores for a non-canonical combination.
    let optimizer = Optimizer::new(store.clone(), "artgroup");
    for score in [95.0, 92.0, 94.0] {
        optimizer
            .record(&["solo".to_string()], "write", score)
            .await
            .unwrap();
    }

    let engine = Engine::new(store, Arc::new(MockExecutor::healthy()))
        .unwrap()
        .with_retry(fast_retry());
    let outcome = engine.run("写一句话介绍AI").await.unwrap();

    assert_eq!(outcome.plan.agents, vec!["solo"]);
    assert_eq!(outcome.result.as_deref(), Some("solo 的产出"));
}

#[tokio::test]
async fn test_weak_history_does_not_override() {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());

    // Two samples are below the confidence gate even with high scores.
    let optimizer = Optimizer::new(store.clone(), "artgroup");
    optimizer.record(&["solo".to_string()], "write", 99.0).await.unwrap();
    optimizer.record(&["solo".to_string()], "write", 99.0).await.unwrap();

    let engine = Engine::new(store, Arc::new(MockExecutor::healthy()))
        .unwrap()
        .with_retry(fast_retry());
    let outcome = engine.run("写一句话介绍AI").await.unwrap();

    assert_eq!(outcome.plan.agents, vec!["m25", "dsr"]);
}

#[tokio::test]
async fn test_broken_evaluator_skips_scoring_but_completes() {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let engine = Engine::new(store.clone(), Arc::new(MockExecutor::healthy()))
        .unwrap()
        .with_retry(fast_retry())
        .with_evaluator(Arc::new(BrokenEvaluator));

    let outcome = engine.run("写一句话介绍AI").await.unwrap();

    assert!(outcome.is_complete());
    assert!(outcome.score.is_none());
    // No score was recorded for the combination.
    let optimizer = Optimizer::new(store, "artgroup");
    assert!(optimizer.best_combination().await.is_none());
}

#[tokio::test]
async fn test_scores_accumulate_across_runs() {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let engine = Engine::new(store.clone(), Arc::new(MockExecutor::healthy()))
        .unwrap()
        .with_retry(fast_retry())
        .with_evaluator(Arc::new(FixedEvaluator { score: 75.0 }));

    engine.run("写一句话介绍AI").await.unwrap();
    engine.run("写两句话介绍ML").await.unwrap();

    let optimizer = Optimizer::new(store, "artgroup");
    let (combo, mean) = optimizer.best_combination().await.unwrap();
    assert_eq!(combo, "m25+dsr");
    assert!((mean - 75.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_run_parallel_delegates_to_pool() {
    let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let engine = Engine::new(store, Arc::new(MockExecutor::healthy())).unwrap();

    let report = engine
        .run_parallel(vec![
            WorkItem::new("a", async { Ok("ra".to_string()) }),
            WorkItem::new("b", async { Ok("rb".to_string()) }),
        ])
        .await;

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(report.result_of("a"), Some("ra"));
}

#[tokio::test]
async fn test_pipeline_over_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn BlobStore> =
        Arc::new(FileBlobStore::new(dir.path().to_path_buf()).await.unwrap());
    let engine = Engine::new(store.clone(), Arc::new(MockExecutor::healthy()))
        .unwrap()
        .with_retry(fast_retry());

    let outcome = engine.run("写一句话介绍AI").await.unwrap();
    assert!(outcome.is_complete());

    // Context and cache blobs land on disk under their namespaces.
    assert!(!store.list("context").await.unwrap().is_empty());
    assert!(!store.list("cache").await.unwrap().is_empty());
}
