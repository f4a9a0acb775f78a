use chainor_context::{ChainConfig, ChainRunner, CompletedStep, ContextManager, ExhaustionReport};
use chainor_core::{AgentExecutor, ChainorResult, Evaluator};
use chainor_feedback::{FeedbackLog, Optimizer};
use chainor_retry::{RetryHandler, RetryHistory, RetryOutcome};
use chainor_routing::{Classification, Classifier, ClassifierConfig, Plan, RouteConfig, Router};
use chainor_runner::{ConcurrentRunner, RunReport, WorkItem};
use chainor_store::{BlobStore, ResultCache};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Structured result of one [`Engine::run`] call.
///
/// Retry exhaustion is data, not an error: a failed chain still reports
/// its classification, plan, and completed steps. `Err` is reserved for
/// infrastructure failures such as an unreachable store.
#[derive(Debug, Serialize)]
pub struct EngineOutcome {
    pub classification: Classification,
    pub plan: Plan,
    pub steps: Vec<CompletedStep>,
    pub failure: Option<ExhaustionReport>,
    /// Evaluator score for the final result, when one was produced.
    pub score: Option<f64>,
    /// Final result text, present iff the chain completed.
    pub result: Option<String>,
    /// True when the result came from the cache and no chain ran.
    pub cached: bool,
}

impl EngineOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// The classify → route → chain → learn loop.
pub struct Engine {
    classifier: Classifier,
    router: Router,
    store: Arc<dyn BlobStore>,
    executor: Arc<dyn AgentExecutor>,
    evaluator: Option<Arc<dyn Evaluator>>,
    cache: ResultCache,
    history: RetryHistory,
    retry: RetryHandler,
    chain_config: ChainConfig,
    runner: ConcurrentRunner,
}

impl Engine {
    /// Build an engine with default keyword tables, routing tables, and
    /// retry policy.
    pub fn new(store: Arc<dyn BlobStore>, executor: Arc<dyn AgentExecutor>) -> ChainorResult<Self> {
        Ok(Self {
            classifier: Classifier::new(ClassifierConfig::default())?,
            router: Router::new(RouteConfig::default())?,
            cache: ResultCache::new(store.clone()),
            history: RetryHistory::new(store.clone()),
            store,
            executor,
            evaluator: None,
            retry: RetryHandler::new(3),
            chain_config: ChainConfig::default(),
            runner: ConcurrentRunner::new(),
        })
    }

    /// Attach the result-scoring collaborator. Without one, results are
    /// never scored and the optimizer never learns.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_retry(mut self, retry: RetryHandler) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_chain_config(mut self, config: ChainConfig) -> Self {
        self.chain_config = config;
        self
    }

    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_runner(mut self, runner: ConcurrentRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Run one task end to end.
    pub async fn run(&self, task: &str) -> ChainorResult<EngineOutcome> {
        let classification = self.classifier.classify(task);
        let workflow = classification.workflow_group.to_string();
        let task_type = classification.task_type.to_string();

        let optimizer = Optimizer::new(self.store.clone(), &workflow);
        let insight = optimizer.best_for(&task_type).await;
        let plan = self.router.route(&classification, insight.as_ref());

        if let Some(result) = self.cache.get(&workflow, task).await? {
            info!(workflow = %workflow, "Returning cached result");
            return Ok(EngineOutcome {
                classification,
                plan,
                steps: Vec::new(),
                failure: None,
                score: None,
                result: Some(result),
                cached: true,
            });
        }

        let manager = ContextManager::new(self.store.clone(), &workflow);
        let chain = ChainRunner::new(manager, self.retry.clone())
            .with_config(self.chain_config.clone());
        let outcome = chain.run_chain(&plan, task, self.executor.as_ref()).await?;

        if let Some(report) = outcome.failure {
            self.history
                .record(
                    &workflow,
                    &RetryOutcome::Exhausted {
                        agent: report.last_agent.clone(),
                        error_type: report.error_type,
                        attempts: report.attempts.clone(),
                        strategies: report.strategies.clone(),
                    },
                )
                .await?;
            return Ok(EngineOutcome {
                classification,
                plan,
                steps: outcome.results,
                failure: Some(report),
                score: None,
                result: None,
                cached: false,
            });
        }

        let result = outcome
            .results
            .last()
            .map(|step| step.result.clone())
            .unwrap_or_default();

        let score = self.score_and_record(&optimizer, task, &task_type, &plan, &result).await;
        self.cache.set(&workflow, task, &result).await?;

        info!(
            workflow = %workflow,
            steps = outcome.results.len(),
            score = score.unwrap_or(-1.0),
            "Run complete"
        );
        Ok(EngineOutcome {
            classification,
            plan,
            steps: outcome.results,
            failure: None,
            score,
            result: Some(result),
            cached: false,
        })
    }

    /// Run pre-decomposed independent items on the bounded worker pool.
    pub async fn run_parallel(&self, items: Vec<WorkItem>) -> RunReport {
        self.runner.run(items).await
    }

    /// Optimizer advisories for one workflow's accumulated statistics.
    pub async fn suggestions(&self, workflow: &str) -> Vec<String> {
        Optimizer::new(self.store.clone(), workflow)
            .suggest_improvements()
            .await
    }

    /// The user rating log for one workflow, backed by the engine's store.
    pub fn feedback_log(&self, workflow: &str) -> FeedbackLog {
        FeedbackLog::new(self.store.clone(), workflow)
    }

    /// Score a completed result and feed the score into the optimizer.
    ///
    /// Evaluation is best-effort: a failing evaluator (or a failing stats
    /// write) skips learning but never fails the run.
    async fn score_and_record(
        &self,
        optimizer: &Optimizer,
        task: &str,
        task_type: &str,
        plan: &Plan,
        result: &str,
    ) -> Option<f64> {
        let evaluator = self.evaluator.as_ref()?;
        match evaluator.evaluate(task, result).await {
            Ok(score) => {
                if let Err(e) = optimizer.record(&plan.agents, task_type, score).await {
                    warn!(error = %e, "Failed to record score");
                }
                Some(score)
            }
            Err(e) => {
                warn!(error = %e, "Evaluation failed, skipping scoring");
                None
            }
        }
    }
}
