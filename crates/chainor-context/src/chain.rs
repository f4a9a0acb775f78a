use crate::context::ExecutionContext;
use crate::manager::ContextManager;
use chainor_core::{truncate_chars, AgentExecutor, ChainorResult};
use chainor_retry::{ErrorKind, RetryAttempt, RetryHandler, RetryOutcome};
use chainor_routing::Plan;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info};

/// A substring rule that copies a result excerpt into the shared map.
#[derive(Debug, Clone)]
pub struct ShareTrigger {
    /// Substring to look for in a step result.
    pub pattern: String,
    /// Well-known shared key the excerpt lands under.
    pub key: String,
}

/// Chain execution configuration.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Ordered trigger rules scanned after every successful step.
    pub triggers: Vec<ShareTrigger>,
    /// Length of the excerpt written to the shared map.
    pub excerpt_chars: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        let trigger = |pattern: &str, key: &str| ShareTrigger {
            pattern: pattern.to_string(),
            key: key.to_string(),
        };
        Self {
            triggers: vec![trigger("方案", "last_plan"), trigger("代码", "last_code")],
            excerpt_chars: 200,
        }
    }
}

/// One successfully completed chain step, with the full (untruncated)
/// result and the agent that actually produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedStep {
    pub agent: String,
    pub result: String,
}

/// Why a chain aborted: one step exhausted its retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExhaustionReport {
    /// Agent the plan scheduled for the failed step.
    pub agent: String,
    /// Agent the final attempt actually ran on (may be a substitute).
    pub last_agent: String,
    /// Zero-based index of the failed step.
    pub step_index: usize,
    pub error_type: ErrorKind,
    pub attempts: Vec<RetryAttempt>,
    pub strategies: Vec<String>,
}

/// Result of one chain run. A failed chain still carries every completed
/// step and the partial context, so callers can present partial output.
#[derive(Debug)]
pub struct ChainOutcome {
    pub results: Vec<CompletedStep>,
    pub context: ExecutionContext,
    pub failure: Option<ExhaustionReport>,
}

impl ChainOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// The final step's result, when the chain completed.
    pub fn final_result(&self) -> Option<&str> {
        if self.is_complete() {
            self.results.last().map(|s| s.result.as_str())
        } else {
            None
        }
    }
}

/// Drives one plan sequentially: each step's prompt depends on all prior
/// steps, every invocation goes through the retry controller.
pub struct ChainRunner {
    manager: ContextManager,
    retry: RetryHandler,
    config: ChainConfig,
}

impl ChainRunner {
    pub fn new(manager: ContextManager, retry: RetryHandler) -> Self {
        Self {
            manager,
            retry,
            config: ChainConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn manager(&self) -> &ContextManager {
        &self.manager
    }

    /// Execute a plan's agents in order against one fresh context.
    ///
    /// Step 0 receives the raw task; later steps receive the folded
    /// prompt. Exhausted retries abort the chain with the partial context
    /// retained. Errors surface only for persistence failures.
    pub async fn run_chain(
        &self,
        plan: &Plan,
        task: &str,
        executor: &dyn AgentExecutor,
    ) -> ChainorResult<ChainOutcome> {
        let mut ctx = self.manager.create(task).await?;
        let mut results = Vec::new();

        info!(
            workflow = %self.manager.workflow(),
            context = %ctx.id,
            agents = plan.agents.len(),
            "Starting chain"
        );

        for (index, agent) in plan.agents.iter().enumerate() {
            let prompt = if index == 0 {
                task.to_string()
            } else {
                ctx.build_prompt(task)
            };

            match self.retry.execute(agent, &prompt, executor).await {
                RetryOutcome::Success {
                    agent: used,
                    result,
                    ..
                } => {
                    // The step records the agent actually used, which may be
                    // a substitute.
                    self.manager
                        .add_step(&mut ctx, &used, &result, HashMap::new())
                        .await?;
                    self.apply_triggers(&mut ctx, &result).await?;
                    info!(step = index, agent = %used, "Chain step completed");
                    results.push(CompletedStep {
                        agent: used,
                        result,
                    });
                }
                RetryOutcome::Exhausted {
                    agent: last_agent,
                    error_type,
                    attempts,
                    strategies,
                } => {
                    error!(
                        step = index,
                        agent = %agent,
                        last_agent = %last_agent,
                        error_type = %error_type,
                        "Chain aborted: retries exhausted"
                    );
                    return Ok(ChainOutcome {
                        results,
                        context: ctx,
                        failure: Some(ExhaustionReport {
                            agent: agent.clone(),
                            last_agent,
                            step_index: index,
                            error_type,
                            attempts,
                            strategies,
                        }),
                    });
                }
            }
        }

        info!(context = %ctx.id, steps = results.len(), "Chain complete");
        Ok(ChainOutcome {
            results,
            context: ctx,
            failure: None,
        })
    }

    async fn apply_triggers(
        &self,
        ctx: &mut ExecutionContext,
        result: &str,
    ) -> ChainorResult<()> {
        for trigger in &self.config.triggers {
            if result.contains(trigger.pattern.as_str()) {
                let excerpt = truncate_chars(result, self.config.excerpt_chars);
                self.manager.share(ctx, &trigger.key, excerpt).await?;
            }
        }
        Ok(())
    }
}
