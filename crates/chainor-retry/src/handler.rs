use crate::fallback::{classify_error, ErrorKind, FallbackConfig};
use chainor_core::{truncate_chars, AgentExecutor};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Maximum length of error text recorded per attempt.
const ERROR_EXCERPT_CHARS: usize = 100;

/// One recorded failure within a retry session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-based attempt index.
    pub attempt: u32,
    /// Agent used for this attempt.
    pub agent: String,
    /// Truncated error text.
    pub error: String,
    pub error_type: ErrorKind,
}

/// Structured result of a retried invocation.
///
/// Only failed attempts appear in the trail; a success on attempt N carries
/// N-1 recorded attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetryOutcome {
    Success {
        /// The agent that actually produced the result (may be a substitute).
        agent: String,
        result: String,
        attempts: Vec<RetryAttempt>,
    },
    Exhausted {
        /// The agent the final attempt ran on.
        agent: String,
        /// Classification of the last failure.
        error_type: ErrorKind,
        attempts: Vec<RetryAttempt>,
        /// Suggested remediation, looked up from the static strategy table.
        strategies: Vec<String>,
    },
}

impl RetryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success { .. })
    }

    pub fn attempts(&self) -> &[RetryAttempt] {
        match self {
            RetryOutcome::Success { attempts, .. } => attempts,
            RetryOutcome::Exhausted { attempts, .. } => attempts,
        }
    }
}

/// Bounded retry loop with agent substitution and linear backoff.
#[derive(Debug, Clone)]
pub struct RetryHandler {
    max_retries: u32,
    backoff_unit: Duration,
    fallback: FallbackConfig,
}

impl Default for RetryHandler {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryHandler {
    /// Create a handler with the default 2-second backoff unit.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_unit: Duration::from_secs(2),
            fallback: FallbackConfig::default(),
        }
    }

    /// Override the backoff unit (tests use milliseconds).
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackConfig) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Execute one prompt with up to `max_retries` attempts.
    ///
    /// On failure the error is classified, a substitute for the *original*
    /// agent is selected, and the loop waits `attempt × backoff_unit`
    /// before trying again (no jitter, no cap). Never returns an error:
    /// exhaustion resolves to [`RetryOutcome::Exhausted`].
    pub async fn execute(
        &self,
        agent: &str,
        prompt: &str,
        executor: &dyn AgentExecutor,
    ) -> RetryOutcome {
        let mut attempts = Vec::new();
        let mut current = agent.to_string();
        let mut last_kind = ErrorKind::Unknown;

        for attempt in 0..self.max_retries {
            info!(
                attempt = attempt + 1,
                max = self.max_retries,
                agent = %current,
                "Invoking agent"
            );

            match executor.execute(&current, prompt).await {
                Ok(result) => {
                    return RetryOutcome::Success {
                        agent: current,
                        result,
                        attempts,
                    };
                }
                Err(e) => {
                    let message = e.to_string();
                    last_kind = classify_error(&message);
                    warn!(
                        attempt = attempt + 1,
                        agent = %current,
                        error_type = %last_kind,
                        error = %message,
                        "Agent invocation failed"
                    );
                    attempts.push(RetryAttempt {
                        attempt: attempt + 1,
                        agent: current.clone(),
                        error: truncate_chars(&message, ERROR_EXCERPT_CHARS).to_string(),
                        error_type: last_kind,
                    });

                    // Substitution always derives from the original agent.
                    current = self.fallback.alternate_for(agent, last_kind);

                    if attempt + 1 < self.max_retries {
                        let wait = self.backoff_unit * (attempt + 1);
                        info!(wait_ms = wait.as_millis() as u64, "Backing off before retry");
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        let last_agent = attempts
            .last()
            .map(|a| a.agent.clone())
            .unwrap_or_else(|| agent.to_string());
        RetryOutcome::Exhausted {
            agent: last_agent,
            error_type: last_kind,
            attempts,
            strategies: self.fallback.strategies_for(last_kind),
        }
    }
}
