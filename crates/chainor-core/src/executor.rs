use crate::ChainorResult;
use async_trait::async_trait;

/// The external text-generation backend, treated as an opaque worker.
///
/// Implementations wrap whatever actually produces text for an agent id
/// (an HTTP API, a local process, a mock in tests). Failures are reported
/// as errors; the retry controller is the only component expected to
/// handle them.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Execute one prompt against the named agent and return its raw output.
    async fn execute(&self, agent_id: &str, prompt: &str) -> ChainorResult<String>;
}

/// The external scoring collaborator feeding the optimizer.
///
/// May itself fail; a failed evaluation simply means no sample is recorded.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Score a result for a task on a 0–100 scale.
    async fn evaluate(&self, task: &str, result: &str) -> ChainorResult<f64>;
}
