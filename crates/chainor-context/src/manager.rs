use crate::context::{ExecutionContext, Step};
use chainor_core::ChainorResult;
use chainor_store::BlobStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const CONTEXT_NAMESPACE: &str = "context";

/// Store-backed lifecycle for execution contexts.
///
/// Every mutation persists write-through; contexts are never deleted
/// automatically. Each context is logically owned by exactly one in-flight
/// chain, so there is no locking around the read-modify-write.
pub struct ContextManager {
    store: Arc<dyn BlobStore>,
    workflow: String,
}

impl ContextManager {
    pub fn new(store: Arc<dyn BlobStore>, workflow: impl Into<String>) -> Self {
        Self {
            store,
            workflow: workflow.into(),
        }
    }

    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    /// Allocate and persist a new context for a task.
    pub async fn create(&self, task: &str) -> ChainorResult<ExecutionContext> {
        let id = format!("{}_{}", self.workflow, Uuid::new_v4());
        let ctx = ExecutionContext::new(&id, task);
        self.persist(&ctx).await?;
        debug!(context = %id, "Created execution context");
        Ok(ctx)
    }

    /// Reload a persisted context.
    ///
    /// A missing or unreadable blob degrades to `None` ("no history")
    /// rather than aborting; the caller decides whether to start fresh.
    pub async fn load(&self, id: &str) -> Option<ExecutionContext> {
        match self.store.load(CONTEXT_NAMESPACE, id).await {
            Ok(Some(blob)) => match serde_json::from_value::<ExecutionContext>(blob) {
                Ok(mut ctx) => {
                    ctx.id = id.to_string();
                    Some(ctx)
                }
                Err(e) => {
                    warn!(context = %id, error = %e, "Unreadable context blob");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(context = %id, error = %e, "Context store unavailable");
                None
            }
        }
    }

    /// Append a step and persist.
    pub async fn add_step(
        &self,
        ctx: &mut ExecutionContext,
        agent: &str,
        result: &str,
        metadata: HashMap<String, String>,
    ) -> ChainorResult<Step> {
        let step = ctx.add_step(agent, result, metadata);
        self.persist(ctx).await?;
        Ok(step)
    }

    /// Upsert a shared value and persist.
    pub async fn share(
        &self,
        ctx: &mut ExecutionContext,
        key: &str,
        value: &str,
    ) -> ChainorResult<()> {
        ctx.share(key, value);
        self.persist(ctx).await
    }

    /// Remove a persisted context (caller-initiated purge).
    pub async fn purge(&self, id: &str) -> ChainorResult<()> {
        self.store.delete(CONTEXT_NAMESPACE, id).await
    }

    /// Ids of all persisted contexts belonging to this workflow.
    pub async fn list(&self) -> ChainorResult<Vec<String>> {
        let prefix = format!("{}_", self.workflow);
        Ok(self
            .store
            .list(CONTEXT_NAMESPACE)
            .await?
            .into_iter()
            .filter(|id| id.starts_with(&prefix))
            .collect())
    }

    async fn persist(&self, ctx: &ExecutionContext) -> ChainorResult<()> {
        self.store
            .save(CONTEXT_NAMESPACE, &ctx.id, &serde_json::to_value(ctx)?)
            .await
    }
}
