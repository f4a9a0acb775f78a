use crate::handler::RetryOutcome;
use chainor_core::ChainorResult;
use chainor_store::BlobStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

const HISTORY_NAMESPACE: &str = "retry";
/// Only the most recent outcomes are retained.
const HISTORY_CAP: usize = 100;

/// One persisted retry outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: DateTime<Utc>,
    pub result: RetryOutcome,
}

/// Append-style log of retry outcomes per workflow, capped at the most
/// recent 100 entries.
pub struct RetryHistory {
    store: Arc<dyn BlobStore>,
}

impl RetryHistory {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    fn id(workflow: &str) -> String {
        format!("{workflow}_history")
    }

    async fn load(&self, workflow: &str) -> Vec<HistoryEntry> {
        let id = Self::id(workflow);
        match self.store.load(HISTORY_NAMESPACE, &id).await {
            Ok(Some(blob)) => serde_json::from_value(blob).unwrap_or_else(|e| {
                warn!(workflow = %workflow, error = %e, "Unreadable retry history, starting fresh");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(workflow = %workflow, error = %e, "Retry history unavailable, starting fresh");
                Vec::new()
            }
        }
    }

    /// Append an outcome, dropping entries beyond the cap.
    pub async fn record(&self, workflow: &str, outcome: &RetryOutcome) -> ChainorResult<()> {
        let mut entries = self.load(workflow).await;
        entries.push(HistoryEntry {
            time: Utc::now(),
            result: outcome.clone(),
        });
        if entries.len() > HISTORY_CAP {
            let excess = entries.len() - HISTORY_CAP;
            entries.drain(..excess);
        }
        self.store
            .save(HISTORY_NAMESPACE, &Self::id(workflow), &serde_json::to_value(&entries)?)
            .await
    }

    /// The most recent outcomes, newest last.
    pub async fn recent(&self, workflow: &str, limit: usize) -> Vec<HistoryEntry> {
        let entries = self.load(workflow).await;
        let skip = entries.len().saturating_sub(limit);
        entries.into_iter().skip(skip).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::handler::RetryOutcome;
    use chainor_store::MemoryBlobStore;

    fn success(result: &str) -> RetryOutcome {
        RetryOutcome::Success {
            agent: "m25".into(),
            result: result.into(),
            attempts: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_record_and_recent() {
        let history = RetryHistory::new(Arc::new(MemoryBlobStore::new()));
        history.record("artgroup", &success("one")).await.unwrap();
        history.record("artgroup", &success("two")).await.unwrap();

        let recent = history.recent("artgroup", 5).await;
        assert_eq!(recent.len(), 2);
        match &recent[1].result {
            RetryOutcome::Success { result, .. } => assert_eq!(result, "two"),
            other => panic!("Expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cap_keeps_most_recent_hundred() {
        let history = RetryHistory::new(Arc::new(MemoryBlobStore::new()));
        for i in 0..105 {
            history.record("artgroup", &success(&i.to_string())).await.unwrap();
        }

        let all = history.recent("artgroup", usize::MAX).await;
        assert_eq!(all.len(), 100);
        match &all[0].result {
            RetryOutcome::Success { result, .. } => assert_eq!(result, "5"),
            other => panic!("Expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_workflows_are_separate() {
        let history = RetryHistory::new(Arc::new(MemoryBlobStore::new()));
        history.record("artgroup", &success("a")).await.unwrap();
        assert!(history.recent("devgroup", 5).await.is_empty());
    }
}
