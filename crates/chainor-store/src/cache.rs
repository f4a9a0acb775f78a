use crate::store::BlobStore;
use chainor_core::ChainorResult;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

const CACHE_NAMESPACE: &str = "cache";

/// A cached task result.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    task: String,
    result: String,
    created: DateTime<Utc>,
}

/// TTL cache of finished task results, keyed by workflow + task hash.
///
/// Avoids re-running a chain for a task the workflow has already answered.
/// Expired entries are deleted on read.
pub struct ResultCache {
    store: Arc<dyn BlobStore>,
    ttl: Duration,
}

impl ResultCache {
    /// Create a cache with the default 24-hour TTL.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_ttl(store, Duration::hours(24))
    }

    pub fn with_ttl(store: Arc<dyn BlobStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Cache key: first 16 hex chars of sha256("{workflow}:{task}").
    fn key(workflow: &str, task: &str) -> String {
        let digest = Sha256::digest(format!("{workflow}:{task}").as_bytes());
        hex::encode(digest)[..16].to_string()
    }

    fn id(workflow: &str, task: &str) -> String {
        format!("{workflow}_{}", Self::key(workflow, task))
    }

    /// Look up a fresh cached result for this task, if any.
    pub async fn get(&self, workflow: &str, task: &str) -> ChainorResult<Option<String>> {
        let id = Self::id(workflow, task);
        let Some(blob) = self.store.load(CACHE_NAMESPACE, &id).await? else {
            return Ok(None);
        };
        let entry: CacheEntry = match serde_json::from_value(blob) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(id = %id, error = %e, "Discarding unreadable cache entry");
                self.store.delete(CACHE_NAMESPACE, &id).await?;
                return Ok(None);
            }
        };
        if Utc::now() - entry.created < self.ttl {
            debug!(workflow = %workflow, id = %id, "Cache hit");
            Ok(Some(entry.result))
        } else {
            self.store.delete(CACHE_NAMESPACE, &id).await?;
            Ok(None)
        }
    }

    /// Store a result for this task.
    pub async fn set(&self, workflow: &str, task: &str, result: &str) -> ChainorResult<()> {
        let entry = CacheEntry {
            task: task.to_string(),
            result: result.to_string(),
            created: Utc::now(),
        };
        let id = Self::id(workflow, task);
        self.store
            .save(CACHE_NAMESPACE, &id, &serde_json::to_value(&entry)?)
            .await
    }

    /// Drop all cached entries, or only those of one workflow.
    pub async fn clear(&self, workflow: Option<&str>) -> ChainorResult<()> {
        for id in self.store.list(CACHE_NAMESPACE).await? {
            let matches = match workflow {
                Some(wf) => id.starts_with(&format!("{wf}_")),
                None => true,
            };
            if matches {
                self.store.delete(CACHE_NAMESPACE, &id).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;

    fn cache_over_memory(ttl: Duration) -> ResultCache {
        ResultCache::with_ttl(Arc::new(MemoryBlobStore::new()), ttl)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = cache_over_memory(Duration::hours(1));
        assert!(cache.get("artgroup", "写文章").await.unwrap().is_none());

        cache.set("artgroup", "写文章", "一篇文章").await.unwrap();
        let hit = cache.get("artgroup", "写文章").await.unwrap();
        assert_eq!(hit.as_deref(), Some("一篇文章"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let cache = cache_over_memory(Duration::zero());
        cache.set("artgroup", "task", "result").await.unwrap();
        assert!(cache.get("artgroup", "task").await.unwrap().is_none());
        // A second read still misses (the entry was deleted, not just skipped).
        assert!(cache.get("artgroup", "task").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_workflows_do_not_collide() {
        let cache = cache_over_memory(Duration::hours(1));
        cache.set("artgroup", "task", "art result").await.unwrap();
        assert!(cache.get("devgroup", "task").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_single_workflow() {
        let cache = cache_over_memory(Duration::hours(1));
        cache.set("artgroup", "a", "1").await.unwrap();
        cache.set("devgroup", "b", "2").await.unwrap();

        cache.clear(Some("artgroup")).await.unwrap();
        assert!(cache.get("artgroup", "a").await.unwrap().is_none());
        assert_eq!(cache.get("devgroup", "b").await.unwrap().as_deref(), Some("2"));
    }
}
