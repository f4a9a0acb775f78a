use async_trait::async_trait;
use chainor_core::{ChainorError, ChainorResult};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Persistence contract for JSON blobs keyed by `(namespace, id)`.
///
/// Last write wins; there is no cross-process locking. Each logical
/// resource is expected to have exactly one in-flight owner.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Load a blob, or `None` if it does not exist.
    async fn load(&self, namespace: &str, id: &str) -> ChainorResult<Option<Value>>;
    /// Save (create or overwrite) a blob.
    async fn save(&self, namespace: &str, id: &str, blob: &Value) -> ChainorResult<()>;
    /// Delete a blob. Deleting a missing blob is not an error.
    async fn delete(&self, namespace: &str, id: &str) -> ChainorResult<()>;
    /// List all blob ids in a namespace.
    async fn list(&self, namespace: &str) -> ChainorResult<Vec<String>>;
}

/// File-based blob store (JSON files on disk). Good enough for MVP.
///
/// Blobs live at `{root}/{namespace}/{id}.json`.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub async fn new(root: PathBuf) -> ChainorResult<Self> {
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn blob_path(&self, namespace: &str, id: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{id}.json"))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn load(&self, namespace: &str, id: &str) -> ChainorResult<Option<Value>> {
        let path = self.blob_path(namespace, id);
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(path).await?;
        let blob: Value = serde_json::from_str(&data)
            .map_err(|e| ChainorError::Store(format!("Failed to parse blob {namespace}/{id}: {e}")))?;
        Ok(Some(blob))
    }

    async fn save(&self, namespace: &str, id: &str, blob: &Value) -> ChainorResult<()> {
        let dir = self.root.join(namespace);
        tokio::fs::create_dir_all(&dir).await?;
        let json = serde_json::to_string_pretty(blob)?;
        tokio::fs::write(self.blob_path(namespace, id), json).await?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, id: &str) -> ChainorResult<()> {
        let path = self.blob_path(namespace, id);
        if path.exists() {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn list(&self, namespace: &str) -> ChainorResult<Vec<String>> {
        let dir = self.root.join(namespace);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(stem) = name.strip_suffix(".json") {
                    ids.push(stem.to_string());
                }
            }
        }
        Ok(ids)
    }
}

/// In-memory blob store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<(String, String), Value>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn load(&self, namespace: &str, id: &str) -> ChainorResult<Option<Value>> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(&(namespace.to_string(), id.to_string())).cloned())
    }

    async fn save(&self, namespace: &str, id: &str, blob: &Value) -> ChainorResult<()> {
        let mut blobs = self.blobs.write().await;
        blobs.insert((namespace.to_string(), id.to_string()), blob.clone());
        Ok(())
    }

    async fn delete(&self, namespace: &str, id: &str) -> ChainorResult<()> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(&(namespace.to_string(), id.to_string()));
        Ok(())
    }

    async fn list(&self, namespace: &str) -> ChainorResult<Vec<String>> {
        let blobs = self.blobs.read().await;
        Ok(blobs
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, id)| id.clone())
            .collect())
    }
}
