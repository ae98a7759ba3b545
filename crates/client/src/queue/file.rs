use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{QueueEntry, QueueStore};
use crate::error::ClientError;

/// Queue store backed by a JSON file.
///
/// Saves write a sibling temp file and rename it over the queue file, so a
/// crash never leaves a half-written queue.
#[derive(Debug, Clone)]
pub struct FileQueueStore {
    path: PathBuf,
}

impl FileQueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl QueueStore for FileQueueStore {
    async fn load(&self) -> Result<Vec<QueueEntry>, ClientError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, entries: &[QueueEntry]) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::PendingOperation;
    use crate::queue::OfflineQueue;

    #[tokio::test]
    async fn missing_file_is_an_empty_queue() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileQueueStore::new(dir.path().join("queue.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn queue_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("queue.json");

        let queue = OfflineQueue::open(FileQueueStore::new(&path)).await.unwrap();
        for action_id in [1, 2] {
            queue
                .enqueue_operation(&PendingOperation::DeleteAction { action_id })
                .await
                .unwrap();
        }
        let before = queue.entries().await;
        drop(queue);

        let reopened = OfflineQueue::open(FileQueueStore::new(&path)).await.unwrap();
        assert_eq!(reopened.entries().await, before);
        assert!(!path.with_file_name("queue.json.tmp").exists());
    }

    #[tokio::test]
    async fn ack_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");

        let queue = OfflineQueue::open(FileQueueStore::new(&path)).await.unwrap();
        let id = queue
            .enqueue_operation(&PendingOperation::DeleteAction { action_id: 1 })
            .await
            .unwrap();
        queue.ack(id).await.unwrap();

        let reopened = OfflineQueue::open(FileQueueStore::new(&path)).await.unwrap();
        assert!(reopened.is_empty().await);
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let result = FileQueueStore::new(&path).load().await;
        assert!(matches!(result, Err(ClientError::Serialization(_))));
    }
}
