use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{QueueEntry, QueueStore};
use crate::error::ClientError;

/// Queue store that lives only as long as the process. Used in tests and
/// by clients that opt out of persistence.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    entries: Mutex<Vec<QueueEntry>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<QueueEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn load(&self) -> Result<Vec<QueueEntry>, ClientError> {
        Ok(self.entries.lock().await.clone())
    }

    async fn save(&self, entries: &[QueueEntry]) -> Result<(), ClientError> {
        *self.entries.lock().await = entries.to_vec();
        Ok(())
    }
}
