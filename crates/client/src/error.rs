/// Errors from the fleet client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (connect, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("Fleet API error ({status}): {body}")]
    Server { status: u16, body: String },

    /// Reading or writing the queue file failed.
    #[error("Offline queue I/O failed: {0}")]
    QueueIo(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A queue entry names an operation this client cannot replay.
    #[error("Unsupported queue entry: {entry_type}/{operation}")]
    UnsupportedOperation {
        entry_type: String,
        operation: String,
    },

    /// `ack` was called for an entry that is not at the head of the queue.
    #[error("Entry {0} is not at the head of the offline queue")]
    NotAtHead(uuid::Uuid),

    /// Another drain of the same queue is running.
    #[error("Offline queue is already draining")]
    DrainInProgress,
}

impl ClientError {
    /// `true` when the server could not be reached at all, so the operation
    /// should be queued instead of reported.
    pub fn is_offline(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout(),
            Self::Server { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }
}
