use std::path::PathBuf;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the fleet API (default: `http://localhost:3000`).
    pub api_url: String,
    /// File holding the offline queue (default: `fleet-offline-queue.json`).
    pub queue_path: PathBuf,
    /// Per-request timeout in seconds (default: `15`).
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `FLEET_API_URL`              | `http://localhost:3000`    |
    /// | `FLEET_QUEUE_PATH`           | `fleet-offline-queue.json` |
    /// | `FLEET_REQUEST_TIMEOUT_SECS` | `15`                       |
    pub fn from_env() -> Self {
        let api_url = std::env::var("FLEET_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let queue_path = std::env::var("FLEET_QUEUE_PATH")
            .unwrap_or_else(|_| "fleet-offline-queue.json".into())
            .into();

        let request_timeout_secs: u64 = std::env::var("FLEET_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("FLEET_REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            api_url,
            queue_path,
            request_timeout_secs,
        }
    }
}
