//! REST client for the fleet API.
//!
//! Wraps the `/api/v1` endpoints using [`reqwest`]. Every success body is
//! unwrapped from the `{"data": ...}` envelope.

use std::time::Duration;

use async_trait::async_trait;
use fleet_core::action::Action;
use fleet_core::inspection::SubmitInspection;
use fleet_core::lock_registry::{LockRegistry, LockedDefectsResponse};
use fleet_core::submission::SubmissionResult;
use fleet_core::sync::SyncOutcome;
use fleet_core::types::DbId;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::operation::PendingOperation;
use crate::queue::QueueEntry;

/// Header carrying the acting user.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Sends one queued entry to the server.
///
/// `Ok` means the server accepted the operation and the entry may be
/// removed from the queue.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, entry: &QueueEntry) -> Result<(), ClientError>;
}

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: T,
}

/// HTTP client for one fleet API server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    api_url: String,
}

impl ApiClient {
    /// Build a client with the configured base URL and request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config.api_url.clone()))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.api_url)
    }

    /// `POST /inspections`.
    pub async fn submit_inspection(
        &self,
        submission: &SubmitInspection,
    ) -> Result<SubmissionResult, ClientError> {
        let response = self
            .client
            .post(self.url("/inspections"))
            .json(submission)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /inspections/{id}/resync`.
    pub async fn resync_inspection(
        &self,
        inspection_id: DbId,
        actor_id: DbId,
    ) -> Result<SyncOutcome, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/inspections/{inspection_id}/resync")))
            .header(ACTOR_HEADER, actor_id)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `GET /defects/locked?asset_id=`.
    pub async fn locked_defects(&self, asset_id: &str) -> Result<LockRegistry, ClientError> {
        let response = self
            .client
            .get(self.url("/defects/locked"))
            .query(&[("asset_id", asset_id)])
            .send()
            .await?;
        let body: LockedDefectsResponse = Self::parse_response(response).await?;
        Ok(LockRegistry::from_locked_items(asset_id, body.locked_items))
    }

    /// `POST /actions/{id}/{transition}`.
    pub async fn transition_action(
        &self,
        action_id: DbId,
        transition: &str,
        actor_id: DbId,
        comment: Option<&str>,
    ) -> Result<Action, ClientError> {
        let mut request = self
            .client
            .post(self.url(&format!("/actions/{action_id}/{transition}")))
            .header(ACTOR_HEADER, actor_id);
        if let Some(comment) = comment {
            request = request.json(&serde_json::json!({ "comment": comment }));
        }
        Self::parse_response(request.send().await?).await
    }

    /// `DELETE /actions/{id}`.
    pub async fn delete_action(&self, action_id: DbId) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/actions/{action_id}")))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Send any operation, discarding the response body.
    pub async fn execute(&self, op: &PendingOperation) -> Result<(), ClientError> {
        match op {
            PendingOperation::SubmitInspection(submission) => {
                self.submit_inspection(submission).await?;
            }
            PendingOperation::ResyncInspection {
                inspection_id,
                actor_id,
            } => {
                self.resync_inspection(*inspection_id, *actor_id).await?;
            }
            PendingOperation::LogAction {
                action_id,
                actor_id,
                comment,
            } => {
                self.transition_action(*action_id, "log", *actor_id, Some(comment))
                    .await?;
            }
            PendingOperation::CompleteAction {
                action_id,
                actor_id,
            } => {
                self.transition_action(*action_id, "complete", *actor_id, None)
                    .await?;
            }
            PendingOperation::UndoLog {
                action_id,
                actor_id,
            } => {
                self.transition_action(*action_id, "undo-log", *actor_id, None)
                    .await?;
            }
            PendingOperation::UndoComplete {
                action_id,
                actor_id,
            } => {
                self.transition_action(*action_id, "undo-complete", *actor_id, None)
                    .await?;
            }
            PendingOperation::DeleteAction { action_id } => {
                self.delete_action(*action_id).await?;
            }
        }
        Ok(())
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<DataResponse<T>>().await?.data)
    }
}

#[async_trait]
impl Submitter for ApiClient {
    async fn submit(&self, entry: &QueueEntry) -> Result<(), ClientError> {
        let op = PendingOperation::try_from(entry)?;
        self.execute(&op).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_joined_under_api_v1() {
        let api = ApiClient::with_client(reqwest::Client::new(), "http://fleet:3000/".to_string());
        assert_eq!(api.url("/actions/7/log"), "http://fleet:3000/api/v1/actions/7/log");
    }
}
