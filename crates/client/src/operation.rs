//! Domain operations that can be deferred while offline.
//!
//! A queue entry stores an operation as `{type, operation, data}` so the
//! file stays readable and tolerant of older clients. [`PendingOperation`]
//! is the typed view used to build entries and to replay them.

use fleet_core::inspection::SubmitInspection;
use fleet_core::types::DbId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::queue::QueueEntry;

/// Entry type of inspection operations.
pub const INSPECTION: &str = "inspection";
/// Entry type of action operations.
pub const ACTION: &str = "action";

/// An operation to send to the fleet API.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOperation {
    SubmitInspection(SubmitInspection),
    ResyncInspection { inspection_id: DbId, actor_id: DbId },
    LogAction { action_id: DbId, actor_id: DbId, comment: String },
    CompleteAction { action_id: DbId, actor_id: DbId },
    UndoLog { action_id: DbId, actor_id: DbId },
    UndoComplete { action_id: DbId, actor_id: DbId },
    DeleteAction { action_id: DbId },
}

#[derive(Debug, Serialize, Deserialize)]
struct ResyncData {
    inspection_id: DbId,
    actor_id: DbId,
}

#[derive(Debug, Serialize, Deserialize)]
struct ActionData {
    action_id: DbId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actor_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

impl PendingOperation {
    /// `(type, operation)` pair stored in the queue entry.
    pub fn kind(&self) -> (&'static str, &'static str) {
        match self {
            Self::SubmitInspection(_) => (INSPECTION, "submit"),
            Self::ResyncInspection { .. } => (INSPECTION, "resync"),
            Self::LogAction { .. } => (ACTION, "log"),
            Self::CompleteAction { .. } => (ACTION, "complete"),
            Self::UndoLog { .. } => (ACTION, "undo_log"),
            Self::UndoComplete { .. } => (ACTION, "undo_complete"),
            Self::DeleteAction { .. } => (ACTION, "delete"),
        }
    }

    /// Serialize the operation's payload.
    pub fn data(&self) -> Result<Value, ClientError> {
        let value = match self {
            Self::SubmitInspection(submission) => serde_json::to_value(submission)?,
            Self::ResyncInspection {
                inspection_id,
                actor_id,
            } => serde_json::to_value(ResyncData {
                inspection_id: *inspection_id,
                actor_id: *actor_id,
            })?,
            Self::LogAction {
                action_id,
                actor_id,
                comment,
            } => serde_json::to_value(ActionData {
                action_id: *action_id,
                actor_id: Some(*actor_id),
                comment: Some(comment.clone()),
            })?,
            Self::CompleteAction {
                action_id,
                actor_id,
            }
            | Self::UndoLog {
                action_id,
                actor_id,
            }
            | Self::UndoComplete {
                action_id,
                actor_id,
            } => serde_json::to_value(ActionData {
                action_id: *action_id,
                actor_id: Some(*actor_id),
                comment: None,
            })?,
            Self::DeleteAction { action_id } => serde_json::to_value(ActionData {
                action_id: *action_id,
                actor_id: None,
                comment: None,
            })?,
        };
        Ok(value)
    }
}

impl TryFrom<&QueueEntry> for PendingOperation {
    type Error = ClientError;

    fn try_from(entry: &QueueEntry) -> Result<Self, Self::Error> {
        let data = entry.data.clone();
        let unsupported = || ClientError::UnsupportedOperation {
            entry_type: entry.entry_type.clone(),
            operation: entry.operation.clone(),
        };
        let actor = |d: &ActionData| d.actor_id.ok_or_else(unsupported);

        match (entry.entry_type.as_str(), entry.operation.as_str()) {
            (INSPECTION, "submit") => Ok(Self::SubmitInspection(serde_json::from_value(data)?)),
            (INSPECTION, "resync") => {
                let d: ResyncData = serde_json::from_value(data)?;
                Ok(Self::ResyncInspection {
                    inspection_id: d.inspection_id,
                    actor_id: d.actor_id,
                })
            }
            (ACTION, operation) => {
                let d: ActionData = serde_json::from_value(data)?;
                match operation {
                    "log" => Ok(Self::LogAction {
                        action_id: d.action_id,
                        actor_id: actor(&d)?,
                        comment: d.comment.clone().unwrap_or_default(),
                    }),
                    "complete" => Ok(Self::CompleteAction {
                        action_id: d.action_id,
                        actor_id: actor(&d)?,
                    }),
                    "undo_log" => Ok(Self::UndoLog {
                        action_id: d.action_id,
                        actor_id: actor(&d)?,
                    }),
                    "undo_complete" => Ok(Self::UndoComplete {
                        action_id: d.action_id,
                        actor_id: actor(&d)?,
                    }),
                    "delete" => Ok(Self::DeleteAction {
                        action_id: d.action_id,
                    }),
                    _ => Err(unsupported()),
                }
            }
            _ => Err(unsupported()),
        }
    }
}
