//! Rows of the `actions` and `action_occurrences` tables.

use fleet_core::action::{Action, ActionOccurrence, ActionStatus, Priority};
use fleet_core::store::StoreError;
use fleet_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::corrupt;

/// A row from the `actions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActionRow {
    pub id: DbId,
    pub asset_id: String,
    pub inspection_id: Option<DbId>,
    pub inspection_item_id: Option<DbId>,
    pub item_number: i32,
    pub item_description: String,
    pub title: String,
    pub description: String,
    pub defect_comment: Option<String>,
    pub priority: String,
    pub status: String,
    pub status_before_completion: Option<String>,
    pub logged_comment: Option<String>,
    pub logged_at: Option<Timestamp>,
    pub logged_by: Option<DbId>,
    pub actioned_at: Option<Timestamp>,
    pub actioned_by: Option<DbId>,
    pub created_at: Timestamp,
    pub created_by: DbId,
    pub updated_at: Timestamp,
}

impl TryFrom<ActionRow> for Action {
    type Error = StoreError;

    fn try_from(row: ActionRow) -> Result<Self, Self::Error> {
        let status = ActionStatus::from_name(&row.status).map_err(|e| corrupt("actions", row.id, e))?;
        let priority = Priority::from_name(&row.priority).map_err(|e| corrupt("actions", row.id, e))?;
        let status_before_completion = row
            .status_before_completion
            .as_deref()
            .map(ActionStatus::from_name)
            .transpose()
            .map_err(|e| corrupt("actions", row.id, e))?;

        Ok(Action {
            id: row.id,
            asset_id: row.asset_id,
            inspection_id: row.inspection_id,
            inspection_item_id: row.inspection_item_id,
            item_number: row.item_number,
            item_description: row.item_description,
            title: row.title,
            description: row.description,
            defect_comment: row.defect_comment,
            priority,
            status,
            status_before_completion,
            logged_comment: row.logged_comment,
            logged_at: row.logged_at,
            logged_by: row.logged_by,
            actioned_at: row.actioned_at,
            actioned_by: row.actioned_by,
            created_at: row.created_at,
            created_by: row.created_by,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `action_occurrences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActionOccurrenceRow {
    pub id: DbId,
    pub action_id: DbId,
    pub inspection_id: DbId,
    pub inspection_item_id: DbId,
    pub created_at: Timestamp,
}

impl From<ActionOccurrenceRow> for ActionOccurrence {
    fn from(row: ActionOccurrenceRow) -> Self {
        ActionOccurrence {
            id: row.id,
            action_id: row.action_id,
            inspection_id: row.inspection_id,
            inspection_item_id: row.inspection_item_id,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn row(status: &str) -> ActionRow {
        let now = Utc::now();
        ActionRow {
            id: 5,
            asset_id: "P001".to_string(),
            inspection_id: Some(1),
            inspection_item_id: Some(2),
            item_number: 7,
            item_description: "Oil level".to_string(),
            title: "P001: 7. Oil level".to_string(),
            description: String::new(),
            defect_comment: None,
            priority: "high".to_string(),
            status: status.to_string(),
            status_before_completion: Some("logged".to_string()),
            logged_comment: Some("parts ordered".to_string()),
            logged_at: Some(now),
            logged_by: Some(42),
            actioned_at: Some(now),
            actioned_by: Some(42),
            created_at: now,
            created_by: 3,
            updated_at: now,
        }
    }

    #[test]
    fn converts_text_columns_into_enums() {
        let action = Action::try_from(row("completed")).unwrap();
        assert_eq!(action.status, ActionStatus::Completed);
        assert_eq!(action.priority, Priority::High);
        assert_eq!(action.status_before_completion, Some(ActionStatus::Logged));
    }

    #[test]
    fn unknown_status_is_reported_as_corrupt() {
        let err = Action::try_from(row("archived")).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(msg) if msg.contains("actions row 5")));
    }
}
