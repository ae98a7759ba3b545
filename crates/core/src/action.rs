//! Remediation actions and their status state machine.
//!
//! An action is raised for a defect found during an inspection and moves
//! through `pending -> logged -> completed`. The pure transition logic lives
//! here; persisting a transition is handled by [`crate::lifecycle`].

use serde::{Deserialize, Serialize};

use crate::defects::DefectDescriptor;
use crate::error::CoreError;
use crate::inspection::DefectKey;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length (characters) of the manager comment required to log an action.
pub const MAX_LOGGED_COMMENT_LENGTH: usize = 40;

/// Priority given to actions raised automatically from inspection defects.
pub const DEFAULT_PRIORITY: Priority = Priority::High;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Raised, not yet acknowledged by management.
    Pending,
    /// Acknowledged by management with a comment (e.g. parts ordered).
    Logged,
    /// Remediated.
    Completed,
}

/// Statuses that hold a defect lock.
pub const OPEN_STATUSES: &[ActionStatus] = &[ActionStatus::Pending, ActionStatus::Logged];

impl ActionStatus {
    /// Name stored in the database `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Logged => "logged",
            Self::Completed => "completed",
        }
    }

    /// Parse from the database `status` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "pending" => Ok(Self::Pending),
            "logged" => Ok(Self::Logged),
            "completed" => Ok(Self::Completed),
            other => Err(CoreError::Validation(format!(
                "Invalid action status '{other}'. Must be one of: pending, logged, completed"
            ))),
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Logged => "Logged",
            Self::Completed => "Completed",
        }
    }

    /// Whether an action in this status locks its defect.
    pub fn is_open(self) -> bool {
        OPEN_STATUSES.contains(&self)
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(CoreError::Validation(format!(
                "Invalid action priority '{other}'. Must be one of: low, medium, high, urgent"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A durable remediation record for one defect on one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: DbId,
    pub asset_id: String,
    /// Most recent inspection that reported the defect.
    pub inspection_id: Option<DbId>,
    /// Most recent inspection item that reported the defect.
    pub inspection_item_id: Option<DbId>,
    pub item_number: i32,
    pub item_description: String,
    pub title: String,
    pub description: String,
    /// Inspector comment captured when the action was raised.
    pub defect_comment: Option<String>,
    pub priority: Priority,
    pub status: ActionStatus,
    /// Open status the action was in when it was completed; drives undo.
    pub status_before_completion: Option<ActionStatus>,
    pub logged_comment: Option<String>,
    pub logged_at: Option<Timestamp>,
    pub logged_by: Option<DbId>,
    pub actioned_at: Option<Timestamp>,
    pub actioned_by: Option<DbId>,
    pub created_at: Timestamp,
    pub created_by: DbId,
    pub updated_at: Timestamp,
}

impl Action {
    pub fn defect_key(&self) -> DefectKey {
        DefectKey::new(&self.asset_id, self.item_number, &self.item_description)
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// Insert DTO for a new `pending` action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAction {
    pub asset_id: String,
    pub inspection_id: DbId,
    pub inspection_item_id: DbId,
    pub item_number: i32,
    pub item_description: String,
    pub title: String,
    pub description: String,
    pub defect_comment: Option<String>,
    pub priority: Priority,
    pub created_by: DbId,
}

impl NewAction {
    /// Build the action raised for a freshly extracted defect.
    pub fn from_defect(
        asset_id: &str,
        inspection_id: DbId,
        created_by: DbId,
        defect: &DefectDescriptor,
    ) -> Self {
        let key = DefectKey::new(asset_id, defect.item_number, &defect.item_description);

        let mut description = format!(
            "Defect reported for item {} ({}) on {}.",
            key.item_number,
            key.item_description,
            defect.day_labels()
        );
        if let Some(comment) = &defect.comment {
            description.push_str(&format!("\nInspector comment: {comment}"));
        }

        Self {
            title: format!(
                "{}: {}. {}",
                key.asset_id, key.item_number, key.item_description
            ),
            asset_id: key.asset_id,
            inspection_id,
            inspection_item_id: defect.primary_inspection_item_id,
            item_number: key.item_number,
            item_description: key.item_description,
            description,
            defect_comment: defect.comment.clone(),
            priority: DEFAULT_PRIORITY,
            created_by,
        }
    }

    pub fn defect_key(&self) -> DefectKey {
        DefectKey::new(&self.asset_id, self.item_number, &self.item_description)
    }
}

/// One inspection that reported the defect tracked by an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOccurrence {
    pub id: DbId,
    pub action_id: DbId,
    pub inspection_id: DbId,
    pub inspection_item_id: DbId,
    pub created_at: Timestamp,
}

/// Reference to the inspection item being attached to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOccurrence {
    pub inspection_id: DbId,
    pub inspection_item_id: DbId,
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// A manager-initiated status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum Transition {
    MarkLogged { comment: String },
    MarkComplete,
    UndoLogged,
    UndoComplete,
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MarkLogged { .. } => "mark_logged",
            Self::MarkComplete => "mark_complete",
            Self::UndoLogged => "undo_logged",
            Self::UndoComplete => "undo_complete",
        }
    }
}

/// Validate a logged comment, returning it trimmed.
pub fn validate_logged_comment(comment: &str) -> Result<String, CoreError> {
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "A comment is required to log an action".to_string(),
        ));
    }
    let len = trimmed.chars().count();
    if len > MAX_LOGGED_COMMENT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Logged comment exceeds maximum length of {MAX_LOGGED_COMMENT_LENGTH} characters (got {len})"
        )));
    }
    Ok(trimmed.to_string())
}

/// Compute the result of applying `transition` to `action`.
///
/// Returns `Ok(None)` when the action is already where the transition would
/// leave it (repeated complete, undo of a state the action is not in); such
/// calls are idempotent and never mutate anything. Validation happens before
/// any field is touched.
///
/// Transition rules:
/// - `pending`   -> `logged` (comment required), `completed`
/// - `logged`    -> `completed`, `pending` (undo)
/// - `completed` -> the open status it was completed from (undo)
pub fn apply_transition(
    action: &Action,
    transition: &Transition,
    actor: DbId,
    now: Timestamp,
) -> Result<Option<Action>, CoreError> {
    let mut next = action.clone();

    match transition {
        Transition::MarkLogged { comment } => {
            let comment = validate_logged_comment(comment)?;
            match action.status {
                ActionStatus::Pending => {
                    next.status = ActionStatus::Logged;
                    next.logged_comment = Some(comment);
                    next.logged_at = Some(now);
                    next.logged_by = Some(actor);
                }
                ActionStatus::Logged if action.logged_comment.as_deref() == Some(comment.as_str()) => {
                    return Ok(None);
                }
                ActionStatus::Logged => {
                    return Err(CoreError::Conflict(format!(
                        "Action {} is already logged; undo it before logging a new comment",
                        action.id
                    )));
                }
                ActionStatus::Completed => {
                    return Err(CoreError::Conflict(format!(
                        "Action {} is completed; undo the completion before logging it",
                        action.id
                    )));
                }
            }
        }
        Transition::MarkComplete => match action.status {
            ActionStatus::Pending | ActionStatus::Logged => {
                next.status_before_completion = Some(action.status);
                next.status = ActionStatus::Completed;
                next.actioned_at = Some(now);
                next.actioned_by = Some(actor);
            }
            ActionStatus::Completed => return Ok(None),
        },
        Transition::UndoLogged => match action.status {
            ActionStatus::Logged => {
                next.status = ActionStatus::Pending;
                next.logged_comment = None;
                next.logged_at = None;
                next.logged_by = None;
            }
            ActionStatus::Pending | ActionStatus::Completed => return Ok(None),
        },
        Transition::UndoComplete => match action.status {
            ActionStatus::Completed => {
                next.status = restore_status(action);
                next.status_before_completion = None;
                next.actioned_at = None;
                next.actioned_by = None;
            }
            ActionStatus::Pending | ActionStatus::Logged => return Ok(None),
        },
    }

    next.updated_at = now;
    Ok(Some(next))
}

/// Open status a completed action returns to on undo.
///
/// Uses the recorded pre-completion status; rows completed before that field
/// existed fall back to whether logged fields are present.
fn restore_status(action: &Action) -> ActionStatus {
    match action.status_before_completion {
        Some(status) if status.is_open() => status,
        _ if action.logged_at.is_some() => ActionStatus::Logged,
        _ => ActionStatus::Pending,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;
    use crate::inspection::DayOfWeek;

    const MANAGER: DbId = 42;

    fn pending_action() -> Action {
        let now = Utc::now();
        Action {
            id: 1,
            asset_id: "P001".to_string(),
            inspection_id: Some(10),
            inspection_item_id: Some(100),
            item_number: 7,
            item_description: "Oil level".to_string(),
            title: "P001: 7. Oil level".to_string(),
            description: String::new(),
            defect_comment: Some("oil leak".to_string()),
            priority: DEFAULT_PRIORITY,
            status: ActionStatus::Pending,
            status_before_completion: None,
            logged_comment: None,
            logged_at: None,
            logged_by: None,
            actioned_at: None,
            actioned_by: None,
            created_at: now,
            created_by: 3,
            updated_at: now,
        }
    }

    fn apply(action: &Action, transition: Transition) -> Action {
        apply_transition(action, &transition, MANAGER, Utc::now())
            .unwrap()
            .expect("transition should change the action")
    }

    fn log(comment: &str) -> Transition {
        Transition::MarkLogged {
            comment: comment.to_string(),
        }
    }

    #[test]
    fn pending_to_logged_sets_logged_fields() {
        let logged = apply(&pending_action(), log(" parts ordered "));
        assert_eq!(logged.status, ActionStatus::Logged);
        assert_eq!(logged.logged_comment.as_deref(), Some("parts ordered"));
        assert_eq!(logged.logged_by, Some(MANAGER));
        assert!(logged.logged_at.is_some());
    }

    #[test]
    fn logging_with_empty_comment_is_rejected() {
        let action = pending_action();
        let result = apply_transition(&action, &log("   "), MANAGER, Utc::now());
        assert_matches!(result, Err(CoreError::Validation(_)));
        assert_eq!(action.status, ActionStatus::Pending);
    }

    #[test]
    fn logging_with_overlong_comment_is_rejected() {
        let comment = "x".repeat(MAX_LOGGED_COMMENT_LENGTH + 1);
        let result = apply_transition(&pending_action(), &log(&comment), MANAGER, Utc::now());
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("40"));
    }

    #[test]
    fn comment_at_limit_is_accepted() {
        let comment = "é".repeat(MAX_LOGGED_COMMENT_LENGTH);
        assert!(validate_logged_comment(&comment).is_ok());
    }

    #[test]
    fn relogging_with_same_comment_is_a_noop() {
        let logged = apply(&pending_action(), log("parts ordered"));
        let again = apply_transition(&logged, &log("parts ordered"), MANAGER, Utc::now());
        assert_matches!(again, Ok(None));
    }

    #[test]
    fn relogging_with_different_comment_conflicts() {
        let logged = apply(&pending_action(), log("parts ordered"));
        let again = apply_transition(&logged, &log("fitted"), MANAGER, Utc::now());
        assert_matches!(again, Err(CoreError::Conflict(_)));
    }

    #[test]
    fn pending_can_complete_directly() {
        let completed = apply(&pending_action(), Transition::MarkComplete);
        assert_eq!(completed.status, ActionStatus::Completed);
        assert_eq!(completed.actioned_by, Some(MANAGER));
        assert_eq!(
            completed.status_before_completion,
            Some(ActionStatus::Pending)
        );
    }

    #[test]
    fn completing_a_logged_action_keeps_logged_fields() {
        let logged = apply(&pending_action(), log("parts ordered"));
        let completed = apply(&logged, Transition::MarkComplete);
        assert_eq!(completed.status, ActionStatus::Completed);
        assert_eq!(completed.logged_comment.as_deref(), Some("parts ordered"));
        assert!(completed.logged_at.is_some());
    }

    #[test]
    fn undo_logged_clears_logged_fields() {
        let logged = apply(&pending_action(), log("parts ordered"));
        let undone = apply(&logged, Transition::UndoLogged);
        assert_eq!(undone.status, ActionStatus::Pending);
        assert_eq!(undone.logged_comment, None);
        assert_eq!(undone.logged_at, None);
        assert_eq!(undone.logged_by, None);
    }

    #[test]
    fn undo_complete_restores_logged_with_comment() {
        let logged = apply(&pending_action(), log("parts ordered"));
        let completed = apply(&logged, Transition::MarkComplete);
        let undone = apply(&completed, Transition::UndoComplete);
        assert_eq!(undone.status, ActionStatus::Logged);
        assert_eq!(undone.logged_comment.as_deref(), Some("parts ordered"));
        assert_eq!(undone.actioned_at, None);
        assert_eq!(undone.actioned_by, None);
        assert_eq!(undone.status_before_completion, None);
    }

    #[test]
    fn undo_complete_restores_pending_when_never_logged() {
        let completed = apply(&pending_action(), Transition::MarkComplete);
        let undone = apply(&completed, Transition::UndoComplete);
        assert_eq!(undone.status, ActionStatus::Pending);
    }

    #[test]
    fn undo_complete_without_recorded_status_falls_back_to_logged_fields() {
        let logged = apply(&pending_action(), log("parts ordered"));
        let mut completed = apply(&logged, Transition::MarkComplete);
        completed.status_before_completion = None;
        let undone = apply(&completed, Transition::UndoComplete);
        assert_eq!(undone.status, ActionStatus::Logged);
    }

    #[test]
    fn repeated_and_mismatched_operations_are_noops() {
        let pending = pending_action();
        assert_matches!(
            apply_transition(&pending, &Transition::UndoLogged, MANAGER, Utc::now()),
            Ok(None)
        );
        assert_matches!(
            apply_transition(&pending, &Transition::UndoComplete, MANAGER, Utc::now()),
            Ok(None)
        );

        let completed = apply(&pending, Transition::MarkComplete);
        assert_matches!(
            apply_transition(&completed, &Transition::MarkComplete, MANAGER, Utc::now()),
            Ok(None)
        );
        assert_matches!(
            apply_transition(&completed, &Transition::UndoLogged, MANAGER, Utc::now()),
            Ok(None)
        );
    }

    #[test]
    fn logging_a_completed_action_conflicts() {
        let completed = apply(&pending_action(), Transition::MarkComplete);
        assert_matches!(
            apply_transition(&completed, &log("too late"), MANAGER, Utc::now()),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn only_pending_and_logged_are_open() {
        assert!(ActionStatus::Pending.is_open());
        assert!(ActionStatus::Logged.is_open());
        assert!(!ActionStatus::Completed.is_open());
    }

    #[test]
    fn new_action_from_defect_uses_defaults() {
        let defect = DefectDescriptor {
            item_number: 7,
            item_description: "Oil level ".to_string(),
            days: vec![DayOfWeek::new(1).unwrap(), DayOfWeek::new(2).unwrap()],
            comment: Some("oil leak".to_string()),
            primary_inspection_item_id: 55,
        };

        let new = NewAction::from_defect("P001", 9, 3, &defect);
        assert_eq!(new.priority, DEFAULT_PRIORITY);
        assert_eq!(new.inspection_item_id, 55);
        assert_eq!(new.item_description, "Oil level");
        assert_eq!(new.title, "P001: 7. Oil level");
        assert!(new.description.contains("Mon, Tue"));
        assert!(new.description.contains("oil leak"));
        assert_eq!(new.defect_key(), DefectKey::new("P001", 7, "Oil level"));
    }

    #[test]
    fn status_names_round_trip_through_columns() {
        for status in [
            ActionStatus::Pending,
            ActionStatus::Logged,
            ActionStatus::Completed,
        ] {
            assert_eq!(ActionStatus::from_name(status.as_str()).unwrap(), status);
        }
        assert!(ActionStatus::from_name("deleted").is_err());
    }
}
