//! Defect lock registry (per-asset view of open actions).
//!
//! The registry is never stored on its own: it is rebuilt from the asset's
//! open actions every time it is requested. Checklist items matching a
//! registry entry are forced to `defect`, carry the registry comment and
//! cannot be edited until the action leaves the open statuses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionStatus};
use crate::inspection::{CellKey, DefectKey, ItemStatus, NewInspectionItem};
use crate::store::{ActionStore, StoreError};
use crate::types::DbId;

/// Comment shown on locked items whose action has not been logged yet.
pub const PENDING_PLACEHOLDER: &str = "Defect pending by management";

/// One open defect as exposed to the inspection UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedDefect {
    pub item_number: i32,
    pub item_description: String,
    pub status: ActionStatus,
    pub comment: String,
    pub action_id: DbId,
}

/// Response body of the locked-defects lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedDefectsResponse {
    pub locked_items: Vec<LockedDefect>,
}

/// Comment pre-filled on a locked checklist item.
///
/// Logged actions show the manager's comment. Pending actions show the
/// inspector comment that raised them, or the placeholder when there was none.
pub fn registry_comment(action: &Action) -> String {
    let non_empty = |c: &Option<String>| {
        c.as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    };

    match action.status {
        ActionStatus::Logged => non_empty(&action.logged_comment)
            .unwrap_or_else(|| placeholder(action.status)),
        _ => non_empty(&action.defect_comment).unwrap_or_else(|| placeholder(action.status)),
    }
}

fn placeholder(status: ActionStatus) -> String {
    format!("{PENDING_PLACEHOLDER} ({})", status.label())
}

/// Open defects of one asset, keyed by item number and description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRegistry {
    asset_id: String,
    entries: BTreeMap<(i32, String), LockedDefect>,
}

impl LockRegistry {
    pub fn empty(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Build the registry from an asset's actions.
    ///
    /// Actions that are not open or belong to another asset are ignored. If
    /// two open actions share a key the older one wins and the duplicate is
    /// logged.
    pub fn from_actions(asset_id: &str, actions: impl IntoIterator<Item = Action>) -> Self {
        let mut open: Vec<Action> = actions
            .into_iter()
            .filter(|a| a.is_open() && a.asset_id == asset_id)
            .collect();
        open.sort_by_key(|a| a.id);

        let mut registry = Self::empty(asset_id);
        for action in open {
            let key = action.defect_key();
            let slot = (key.item_number, key.item_description.clone());
            if let Some(existing) = registry.entries.get(&slot) {
                tracing::warn!(
                    asset_id = %asset_id,
                    item_number = key.item_number,
                    kept_action_id = existing.action_id,
                    duplicate_action_id = action.id,
                    "Multiple open actions for one defect"
                );
                continue;
            }
            registry.entries.insert(
                slot,
                LockedDefect {
                    item_number: key.item_number,
                    item_description: key.item_description,
                    status: action.status,
                    comment: registry_comment(&action),
                    action_id: action.id,
                },
            );
        }
        registry
    }

    /// Rebuild a registry from the wire shape returned by the lock lookup.
    pub fn from_locked_items(asset_id: impl Into<String>, items: Vec<LockedDefect>) -> Self {
        let mut registry = Self::empty(asset_id);
        for item in items {
            let slot = (item.item_number, item.item_description.trim().to_string());
            registry.entries.entry(slot).or_insert(item);
        }
        registry
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the lock for a checklist item of this registry's asset.
    pub fn lookup(&self, item_number: i32, item_description: &str) -> Option<&LockedDefect> {
        self.entries
            .get(&(item_number, item_description.trim().to_string()))
    }

    /// Look up the lock for a defect key; keys of other assets never match.
    pub fn get(&self, key: &DefectKey) -> Option<&LockedDefect> {
        if key.asset_id != self.asset_id {
            return None;
        }
        self.lookup(key.item_number, &key.item_description)
    }

    /// Locked items ordered by item number, then description.
    pub fn locked_items(&self) -> Vec<LockedDefect> {
        self.entries.values().cloned().collect()
    }

    /// Force submitted items that match a lock back to the locked state.
    ///
    /// Returns the cells that had to be changed. Used server-side so a stale
    /// or offline client cannot re-approve an open defect.
    pub fn enforce(&self, items: &mut [NewInspectionItem]) -> Vec<CellKey> {
        let mut coerced = Vec::new();
        for item in items.iter_mut() {
            let Some(lock) = self.lookup(item.item_number, &item.item_description) else {
                continue;
            };
            if item.status != ItemStatus::Defect
                || item.comment.as_deref() != Some(lock.comment.as_str())
            {
                item.status = ItemStatus::Defect;
                item.comment = Some(lock.comment.clone());
                coerced.push(item.cell());
            }
        }
        coerced
    }

    pub fn into_response(self) -> LockedDefectsResponse {
        LockedDefectsResponse {
            locked_items: self.entries.into_values().collect(),
        }
    }
}

/// Rebuild the registry for `asset_id` from the store.
pub async fn load_registry<S>(store: &S, asset_id: &str) -> Result<LockRegistry, StoreError>
where
    S: ActionStore + ?Sized,
{
    let actions = store.list_open_actions(asset_id).await?;
    Ok(LockRegistry::from_actions(asset_id, actions))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::action::DEFAULT_PRIORITY;
    use crate::inspection::DayOfWeek;

    fn action(id: DbId, item_number: i32, status: ActionStatus) -> Action {
        let now = Utc::now();
        Action {
            id,
            asset_id: "P001".to_string(),
            inspection_id: Some(1),
            inspection_item_id: Some(1),
            item_number,
            item_description: format!("Item {item_number}"),
            title: String::new(),
            description: String::new(),
            defect_comment: None,
            priority: DEFAULT_PRIORITY,
            status,
            status_before_completion: None,
            logged_comment: None,
            logged_at: None,
            logged_by: None,
            actioned_at: None,
            actioned_by: None,
            created_at: now,
            created_by: 1,
            updated_at: now,
        }
    }

    fn submitted(item_number: i32, status: ItemStatus, comment: Option<&str>) -> NewInspectionItem {
        NewInspectionItem {
            item_number,
            item_description: format!("Item {item_number}"),
            day_of_week: DayOfWeek::new(1).unwrap(),
            status,
            comment: comment.map(str::to_string),
            photo_ref: None,
        }
    }

    #[test]
    fn only_open_actions_lock() {
        let registry = LockRegistry::from_actions(
            "P001",
            vec![
                action(1, 7, ActionStatus::Pending),
                action(2, 8, ActionStatus::Logged),
                action(3, 9, ActionStatus::Completed),
            ],
        );
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup(7, "Item 7").is_some());
        assert!(registry.lookup(8, "Item 8").is_some());
        assert!(registry.lookup(9, "Item 9").is_none());
    }

    #[test]
    fn other_assets_are_ignored() {
        let mut foreign = action(1, 7, ActionStatus::Pending);
        foreign.asset_id = "P002".to_string();
        let registry = LockRegistry::from_actions("P001", vec![foreign]);
        assert!(registry.is_empty());
        assert!(registry.get(&DefectKey::new("P002", 7, "Item 7")).is_none());
    }

    #[test]
    fn logged_actions_show_manager_comment() {
        let mut logged = action(1, 7, ActionStatus::Logged);
        logged.logged_comment = Some("parts ordered".to_string());
        assert_eq!(registry_comment(&logged), "parts ordered");
    }

    #[test]
    fn pending_actions_show_inspector_comment_or_placeholder() {
        let mut pending = action(1, 7, ActionStatus::Pending);
        assert_eq!(
            registry_comment(&pending),
            "Defect pending by management (Pending)"
        );
        pending.defect_comment = Some("oil leak".to_string());
        assert_eq!(registry_comment(&pending), "oil leak");
    }

    #[test]
    fn duplicate_open_actions_keep_the_oldest() {
        let registry = LockRegistry::from_actions(
            "P001",
            vec![
                action(5, 7, ActionStatus::Logged),
                action(2, 7, ActionStatus::Pending),
            ],
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(7, "Item 7").unwrap().action_id, 2);
    }

    #[test]
    fn enforce_coerces_locked_items_only() {
        let mut pending = action(1, 7, ActionStatus::Pending);
        pending.defect_comment = Some("oil leak".to_string());
        let registry = LockRegistry::from_actions("P001", vec![pending]);

        let mut items = vec![
            submitted(7, ItemStatus::Ok, None),
            submitted(8, ItemStatus::Ok, None),
        ];
        let coerced = registry.enforce(&mut items);

        assert_eq!(coerced.len(), 1);
        assert_eq!(coerced[0].item_number, 7);
        assert_eq!(items[0].status, ItemStatus::Defect);
        assert_eq!(items[0].comment.as_deref(), Some("oil leak"));
        assert_eq!(items[1].status, ItemStatus::Ok);
    }

    #[test]
    fn enforce_leaves_correctly_prefilled_items_alone() {
        let mut pending = action(1, 7, ActionStatus::Pending);
        pending.defect_comment = Some("oil leak".to_string());
        let registry = LockRegistry::from_actions("P001", vec![pending]);

        let mut items = vec![submitted(7, ItemStatus::Defect, Some("oil leak"))];
        assert!(registry.enforce(&mut items).is_empty());
    }
}
