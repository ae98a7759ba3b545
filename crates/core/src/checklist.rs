//! Weekly checklist grid with lock pre-fill.
//!
//! A [`Checklist`] is what an inspector fills in: one cell per day for every
//! checklist item. Cells whose item matches an open defect are pre-filled from
//! the [`LockRegistry`] and refuse edits. [`ChecklistGate`] decides whether a
//! checklist may be started at all when the registry could not be loaded.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::inspection::{CellKey, DayOfWeek, ItemStatus, SubmitInspection, SubmitInspectionItem};
use crate::lock_registry::{LockRegistry, LockedDefect};
use crate::types::DbId;

/// Warning shown when the open-defect lookup fails.
pub const REGISTRY_UNAVAILABLE_WARNING: &str =
    "Open defects could not be loaded. Previously reported defects will not be pre-filled; \
     refresh or acknowledge to continue.";

// ---------------------------------------------------------------------------
// Checklist
// ---------------------------------------------------------------------------

/// One row of the checklist template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item_number: i32,
    pub item_description: String,
}

/// State of one `(day, item)` cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistCell {
    pub status: Option<ItemStatus>,
    pub comment: Option<String>,
    /// Action holding the lock, when the cell is read-only.
    pub locked_by: Option<DbId>,
}

impl ChecklistCell {
    pub fn is_locked(&self) -> bool {
        self.locked_by.is_some()
    }
}

/// A weekly checklist being filled in for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Checklist {
    asset_id: String,
    items: Vec<ChecklistItem>,
    cells: BTreeMap<CellKey, ChecklistCell>,
}

impl Checklist {
    /// Empty grid for `items`, seven days each.
    ///
    /// Item numbers key the cells, so a template repeating one is rejected.
    pub fn new(
        asset_id: impl Into<String>,
        items: Vec<ChecklistItem>,
    ) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        if let Some(dup) = items.iter().find(|item| !seen.insert(item.item_number)) {
            return Err(CoreError::Validation(format!(
                "Checklist item {} appears more than once",
                dup.item_number
            )));
        }

        let cells = items
            .iter()
            .flat_map(|item| DayOfWeek::all().map(move |day| CellKey::new(day, item.item_number)))
            .map(|key| (key, ChecklistCell::default()))
            .collect();
        Ok(Self {
            asset_id: asset_id.into(),
            items,
            cells,
        })
    }

    /// Grid for `items` with every locked item pre-filled from `registry`.
    pub fn prefilled(
        asset_id: impl Into<String>,
        items: Vec<ChecklistItem>,
        registry: &LockRegistry,
    ) -> Result<Self, CoreError> {
        let mut checklist = Self::new(asset_id, items)?;
        checklist.apply_registry(registry);
        Ok(checklist)
    }

    /// Lock every cell of items that have an open defect.
    ///
    /// Returns the number of items locked.
    pub fn apply_registry(&mut self, registry: &LockRegistry) -> usize {
        let mut locked = 0;
        for item in &self.items {
            let Some(lock) = registry.lookup(item.item_number, &item.item_description) else {
                continue;
            };
            locked += 1;
            for day in DayOfWeek::all() {
                self.cells
                    .insert(CellKey::new(day, item.item_number), locked_cell(lock));
            }
        }
        locked
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn cell(&self, key: CellKey) -> Option<&ChecklistCell> {
        self.cells.get(&key)
    }

    pub fn is_locked(&self, key: CellKey) -> bool {
        self.cells.get(&key).is_some_and(ChecklistCell::is_locked)
    }

    /// Record a result for an editable cell.
    pub fn set_status(&mut self, key: CellKey, status: ItemStatus) -> Result<(), CoreError> {
        let cell = self.editable_cell(key)?;
        cell.status = Some(status);
        Ok(())
    }

    /// Set or clear the comment of an editable cell.
    pub fn set_comment(&mut self, key: CellKey, comment: Option<String>) -> Result<(), CoreError> {
        let cell = self.editable_cell(key)?;
        cell.comment = crate::inspection::normalize_comment(comment);
        Ok(())
    }

    fn editable_cell(&mut self, key: CellKey) -> Result<&mut ChecklistCell, CoreError> {
        let cell = self.cells.get_mut(&key).ok_or_else(|| {
            CoreError::Validation(format!(
                "Item {} is not on this checklist",
                key.item_number
            ))
        })?;
        if let Some(action_id) = cell.locked_by {
            return Err(CoreError::Validation(format!(
                "Item {} on {} is locked by open action {action_id}",
                key.item_number,
                key.day.label()
            )));
        }
        Ok(cell)
    }

    /// Convert the filled-in cells into a submission. Cells without a status
    /// are left out.
    pub fn into_submission(
        self,
        inspector_id: DbId,
        week_ending: Option<NaiveDate>,
        client_ref: Option<Uuid>,
    ) -> SubmitInspection {
        let descriptions: BTreeMap<i32, String> = self
            .items
            .into_iter()
            .map(|item| (item.item_number, item.item_description))
            .collect();

        let items = self
            .cells
            .into_iter()
            .filter_map(|(key, cell)| {
                let status = cell.status?;
                Some(SubmitInspectionItem {
                    item_number: key.item_number,
                    item_description: descriptions.get(&key.item_number)?.clone(),
                    day_of_week: key.day.get(),
                    status,
                    comment: cell.comment,
                    photo_ref: None,
                })
            })
            .collect();

        SubmitInspection {
            asset_id: self.asset_id,
            inspector_id,
            week_ending,
            client_ref,
            items,
        }
    }
}

fn locked_cell(lock: &LockedDefect) -> ChecklistCell {
    ChecklistCell {
        status: Some(ItemStatus::Defect),
        comment: Some(lock.comment.clone()),
        locked_by: Some(lock.action_id),
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Whether a checklist may be started for an asset.
#[derive(Debug, Clone, PartialEq)]
pub enum ChecklistGate {
    /// The registry loaded; proceed with pre-fill.
    Ready(LockRegistry),
    /// The registry lookup failed; the user must acknowledge or refresh.
    Blocked { asset_id: String, warning: String },
}

impl ChecklistGate {
    /// Build a gate from the outcome of a registry lookup.
    pub fn from_lookup<E: Display>(asset_id: &str, lookup: Result<LockRegistry, E>) -> Self {
        match lookup {
            Ok(registry) => Self::Ready(registry),
            Err(e) => {
                tracing::warn!(asset_id = %asset_id, error = %e, "Open defect lookup failed");
                Self::Blocked {
                    asset_id: asset_id.to_string(),
                    warning: REGISTRY_UNAVAILABLE_WARNING.to_string(),
                }
            }
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Ready(_) => None,
            Self::Blocked { warning, .. } => Some(warning),
        }
    }

    /// The registry, if the gate is open.
    pub fn registry(&self) -> Option<&LockRegistry> {
        match self {
            Self::Ready(registry) => Some(registry),
            Self::Blocked { .. } => None,
        }
    }

    /// Proceed past a blocked gate without pre-fill.
    ///
    /// The server still re-applies locks when the inspection is submitted.
    pub fn acknowledge(self) -> LockRegistry {
        match self {
            Self::Ready(registry) => registry,
            Self::Blocked { asset_id, .. } => {
                tracing::warn!(asset_id = %asset_id, "Checklist started without open defects");
                LockRegistry::empty(asset_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::action::ActionStatus;

    fn template() -> Vec<ChecklistItem> {
        vec![
            ChecklistItem {
                item_number: 7,
                item_description: "Oil level".to_string(),
            },
            ChecklistItem {
                item_number: 8,
                item_description: "Tyres".to_string(),
            },
        ]
    }

    fn registry() -> LockRegistry {
        LockRegistry::from_locked_items(
            "P001",
            vec![LockedDefect {
                item_number: 7,
                item_description: "Oil level".to_string(),
                status: ActionStatus::Pending,
                comment: "oil leak".to_string(),
                action_id: 11,
            }],
        )
    }

    fn cell(day: i16, item_number: i32) -> CellKey {
        CellKey::new(DayOfWeek::new(day).unwrap(), item_number)
    }

    #[test]
    fn locked_items_are_prefilled_on_every_day() {
        let checklist = Checklist::prefilled("P001", template(), &registry()).unwrap();

        for day in 1..=7 {
            let locked = checklist.cell(cell(day, 7)).unwrap();
            assert_eq!(locked.status, Some(ItemStatus::Defect));
            assert_eq!(locked.comment.as_deref(), Some("oil leak"));
            assert!(locked.is_locked());
            assert!(!checklist.is_locked(cell(day, 8)));
        }
    }

    #[test]
    fn locked_cells_reject_edits() {
        let mut checklist = Checklist::prefilled("P001", template(), &registry()).unwrap();

        assert_matches!(
            checklist.set_status(cell(2, 7), ItemStatus::Ok),
            Err(CoreError::Validation(msg)) if msg.contains("locked")
        );
        assert!(checklist
            .set_comment(cell(2, 7), Some("fixed".to_string()))
            .is_err());
        assert_eq!(
            checklist.cell(cell(2, 7)).unwrap().status,
            Some(ItemStatus::Defect)
        );
    }

    #[test]
    fn unknown_cells_are_rejected() {
        let mut checklist = Checklist::new("P001", template()).unwrap();
        assert!(checklist.set_status(cell(1, 99), ItemStatus::Ok).is_err());
    }

    #[test]
    fn repeated_item_numbers_are_rejected() {
        let mut items = template();
        items.push(ChecklistItem {
            item_number: 7,
            item_description: "Oil filter".to_string(),
        });
        assert_matches!(
            Checklist::new("P001", items.clone()),
            Err(CoreError::Validation(msg)) if msg.contains("item 7")
        );
        assert!(Checklist::prefilled("P001", items, &registry()).is_err());
    }

    #[test]
    fn submission_carries_locked_and_filled_cells() {
        let mut checklist = Checklist::prefilled("P001", template(), &registry()).unwrap();
        checklist.set_status(cell(1, 8), ItemStatus::Ok).unwrap();
        checklist
            .set_comment(cell(1, 8), Some("  ".to_string()))
            .unwrap();

        let submission = checklist.into_submission(3, None, None);
        assert_eq!(submission.asset_id, "P001");
        // Seven locked cells for item 7 plus the one filled cell for item 8.
        assert_eq!(submission.items.len(), 8);
        let tyres: Vec<_> = submission
            .items
            .iter()
            .filter(|i| i.item_number == 8)
            .collect();
        assert_eq!(tyres.len(), 1);
        assert_eq!(tyres[0].comment, None);

        let prepared = submission.prepare().unwrap();
        assert!(prepared
            .items
            .iter()
            .filter(|i| i.item_number == 7)
            .all(|i| i.status == ItemStatus::Defect));
    }

    #[test]
    fn failed_lookup_blocks_until_acknowledged() {
        let gate = ChecklistGate::from_lookup::<&str>("P001", Err("connection refused"));
        assert!(gate.is_blocked());
        assert_eq!(gate.warning(), Some(REGISTRY_UNAVAILABLE_WARNING));
        assert!(gate.registry().is_none());

        let registry = gate.acknowledge();
        assert!(registry.is_empty());
        assert_eq!(registry.asset_id(), "P001");
    }

    #[test]
    fn successful_lookup_opens_the_gate() {
        let gate = ChecklistGate::from_lookup::<&str>("P001", Ok(registry()));
        assert!(!gate.is_blocked());
        assert_eq!(gate.registry().unwrap().len(), 1);
    }
}
