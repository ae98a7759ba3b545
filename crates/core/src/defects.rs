//! Defect extraction from a submitted inspection.
//!
//! Groups the `defect` cells of one inspection by checklist item so that an
//! item failing on several days of the week becomes a single descriptor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::inspection::{DayOfWeek, InspectionItem, ItemStatus};
use crate::types::DbId;

/// One logical defect found in an inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectDescriptor {
    pub item_number: i32,
    pub item_description: String,
    /// Affected day slots, ascending.
    pub days: Vec<DayOfWeek>,
    /// First non-empty inspector comment, in day order.
    #[serde(default)]
    pub comment: Option<String>,
    /// Representative inspection item used for linking the action.
    pub primary_inspection_item_id: DbId,
}

impl DefectDescriptor {
    /// Comma-separated day labels, e.g. `"Mon, Wed"`.
    pub fn day_labels(&self) -> String {
        self.days
            .iter()
            .map(|d| d.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Group the failed items of one inspection into defect descriptors.
///
/// Items are visited in `(day, id)` order, so the primary item and the kept
/// comment both come from the earliest affected day. The result is ordered by
/// item number, then description. An inspection without defects yields an
/// empty list.
pub fn extract_defects(items: &[InspectionItem]) -> Vec<DefectDescriptor> {
    let mut failed: Vec<&InspectionItem> = items
        .iter()
        .filter(|item| item.status == ItemStatus::Defect)
        .collect();
    failed.sort_by_key(|item| (item.day_of_week, item.id));

    let mut groups: BTreeMap<(i32, String), DefectDescriptor> = BTreeMap::new();
    for item in failed {
        let description = item.item_description.trim().to_string();
        let entry = groups
            .entry((item.item_number, description.clone()))
            .or_insert_with(|| DefectDescriptor {
                item_number: item.item_number,
                item_description: description,
                days: Vec::new(),
                comment: None,
                primary_inspection_item_id: item.id,
            });

        if !entry.days.contains(&item.day_of_week) {
            entry.days.push(item.day_of_week);
        }

        if entry.comment.is_none() {
            entry.comment = item
                .comment
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string);
        }
    }

    groups.into_values().collect()
}
