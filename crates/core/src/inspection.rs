//! Inspection checklist DTOs (weekly recurring inspections).
//!
//! A weekly inspection has one slot per day (1 = Monday .. 7 = Sunday) for
//! every checklist item. The wire shape ([`SubmitInspection`]) is validated
//! and converted into the typed [`NewInspection`] before it reaches a store.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// First day slot of an inspection week (Monday).
pub const MIN_DAY: i16 = 1;

/// Last day slot of an inspection week (Sunday).
pub const MAX_DAY: i16 = 7;

/// Maximum length of a checklist item description.
pub const MAX_ITEM_DESCRIPTION_LENGTH: usize = 200;

/// Maximum length of an inspector comment on a single cell.
pub const MAX_ITEM_COMMENT_LENGTH: usize = 500;

/// Maximum length of an asset reference (fleet number / registration).
pub const MAX_ASSET_ID_LENGTH: usize = 64;

const DAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// Result recorded for one checklist cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Ok,
    Defect,
    #[serde(alias = "not-applicable", alias = "na")]
    NotApplicable,
}

impl ItemStatus {
    /// Name stored in the database `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Defect => "defect",
            Self::NotApplicable => "not_applicable",
        }
    }

    /// Parse from the database `status` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "ok" => Ok(Self::Ok),
            "defect" => Ok(Self::Defect),
            "not_applicable" | "not-applicable" | "na" => Ok(Self::NotApplicable),
            other => Err(CoreError::Validation(format!(
                "Invalid inspection item status '{other}'. Must be one of: ok, defect, not_applicable"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// DayOfWeek
// ---------------------------------------------------------------------------

/// Day slot within a weekly inspection, 1 (Monday) through 7 (Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct DayOfWeek(i16);

impl DayOfWeek {
    pub fn new(day: i16) -> Result<Self, CoreError> {
        if (MIN_DAY..=MAX_DAY).contains(&day) {
            Ok(Self(day))
        } else {
            Err(CoreError::Validation(format!(
                "Invalid day of week {day}. Must be between {MIN_DAY} and {MAX_DAY}"
            )))
        }
    }

    pub fn get(self) -> i16 {
        self.0
    }

    /// Short English label (`"Mon"` .. `"Sun"`).
    pub fn label(self) -> &'static str {
        DAY_LABELS[(self.0 - MIN_DAY) as usize]
    }

    /// All seven day slots in order.
    pub fn all() -> impl Iterator<Item = DayOfWeek> {
        (MIN_DAY..=MAX_DAY).map(DayOfWeek)
    }
}

impl TryFrom<i16> for DayOfWeek {
    type Error = CoreError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DayOfWeek> for i16 {
    fn from(day: DayOfWeek) -> Self {
        day.0
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Position of one cell in the weekly checklist grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub day: DayOfWeek,
    pub item_number: i32,
}

impl CellKey {
    pub fn new(day: DayOfWeek, item_number: i32) -> Self {
        Self { day, item_number }
    }
}

/// Identity of a physical fault on an asset.
///
/// Deliberately excludes the inspection (week) that observed it, so the same
/// fault is recognised across inspection cycles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefectKey {
    pub asset_id: String,
    pub item_number: i32,
    pub item_description: String,
}

impl DefectKey {
    /// Build a key; surrounding whitespace in the textual parts is ignored.
    pub fn new(
        asset_id: impl AsRef<str>,
        item_number: i32,
        item_description: impl AsRef<str>,
    ) -> Self {
        Self {
            asset_id: asset_id.as_ref().trim().to_string(),
            item_number,
            item_description: item_description.as_ref().trim().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stored entities
// ---------------------------------------------------------------------------

/// A saved inspection header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub id: DbId,
    pub asset_id: String,
    pub inspector_id: DbId,
    pub week_ending: Option<NaiveDate>,
    /// Client-generated idempotency reference for replayed submissions.
    pub client_ref: Option<Uuid>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A saved checklist cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionItem {
    pub id: DbId,
    pub inspection_id: DbId,
    pub asset_id: String,
    pub item_number: i32,
    pub item_description: String,
    pub day_of_week: DayOfWeek,
    pub status: ItemStatus,
    pub comment: Option<String>,
    pub photo_ref: Option<String>,
    pub created_at: Timestamp,
}

impl InspectionItem {
    pub fn defect_key(&self) -> DefectKey {
        DefectKey::new(&self.asset_id, self.item_number, &self.item_description)
    }

    pub fn cell(&self) -> CellKey {
        CellKey::new(self.day_of_week, self.item_number)
    }
}

/// An inspection together with its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInspection {
    pub inspection: Inspection,
    pub items: Vec<InspectionItem>,
}

// ---------------------------------------------------------------------------
// Wire input
// ---------------------------------------------------------------------------

/// One checklist cell as submitted by the inspection UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SubmitInspectionItem {
    #[validate(range(min = 1))]
    pub item_number: i32,
    #[validate(length(min = 1, max = 200))]
    pub item_description: String,
    #[validate(range(min = 1, max = 7))]
    pub day_of_week: i16,
    pub status: ItemStatus,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
    pub photo_ref: Option<String>,
}

/// Request body for submitting a completed inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SubmitInspection {
    #[validate(length(min = 1, max = 64))]
    pub asset_id: String,
    pub inspector_id: DbId,
    #[serde(default)]
    pub week_ending: Option<NaiveDate>,
    #[serde(default)]
    pub client_ref: Option<Uuid>,
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub items: Vec<SubmitInspectionItem>,
}

/// A validated checklist cell ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInspectionItem {
    pub item_number: i32,
    pub item_description: String,
    pub day_of_week: DayOfWeek,
    pub status: ItemStatus,
    pub comment: Option<String>,
    pub photo_ref: Option<String>,
}

impl NewInspectionItem {
    pub fn cell(&self) -> CellKey {
        CellKey::new(self.day_of_week, self.item_number)
    }
}

/// A validated inspection ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInspection {
    pub asset_id: String,
    pub inspector_id: DbId,
    pub week_ending: Option<NaiveDate>,
    pub client_ref: Option<Uuid>,
    pub items: Vec<NewInspectionItem>,
}

impl SubmitInspection {
    /// Validate the submission and convert it into its typed form.
    ///
    /// Rejects out-of-range days, empty descriptions and duplicate cells.
    /// Blank comments are normalised to `None`.
    pub fn prepare(self) -> Result<NewInspection, CoreError> {
        self.validate()?;

        let mut seen = HashSet::with_capacity(self.items.len());
        let mut items = Vec::with_capacity(self.items.len());
        for item in self.items {
            let day = DayOfWeek::new(item.day_of_week)?;
            let description = item.item_description.trim().to_string();
            if description.is_empty() {
                return Err(CoreError::Validation(format!(
                    "Item {} has an empty description",
                    item.item_number
                )));
            }
            let cell = CellKey::new(day, item.item_number);
            if !seen.insert(cell) {
                return Err(CoreError::Validation(format!(
                    "Duplicate checklist cell: item {} on {}",
                    item.item_number,
                    day.label()
                )));
            }
            items.push(NewInspectionItem {
                item_number: item.item_number,
                item_description: description,
                day_of_week: day,
                status: item.status,
                comment: normalize_comment(item.comment),
                photo_ref: item.photo_ref,
            });
        }

        Ok(NewInspection {
            asset_id: self.asset_id.trim().to_string(),
            inspector_id: self.inspector_id,
            week_ending: self.week_ending,
            client_ref: self.client_ref,
            items,
        })
    }
}

/// Trim a free-text comment, mapping blank input to `None`.
pub fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn item(number: i32, day: i16, status: ItemStatus) -> SubmitInspectionItem {
        SubmitInspectionItem {
            item_number: number,
            item_description: format!("Item {number}"),
            day_of_week: day,
            status,
            comment: None,
            photo_ref: None,
        }
    }

    fn submission(items: Vec<SubmitInspectionItem>) -> SubmitInspection {
        SubmitInspection {
            asset_id: "P001".to_string(),
            inspector_id: 3,
            week_ending: None,
            client_ref: None,
            items,
        }
    }

    #[test]
    fn day_of_week_bounds() {
        assert!(DayOfWeek::new(0).is_err());
        assert!(DayOfWeek::new(8).is_err());
        assert_eq!(DayOfWeek::new(1).unwrap().label(), "Mon");
        assert_eq!(DayOfWeek::new(7).unwrap().label(), "Sun");
        assert_eq!(DayOfWeek::all().count(), 7);
    }

    #[test]
    fn day_of_week_rejects_out_of_range_json() {
        assert!(serde_json::from_str::<DayOfWeek>("9").is_err());
        assert_eq!(serde_json::from_str::<DayOfWeek>("3").unwrap().get(), 3);
    }

    #[test]
    fn item_status_accepts_hyphenated_alias() {
        let status: ItemStatus = serde_json::from_str("\"not-applicable\"").unwrap();
        assert_eq!(status, ItemStatus::NotApplicable);
        assert_eq!(
            ItemStatus::from_name("defect").unwrap(),
            ItemStatus::Defect
        );
        assert!(ItemStatus::from_name("broken").is_err());
    }

    #[test]
    fn defect_key_ignores_surrounding_whitespace() {
        assert_eq!(
            DefectKey::new(" P001", 7, "Oil level "),
            DefectKey::new("P001", 7, "Oil level")
        );
    }

    #[test]
    fn prepare_converts_and_normalises() {
        let mut cell = item(7, 2, ItemStatus::Defect);
        cell.comment = Some("  oil leak ".to_string());
        let mut blank = item(8, 2, ItemStatus::Ok);
        blank.comment = Some("   ".to_string());

        let prepared = submission(vec![cell, blank]).prepare().unwrap();
        assert_eq!(prepared.items.len(), 2);
        assert_eq!(prepared.items[0].comment.as_deref(), Some("oil leak"));
        assert_eq!(prepared.items[1].comment, None);
        assert_eq!(prepared.items[0].day_of_week.get(), 2);
    }

    #[test]
    fn prepare_rejects_out_of_range_day() {
        let result = submission(vec![item(1, 8, ItemStatus::Ok)]).prepare();
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn prepare_rejects_duplicate_cells() {
        let result =
            submission(vec![item(1, 1, ItemStatus::Ok), item(1, 1, ItemStatus::Defect)]).prepare();
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Duplicate checklist cell"), "{msg}");
    }

    #[test]
    fn prepare_rejects_empty_item_list() {
        assert!(submission(vec![]).prepare().is_err());
    }

    #[test]
    fn prepare_rejects_blank_description() {
        let mut cell = item(1, 1, ItemStatus::Ok);
        cell.item_description = "   ".to_string();
        assert!(submission(vec![cell]).prepare().is_err());
    }
}
