//! Rows of the `inspections` and `inspection_items` tables.

use chrono::NaiveDate;
use fleet_core::inspection::{DayOfWeek, Inspection, InspectionItem, ItemStatus};
use fleet_core::store::StoreError;
use fleet_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::corrupt;

/// A row from the `inspections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InspectionRow {
    pub id: DbId,
    pub asset_id: String,
    pub inspector_id: DbId,
    pub week_ending: Option<NaiveDate>,
    pub client_ref: Option<Uuid>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<InspectionRow> for Inspection {
    fn from(row: InspectionRow) -> Self {
        Inspection {
            id: row.id,
            asset_id: row.asset_id,
            inspector_id: row.inspector_id,
            week_ending: row.week_ending,
            client_ref: row.client_ref,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A row from the `inspection_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InspectionItemRow {
    pub id: DbId,
    pub inspection_id: DbId,
    pub asset_id: String,
    pub item_number: i32,
    pub item_description: String,
    pub day_of_week: i16,
    pub status: String,
    pub comment: Option<String>,
    pub photo_ref: Option<String>,
    pub created_at: Timestamp,
}

impl TryFrom<InspectionItemRow> for InspectionItem {
    type Error = StoreError;

    fn try_from(row: InspectionItemRow) -> Result<Self, Self::Error> {
        let day_of_week =
            DayOfWeek::new(row.day_of_week).map_err(|e| corrupt("inspection_items", row.id, e))?;
        let status =
            ItemStatus::from_name(&row.status).map_err(|e| corrupt("inspection_items", row.id, e))?;

        Ok(InspectionItem {
            id: row.id,
            inspection_id: row.inspection_id,
            asset_id: row.asset_id,
            item_number: row.item_number,
            item_description: row.item_description,
            day_of_week,
            status,
            comment: row.comment,
            photo_ref: row.photo_ref,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn out_of_range_day_is_corrupt() {
        let row = InspectionItemRow {
            id: 9,
            inspection_id: 1,
            asset_id: "P001".to_string(),
            item_number: 7,
            item_description: "Oil level".to_string(),
            day_of_week: 0,
            status: "defect".to_string(),
            comment: None,
            photo_ref: None,
            created_at: Utc::now(),
        };
        assert!(matches!(
            InspectionItem::try_from(row),
            Err(StoreError::Corrupt(_))
        ));
    }
}
