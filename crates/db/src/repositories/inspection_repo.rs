//! Repository for the `inspections` and `inspection_items` tables.

use fleet_core::inspection::{NewInspection, NewInspectionItem};
use fleet_core::types::DbId;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::inspection::{InspectionItemRow, InspectionRow};

/// Column list for `inspections` queries.
const COLUMNS: &str =
    "id, asset_id, inspector_id, week_ending, client_ref, created_at, updated_at";

/// Column list for `inspection_items` queries.
const ITEM_COLUMNS: &str = "\
    id, inspection_id, asset_id, item_number, item_description, day_of_week, \
    status, comment, photo_ref, created_at";

/// Provides queries for inspections and their checklist items.
pub struct InspectionRepo;

impl InspectionRepo {
    /// Find an inspection by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<InspectionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM inspections WHERE id = $1");
        sqlx::query_as::<_, InspectionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the inspection saved under a client idempotency reference.
    pub async fn find_by_client_ref<'e>(
        executor: impl PgExecutor<'e>,
        client_ref: Uuid,
    ) -> Result<Option<InspectionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM inspections WHERE client_ref = $1");
        sqlx::query_as::<_, InspectionRow>(&query)
            .bind(client_ref)
            .fetch_optional(executor)
            .await
    }

    /// Insert an inspection header.
    ///
    /// Returns `None` when another inspection already holds `client_ref`.
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        input: &NewInspection,
    ) -> Result<Option<InspectionRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO inspections (asset_id, inspector_id, week_ending, client_ref) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (client_ref) WHERE client_ref IS NOT NULL DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, InspectionRow>(&query)
            .bind(&input.asset_id)
            .bind(input.inspector_id)
            .bind(input.week_ending)
            .bind(input.client_ref)
            .fetch_optional(executor)
            .await
    }

    /// Insert one checklist cell of an inspection.
    pub async fn insert_item<'e>(
        executor: impl PgExecutor<'e>,
        inspection_id: DbId,
        asset_id: &str,
        item: &NewInspectionItem,
    ) -> Result<InspectionItemRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO inspection_items \
                (inspection_id, asset_id, item_number, item_description, day_of_week, \
                 status, comment, photo_ref) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, InspectionItemRow>(&query)
            .bind(inspection_id)
            .bind(asset_id)
            .bind(item.item_number)
            .bind(&item.item_description)
            .bind(item.day_of_week.get())
            .bind(item.status.as_str())
            .bind(&item.comment)
            .bind(&item.photo_ref)
            .fetch_one(executor)
            .await
    }

    /// Items of an inspection ordered by day, then item number.
    pub async fn list_items<'e>(
        executor: impl PgExecutor<'e>,
        inspection_id: DbId,
    ) -> Result<Vec<InspectionItemRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM inspection_items \
             WHERE inspection_id = $1 \
             ORDER BY day_of_week, item_number"
        );
        sqlx::query_as::<_, InspectionItemRow>(&query)
            .bind(inspection_id)
            .fetch_all(executor)
            .await
    }
}
