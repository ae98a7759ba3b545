//! Repository for the `actions` and `action_occurrences` tables.

use fleet_core::action::{Action, NewAction};
use fleet_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::action::{ActionOccurrenceRow, ActionRow};

/// Column list for `actions` queries.
const COLUMNS: &str = "\
    id, asset_id, inspection_id, inspection_item_id, item_number, item_description, \
    title, description, defect_comment, priority, status, status_before_completion, \
    logged_comment, logged_at, logged_by, actioned_at, actioned_by, \
    created_at, created_by, updated_at";

/// Column list for `action_occurrences` queries.
const OCCURRENCE_COLUMNS: &str = "id, action_id, inspection_id, inspection_item_id, created_at";

/// Predicate matching the statuses covered by `uq_actions_open_defect`.
const OPEN_PREDICATE: &str = "status IN ('pending', 'logged')";

/// Provides queries for remediation actions.
pub struct ActionRepo;

impl ActionRepo {
    /// Find an action by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ActionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM actions WHERE id = $1");
        sqlx::query_as::<_, ActionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The newest action, open or closed, recording an inspection item.
    pub async fn find_by_occurrence_item(
        pool: &PgPool,
        inspection_item_id: DbId,
    ) -> Result<Option<ActionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM actions \
             WHERE id IN (SELECT action_id FROM action_occurrences WHERE inspection_item_id = $1) \
             ORDER BY id DESC LIMIT 1"
        );
        sqlx::query_as::<_, ActionRow>(&query)
            .bind(inspection_item_id)
            .fetch_optional(pool)
            .await
    }

    /// Open actions of an asset, oldest first.
    pub async fn list_open_for_asset(
        pool: &PgPool,
        asset_id: &str,
    ) -> Result<Vec<ActionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM actions \
             WHERE asset_id = $1 AND {OPEN_PREDICATE} \
             ORDER BY id"
        );
        sqlx::query_as::<_, ActionRow>(&query)
            .bind(asset_id)
            .fetch_all(pool)
            .await
    }

    /// The open action holding a defect key, if any.
    pub async fn find_open_by_key<'e>(
        executor: impl PgExecutor<'e>,
        asset_id: &str,
        item_number: i32,
        item_description: &str,
    ) -> Result<Option<ActionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM actions \
             WHERE asset_id = $1 AND item_number = $2 AND item_description = $3 \
               AND {OPEN_PREDICATE}"
        );
        sqlx::query_as::<_, ActionRow>(&query)
            .bind(asset_id)
            .bind(item_number)
            .bind(item_description)
            .fetch_optional(executor)
            .await
    }

    /// List actions with optional filters for asset and status.
    ///
    /// Results are ordered newest-first.
    pub async fn list_filtered(
        pool: &PgPool,
        asset_id: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<ActionRow>, sqlx::Error> {
        let mut conditions: Vec<String> = Vec::new();
        let mut param_idx: usize = 1;

        if asset_id.is_some() {
            conditions.push(format!("asset_id = ${param_idx}"));
            param_idx += 1;
        }
        if status.is_some() {
            conditions.push(format!("status = ${param_idx}"));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!("SELECT {COLUMNS} FROM actions {where_clause} ORDER BY id DESC");
        let mut q = sqlx::query_as::<_, ActionRow>(&query);
        if let Some(asset) = asset_id {
            q = q.bind(asset);
        }
        if let Some(s) = status {
            q = q.bind(s);
        }
        q.fetch_all(pool).await
    }

    /// Insert a pending action unless an open action already holds its key.
    ///
    /// Returns `None` when the partial unique index suppressed the insert.
    pub async fn insert_open<'e>(
        executor: impl PgExecutor<'e>,
        input: &NewAction,
    ) -> Result<Option<ActionRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO actions \
                (asset_id, inspection_id, inspection_item_id, item_number, item_description, \
                 title, description, defect_comment, priority, status, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10) \
             ON CONFLICT (asset_id, item_number, item_description) WHERE {OPEN_PREDICATE} \
             DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionRow>(&query)
            .bind(&input.asset_id)
            .bind(input.inspection_id)
            .bind(input.inspection_item_id)
            .bind(input.item_number)
            .bind(&input.item_description)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.defect_comment)
            .bind(input.priority.as_str())
            .bind(input.created_by)
            .fetch_optional(executor)
            .await
    }

    /// Point an open action at a newer inspection item.
    ///
    /// Returns `None` if the action is gone or no longer open.
    pub async fn attach<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        inspection_id: DbId,
        inspection_item_id: DbId,
    ) -> Result<Option<ActionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE actions SET \
                inspection_id = $2, inspection_item_id = $3, updated_at = NOW() \
             WHERE id = $1 AND {OPEN_PREDICATE} \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionRow>(&query)
            .bind(id)
            .bind(inspection_id)
            .bind(inspection_item_id)
            .fetch_optional(executor)
            .await
    }

    /// Record that an inspection item reported the action's defect.
    /// Recording the same item twice is a no-op.
    pub async fn insert_occurrence<'e>(
        executor: impl PgExecutor<'e>,
        action_id: DbId,
        inspection_id: DbId,
        inspection_item_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO action_occurrences (action_id, inspection_id, inspection_item_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT uq_action_occurrences_item DO NOTHING",
        )
        .bind(action_id)
        .bind(inspection_id)
        .bind(inspection_item_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Occurrences of an action, oldest first.
    pub async fn list_occurrences(
        pool: &PgPool,
        action_id: DbId,
    ) -> Result<Vec<ActionOccurrenceRow>, sqlx::Error> {
        let query = format!(
            "SELECT {OCCURRENCE_COLUMNS} FROM action_occurrences \
             WHERE action_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, ActionOccurrenceRow>(&query)
            .bind(action_id)
            .fetch_all(pool)
            .await
    }

    /// Write the status fields of `next` if the stored status is still
    /// `expected_status`. Returns `None` otherwise.
    pub async fn update_transition(
        pool: &PgPool,
        next: &Action,
        expected_status: &str,
    ) -> Result<Option<ActionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE actions SET \
                status = $2, status_before_completion = $3, \
                logged_comment = $4, logged_at = $5, logged_by = $6, \
                actioned_at = $7, actioned_by = $8, updated_at = $9 \
             WHERE id = $1 AND status = $10 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActionRow>(&query)
            .bind(next.id)
            .bind(next.status.as_str())
            .bind(next.status_before_completion.map(|s| s.as_str()))
            .bind(&next.logged_comment)
            .bind(next.logged_at)
            .bind(next.logged_by)
            .bind(next.actioned_at)
            .bind(next.actioned_by)
            .bind(next.updated_at)
            .bind(expected_status)
            .fetch_optional(pool)
            .await
    }

    /// Delete an action and, by cascade, its occurrences.
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM actions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
