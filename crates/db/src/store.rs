//! Postgres implementation of the `fleet-core` store traits.
//!
//! Writes that must be atomic run in one transaction. Uniqueness of open
//! actions is enforced by `uq_actions_open_defect`, not by the lookup.

use async_trait::async_trait;
use fleet_core::action::{Action, ActionOccurrence, ActionStatus, NewAction, NewOccurrence};
use fleet_core::inspection::{DefectKey, InspectionItem, NewInspection, StoredInspection};
use fleet_core::store::{
    ActionFilter, ActionStore, InsertOutcome, InspectionStore, SavedInspection, StoreError,
};
use fleet_core::types::DbId;
use sqlx::PgPool;

use crate::models::inspection::InspectionRow;
use crate::repositories::{ActionRepo, InspectionRepo};

/// Attempts at inserting an open action before giving up.
const MAX_INSERT_ATTEMPTS: usize = 3;

/// Store backed by a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Classify a sqlx error into a [`StoreError`].
///
/// - Unique violations (`23505`) on `uq_`-prefixed constraints become `Conflict`.
/// - Connection and pool failures become `Unavailable`.
/// - Everything else becomes `Backend`.
pub fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return StoreError::Conflict(format!(
                        "Duplicate value violates unique constraint: {constraint}"
                    ));
                }
            }
            tracing::error!(error = %db_err, "Database error");
            StoreError::Backend(db_err.to_string())
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => StoreError::Unavailable(err.to_string()),
        other => {
            tracing::error!(error = %other, "Database error");
            StoreError::Backend(other.to_string())
        }
    }
}

fn to_actions(rows: Vec<crate::models::action::ActionRow>) -> Result<Vec<Action>, StoreError> {
    rows.into_iter().map(Action::try_from).collect()
}

impl PgStore {
    async fn stored_inspection(&self, row: InspectionRow) -> Result<StoredInspection, StoreError> {
        let items = InspectionRepo::list_items(&self.pool, row.id)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(InspectionItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StoredInspection {
            inspection: row.into(),
            items,
        })
    }
}

#[async_trait]
impl ActionStore for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(store_error)
    }

    async fn list_open_actions(&self, asset_id: &str) -> Result<Vec<Action>, StoreError> {
        let rows = ActionRepo::list_open_for_asset(&self.pool, asset_id)
            .await
            .map_err(store_error)?;
        to_actions(rows)
    }

    async fn find_open_action(&self, key: &DefectKey) -> Result<Option<Action>, StoreError> {
        ActionRepo::find_open_by_key(
            &self.pool,
            &key.asset_id,
            key.item_number,
            &key.item_description,
        )
        .await
        .map_err(store_error)?
        .map(Action::try_from)
        .transpose()
    }

    async fn list_actions(&self, filter: &ActionFilter) -> Result<Vec<Action>, StoreError> {
        let rows = ActionRepo::list_filtered(
            &self.pool,
            filter.asset_id.as_deref(),
            filter.status.map(ActionStatus::as_str),
        )
        .await
        .map_err(store_error)?;
        to_actions(rows)
    }

    async fn get_action(&self, id: DbId) -> Result<Option<Action>, StoreError> {
        ActionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)?
            .map(Action::try_from)
            .transpose()
    }

    async fn find_action_for_item(
        &self,
        inspection_item_id: DbId,
    ) -> Result<Option<Action>, StoreError> {
        ActionRepo::find_by_occurrence_item(&self.pool, inspection_item_id)
            .await
            .map_err(store_error)?
            .map(Action::try_from)
            .transpose()
    }

    async fn insert_open_action(&self, new: &NewAction) -> Result<InsertOutcome, StoreError> {
        for _ in 0..MAX_INSERT_ATTEMPTS {
            let mut tx = self.pool.begin().await.map_err(store_error)?;

            if let Some(row) = ActionRepo::insert_open(&mut *tx, new)
                .await
                .map_err(store_error)?
            {
                ActionRepo::insert_occurrence(
                    &mut *tx,
                    row.id,
                    new.inspection_id,
                    new.inspection_item_id,
                )
                .await
                .map_err(store_error)?;
                tx.commit().await.map_err(store_error)?;
                return Ok(InsertOutcome::Created(row.try_into()?));
            }

            let existing = ActionRepo::find_open_by_key(
                &mut *tx,
                &new.asset_id,
                new.item_number,
                &new.item_description,
            )
            .await
            .map_err(store_error)?;
            tx.commit().await.map_err(store_error)?;

            if let Some(row) = existing {
                return Ok(InsertOutcome::Existing(row.try_into()?));
            }
            // The holder was closed between the insert and the lookup.
        }

        Err(StoreError::Conflict(format!(
            "uq_actions_open_defect: open action for item {} kept changing",
            new.item_number
        )))
    }

    async fn attach_occurrence(
        &self,
        action_id: DbId,
        occurrence: &NewOccurrence,
    ) -> Result<Option<Action>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let Some(row) = ActionRepo::attach(
            &mut *tx,
            action_id,
            occurrence.inspection_id,
            occurrence.inspection_item_id,
        )
        .await
        .map_err(store_error)?
        else {
            return Ok(None);
        };

        ActionRepo::insert_occurrence(
            &mut *tx,
            action_id,
            occurrence.inspection_id,
            occurrence.inspection_item_id,
        )
        .await
        .map_err(store_error)?;
        tx.commit().await.map_err(store_error)?;

        Ok(Some(row.try_into()?))
    }

    async fn list_occurrences(
        &self,
        action_id: DbId,
    ) -> Result<Vec<ActionOccurrence>, StoreError> {
        let rows = ActionRepo::list_occurrences(&self.pool, action_id)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(ActionOccurrence::from).collect())
    }

    async fn save_transition(
        &self,
        next: &Action,
        expected: ActionStatus,
    ) -> Result<Option<Action>, StoreError> {
        ActionRepo::update_transition(&self.pool, next, expected.as_str())
            .await
            .map_err(store_error)?
            .map(Action::try_from)
            .transpose()
    }

    async fn delete_action(&self, id: DbId) -> Result<bool, StoreError> {
        ActionRepo::delete(&self.pool, id)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl InspectionStore for PgStore {
    async fn save_inspection(&self, new: &NewInspection) -> Result<SavedInspection, StoreError> {
        if let Some(client_ref) = new.client_ref {
            if let Some(row) = InspectionRepo::find_by_client_ref(&self.pool, client_ref)
                .await
                .map_err(store_error)?
            {
                return Ok(SavedInspection {
                    stored: self.stored_inspection(row).await?,
                    replayed: true,
                });
            }
        }

        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let Some(row) = InspectionRepo::insert(&mut *tx, new)
            .await
            .map_err(store_error)?
        else {
            // A concurrent replay with the same client_ref won the insert.
            tx.rollback().await.map_err(store_error)?;
            let client_ref = new.client_ref.ok_or_else(|| {
                StoreError::Backend("inspection insert returned no row".to_string())
            })?;
            let row = InspectionRepo::find_by_client_ref(&self.pool, client_ref)
                .await
                .map_err(store_error)?
                .ok_or_else(|| {
                    StoreError::Backend(format!("inspection for client_ref {client_ref} vanished"))
                })?;
            return Ok(SavedInspection {
                stored: self.stored_inspection(row).await?,
                replayed: true,
            });
        };

        let mut items = Vec::with_capacity(new.items.len());
        for item in &new.items {
            let item_row = InspectionRepo::insert_item(&mut *tx, row.id, &row.asset_id, item)
                .await
                .map_err(store_error)?;
            items.push(InspectionItem::try_from(item_row)?);
        }
        tx.commit().await.map_err(store_error)?;

        items.sort_by_key(|i| (i.day_of_week, i.item_number));
        Ok(SavedInspection {
            stored: StoredInspection {
                inspection: row.into(),
                items,
            },
            replayed: false,
        })
    }

    async fn get_inspection(&self, id: DbId) -> Result<Option<StoredInspection>, StoreError> {
        match InspectionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(store_error)?
        {
            Some(row) => Ok(Some(self.stored_inspection(row).await?)),
            None => Ok(None),
        }
    }
}
