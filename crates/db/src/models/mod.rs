//! Database row structs.
//!
//! Each submodule contains a `FromRow` struct per table and a `TryFrom`
//! conversion into the matching `fleet-core` type. Status columns are stored
//! as text and parsed on the way out.

pub mod action;
pub mod inspection;

use fleet_core::error::CoreError;
use fleet_core::store::StoreError;

/// Wrap a column parse failure for `table`.
pub(crate) fn corrupt(table: &str, id: i64, err: CoreError) -> StoreError {
    StoreError::Corrupt(format!("{table} row {id}: {err}"))
}
