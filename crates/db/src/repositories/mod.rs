//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Methods that take part in a transaction accept any [`sqlx::PgExecutor`],
//! so they run against the pool or against `&mut *tx`.

pub mod action_repo;
pub mod inspection_repo;

pub use action_repo::ActionRepo;
pub use inspection_repo::InspectionRepo;
