//! Domain core of the fleet defect lifecycle engine.
//!
//! Everything in this crate is transport- and database-agnostic:
//!
//! - [`inspection`]: checklist DTOs and the [`DefectKey`](inspection::DefectKey) identity.
//! - [`defects`]: groups failed checklist items into defect descriptors.
//! - [`action`]: remediation actions and their state machine.
//! - [`lock_registry`]: per-asset view of currently open defects.
//! - [`checklist`]: typed checklist grid with lock pre-fill and the
//!   registry-unavailable gate.
//! - [`sync`]: the action synchronizer.
//! - [`lifecycle`]: persisted action transitions.
//! - [`submission`]: the inspection submission pipeline.
//! - [`store`]: persistence traits and the in-memory store.

pub mod action;
pub mod checklist;
pub mod defects;
pub mod error;
pub mod inspection;
pub mod lifecycle;
pub mod lock_registry;
pub mod store;
pub mod submission;
pub mod sync;
pub mod types;
