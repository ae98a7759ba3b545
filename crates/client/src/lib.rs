//! Client side of the fleet defect engine.
//!
//! - [`queue`]: durable offline queue and its drain loop.
//! - [`operation`]: typed operations carried by queue entries.
//! - [`http`]: REST client for the fleet API.
//! - [`facade`]: [`FleetClient`], online-first with offline fallback.

pub mod config;
pub mod error;
pub mod facade;
pub mod http;
pub mod operation;
pub mod queue;

pub use facade::FleetClient;
