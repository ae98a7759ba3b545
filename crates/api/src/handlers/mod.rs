pub mod actions;
pub mod defects;
pub mod inspections;
