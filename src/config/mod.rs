// src/config/mod.rs

//! Plan files for the `querydag` binary.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a plan file from disk (`loader.rs`).
//! - Validate kinds, dependencies and cycles (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{BuiltPlan, ConfigSection, PlanFile, PlanTask, RawPlanFile, ScaffoldSection, TaskConfig};
