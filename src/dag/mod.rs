// src/dag/mod.rs

//! Dependency graph for one run.
//!
//! - [`node`] holds the node record, identifiers and typed payloads.
//! - [`graph`] is the graph store: creation, status mutation, readiness.
//! - [`propagation`] cascades a failure to pending dependents.
//! - [`ingest`] turns decomposed sub-tasks into nodes and edges.
//! - [`snapshot`] exports the structure for external rendering.

pub mod graph;
pub mod ingest;
pub mod node;
pub mod propagation;
pub mod snapshot;

pub use graph::GraphStore;
pub use ingest::{PlanIngest, Scaffold, ScaffoldIds, SubTask};
pub use node::{FailureReason, Node, NodeId, NodeOutcome, StatusChange, StatusUpdate};
pub use snapshot::{EdgeSnapshot, GraphSnapshot, NodeSnapshot};
