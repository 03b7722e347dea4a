// src/errors.rs

//! Crate-wide error types.
//!
//! [`QueryDagError`] covers structural problems (raised while building the
//! graph), consistency violations (raised while scheduling) and the ambient
//! IO/config failures. [`ExecutionError`] is the per-node error an executor
//! reports; it never aborts a run on its own.

use std::time::Duration;

use thiserror::Error;

use crate::dag::NodeId;
use crate::types::NodeStatus;

#[derive(Error, Debug)]
pub enum QueryDagError {
    #[error("Invalid node kind: {0}")]
    InvalidKind(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Cycle detected: edge {from} -> {to} would close a cycle")]
    CycleDetected { from: String, to: String },

    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    #[error("Invalid transition for node {node}: {from} -> {to}")]
    InvalidTransition {
        node: NodeId,
        from: NodeStatus,
        to: NodeStatus,
    },

    #[error("Scheduler stalled: {} pending node(s) can never become ready", pending.len())]
    Stalled { pending: Vec<NodeId> },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Error reported by an executor for a single node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("{0}")]
    Failed(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("executor panicked: {0}")]
    Panicked(String),

    #[error("cancelled")]
    Cancelled,
}

impl ExecutionError {
    pub fn failed(msg: impl Into<String>) -> Self {
        ExecutionError::Failed(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, QueryDagError>;
