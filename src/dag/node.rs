// src/dag/node.rs

//! Node records and the typed payloads that flow through them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{NodeKind, NodeStatus};

/// Identifier of a node inside one [`GraphStore`](crate::dag::GraphStore).
///
/// Identifiers come from a per-store counter and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Why a node ended up `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The executor reported an error for this node.
    Execution(String),
    /// A node this one (transitively) depends on failed; the node never ran.
    UpstreamFailed { origin: NodeId },
    /// The run was cancelled before this node finished.
    Cancelled,
}

impl FailureReason {
    /// Reason applied to the dependents of a node that failed with `self`.
    pub fn cascade(&self, origin: NodeId) -> FailureReason {
        match self {
            FailureReason::Cancelled => FailureReason::Cancelled,
            _ => FailureReason::UpstreamFailed { origin },
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, FailureReason::UpstreamFailed { .. })
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Execution(msg) => write!(f, "execution error: {msg}"),
            FailureReason::UpstreamFailed { origin } => {
                write!(f, "upstream dependency failed (origin {origin})")
            }
            FailureReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Terminal outcome stored on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOutcome<O> {
    Completed(O),
    Failed(FailureReason),
}

/// Requested status change, carrying the payload that goes with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate<O> {
    Running,
    Completed(O),
    Failed(FailureReason),
}

impl<O> StatusUpdate<O> {
    pub fn target_status(&self) -> NodeStatus {
        match self {
            StatusUpdate::Running => NodeStatus::Running,
            StatusUpdate::Completed(_) => NodeStatus::Completed,
            StatusUpdate::Failed(_) => NodeStatus::Failed,
        }
    }
}

/// A status transition that was actually applied to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub node: NodeId,
    pub kind: NodeKind,
    pub status: NodeStatus,
    pub reason: Option<FailureReason>,
}

/// One schedulable unit of work.
///
/// Fields are private: status and outcome only change through
/// [`GraphStore::update_status`](crate::dag::GraphStore::update_status).
#[derive(Debug, Clone)]
pub struct Node<I, O> {
    id: NodeId,
    name: String,
    kind: NodeKind,
    status: NodeStatus,
    input: I,
    outcome: Option<NodeOutcome<O>>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl<I, O> Node<I, O> {
    pub(crate) fn new(id: NodeId, name: String, kind: NodeKind, input: I) -> Self {
        Self {
            id,
            name,
            kind,
            status: NodeStatus::Pending,
            input,
            outcome: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn outcome(&self) -> Option<&NodeOutcome<O>> {
        self.outcome.as_ref()
    }

    /// Result produced by the executor, if the node completed.
    pub fn output(&self) -> Option<&O> {
        match &self.outcome {
            Some(NodeOutcome::Completed(out)) => Some(out),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.outcome {
            Some(NodeOutcome::Failed(reason)) => Some(reason),
            _ => None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Time spent running, for nodes that both started and finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Apply an already-validated update.
    pub(crate) fn apply(&mut self, update: StatusUpdate<O>) {
        let now = Utc::now();
        self.status = update.target_status();
        match update {
            StatusUpdate::Running => {
                self.started_at = Some(now);
            }
            StatusUpdate::Completed(out) => {
                self.outcome = Some(NodeOutcome::Completed(out));
                self.completed_at = Some(now);
            }
            StatusUpdate::Failed(reason) => {
                self.outcome = Some(NodeOutcome::Failed(reason));
                self.completed_at = Some(now);
            }
        }
    }
}
