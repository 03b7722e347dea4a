// src/stats.rs

//! Run statistics derived from a graph's final state.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::dag::{GraphStore, NodeId};
use crate::types::{NodeKind, NodeStatus};

/// Per-node line of the statistics report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub status: NodeStatus,
    /// Time between start and completion, for nodes that actually ran.
    pub duration: Option<Duration>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    /// Count per status; every status is always present.
    pub status_counts: BTreeMap<NodeStatus, usize>,
    pub success_rate: f64,
    pub failed_nodes: usize,
    /// Latest completion minus the graph's creation time.
    pub wall_clock: Duration,
    pub nodes: Vec<NodeReport>,
}

impl RunStatistics {
    /// Read-only summary of `store`.
    pub fn collect<I, O>(store: &GraphStore<I, O>) -> Self {
        let mut status_counts: BTreeMap<NodeStatus, usize> =
            NodeStatus::ALL.iter().map(|status| (*status, 0)).collect();
        for node in store.nodes() {
            *status_counts.entry(node.status()).or_default() += 1;
        }

        let completed = status_counts[&NodeStatus::Completed];
        let failed = status_counts[&NodeStatus::Failed];

        let wall_clock = store
            .nodes()
            .filter_map(|node| node.completed_at())
            .max()
            .and_then(|latest| (latest - store.created_at()).to_std().ok())
            .unwrap_or_default();

        let nodes = store
            .nodes()
            .map(|node| NodeReport {
                id: node.id(),
                name: node.name().to_string(),
                kind: node.kind(),
                status: node.status(),
                duration: node.duration().and_then(|d| d.to_std().ok()),
                error: node.failure().map(|reason| reason.to_string()),
            })
            .collect();

        Self {
            total_nodes: store.node_count(),
            total_edges: store.edge_count(),
            status_counts,
            success_rate: success_rate(completed, failed),
            failed_nodes: failed,
            wall_clock,
            nodes,
        }
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }
}

/// `completed / (completed + failed)`; 1.0 when nothing failed.
pub fn success_rate(completed: usize, failed: usize) -> f64 {
    if failed == 0 {
        1.0
    } else {
        completed as f64 / (completed + failed) as f64
    }
}
