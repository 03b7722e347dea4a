// src/dag/propagation.rs

//! Failure cascade over the dependents of a failed node.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, info};

use crate::dag::graph::GraphStore;
use crate::dag::node::{FailureReason, NodeId, StatusChange};
use crate::types::NodeStatus;

/// Force every pending node downstream of `origin` to `Failed` with `reason`.
///
/// Breadth-first over the dependents relation. Each node is visited at most
/// once, so diamond joins are only failed once. Traversal continues through
/// nodes that are running or already terminal, because a pending node further
/// down still depends on `origin` transitively. Running nodes are left alone
/// and will report their own outcome.
pub(crate) fn propagate_failure<I, O>(
    store: &mut GraphStore<I, O>,
    origin: NodeId,
    reason: FailureReason,
) -> Vec<StatusChange> {
    let mut queue: VecDeque<NodeId> = store.dependents_of(origin).into_iter().collect();
    let mut visited: HashSet<NodeId> = HashSet::from([origin]);
    let mut changes = Vec::new();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }

        match store.status_of(id) {
            Some(NodeStatus::Pending) => {
                if let Some(change) = store.force_fail_pending(id, reason.clone()) {
                    debug!(node = %id, %origin, %reason, "dependent failed by propagation");
                    changes.push(change);
                }
            }
            Some(NodeStatus::Running) => {
                debug!(node = %id, %origin, "dependent already running; leaving it to finish");
            }
            _ => {}
        }

        queue.extend(
            store
                .dependents_of(id)
                .into_iter()
                .filter(|dep| !visited.contains(dep)),
        );
    }

    if !changes.is_empty() {
        info!(
            %origin,
            failed = changes.len(),
            "failure propagated to pending dependents"
        );
    }

    changes
}
