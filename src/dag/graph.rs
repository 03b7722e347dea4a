// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, error, warn};

use crate::dag::node::{FailureReason, Node, NodeId, StatusChange, StatusUpdate};
use crate::dag::propagation::propagate_failure;
use crate::errors::{QueryDagError, Result};
use crate::types::{NodeKind, NodeStatus};

/// Owns every node and edge of a single run.
///
/// Edge direction is `dependency -> dependent`: an edge `A -> B` means `B`
/// cannot start until `A` has completed. Dependencies, dependents and the
/// ready set are derived from the edge map on demand rather than cached.
///
/// `I` is the per-node input (the sub-task description) and `O` the result an
/// executor produces for it.
#[derive(Debug, Clone)]
pub struct GraphStore<I, O> {
    nodes: BTreeMap<NodeId, Node<I, O>>,
    edges: DiGraphMap<NodeId, ()>,
    next_id: u64,
    created_at: DateTime<Utc>,
}

impl<I, O> Default for GraphStore<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> GraphStore<I, O> {
    /// Create an empty graph. Its creation time is the start of the run.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: DiGraphMap::new(),
            next_id: 0,
            created_at: Utc::now(),
        }
    }

    /// Add a `Pending` node and return its fresh identifier.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind, input: I) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;

        let node = Node::new(id, name.into(), kind, input);
        debug!(node = %id, name = %node.name(), %kind, "added node");

        self.nodes.insert(id, node);
        self.edges.add_node(id);
        id
    }

    /// Record that `to` depends on `from`.
    ///
    /// Rejected with `UnknownNode` if an endpoint is missing and with
    /// `CycleDetected` if `to` can already reach `from`. A rejected edge leaves
    /// the graph untouched. Adding an existing edge again is a no-op.
    ///
    /// If `from` has already failed, its failure is cascaded over the new edge
    /// right away, so a pending `to` can never wait on it. The returned list
    /// holds those cascaded changes and is empty otherwise.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<Vec<StatusChange>> {
        for id in [from, to] {
            if !self.nodes.contains_key(&id) {
                return Err(QueryDagError::UnknownNode(id.to_string()));
            }
        }

        if from == to || has_path_connecting(&self.edges, to, from, None) {
            warn!(%from, %to, "rejecting edge that would create a cycle");
            return Err(QueryDagError::CycleDetected {
                from: self.label(from),
                to: self.label(to),
            });
        }

        if self.edges.add_edge(from, to, ()).is_none() {
            debug!(%from, %to, "added edge");
        }

        let cascade = match self.nodes.get(&from).and_then(|node| node.failure()) {
            Some(reason) if self.status_of(to) == Some(NodeStatus::Pending) => {
                reason.cascade(from)
            }
            _ => return Ok(Vec::new()),
        };
        warn!(%from, %to, "edge from a failed node; cascading failure");
        Ok(propagate_failure(self, from, cascade))
    }

    /// Direct dependencies of `id` (nodes it waits for).
    pub fn dependencies_of(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct dependents of `id` (nodes waiting for it).
    pub fn dependents_of(&self, id: NodeId) -> Vec<NodeId> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: NodeId, dir: Direction) -> Vec<NodeId> {
        if !self.edges.contains_node(id) {
            return Vec::new();
        }
        self.edges.neighbors_directed(id, dir).collect()
    }

    /// Pending nodes whose dependencies have all completed.
    ///
    /// Callers must not rely on any particular order.
    pub fn get_ready_nodes(&self) -> BTreeSet<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.status() == NodeStatus::Pending)
            .filter(|node| {
                self.edges
                    .neighbors_directed(node.id(), Direction::Incoming)
                    .all(|dep| self.status_of(dep) == Some(NodeStatus::Completed))
            })
            .map(|node| node.id())
            .collect()
    }

    /// Apply a status change, enforcing the monotonic lifecycle.
    ///
    /// A transition to `Failed` cascades to pending dependents before this
    /// returns. The returned list holds the node's own change first, followed
    /// by any cascaded changes.
    pub fn update_status(
        &mut self,
        id: NodeId,
        update: StatusUpdate<O>,
    ) -> Result<Vec<StatusChange>> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| QueryDagError::UnknownNode(id.to_string()))?;

        let from = node.status();
        let to = update.target_status();
        if !from.can_transition_to(to) {
            error!(node = %id, %from, %to, "illegal status transition");
            return Err(QueryDagError::InvalidTransition { node: id, from, to });
        }

        let reason = match &update {
            StatusUpdate::Failed(reason) => Some(reason.clone()),
            _ => None,
        };

        node.apply(update);
        debug!(node = %id, %from, %to, "status updated");

        let mut changes = vec![StatusChange {
            node: id,
            kind: node.kind(),
            status: to,
            reason: reason.clone(),
        }];

        if let Some(reason) = reason {
            let cascade = reason.cascade(id);
            changes.extend(propagate_failure(self, id, cascade));
        }

        Ok(changes)
    }

    /// True when every node is `Completed` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        self.nodes.values().all(|node| node.status().is_terminal())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<I, O>> {
        self.nodes.get(&id)
    }

    /// All nodes, in identifier (creation) order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<I, O>> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn status_of(&self, id: NodeId) -> Option<NodeStatus> {
        self.nodes.get(&id).map(|node| node.status())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.edge_count()
    }

    /// All `(from, to)` pairs.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.edges.all_edges().map(|(from, to, _)| (from, to)).collect()
    }

    pub fn count_with_status(&self, status: NodeStatus) -> usize {
        self.nodes
            .values()
            .filter(|node| node.status() == status)
            .count()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Force a pending node to `Failed` without further propagation.
    ///
    /// Only the propagation traversal calls this; it owns the cascade.
    pub(crate) fn force_fail_pending(
        &mut self,
        id: NodeId,
        reason: FailureReason,
    ) -> Option<StatusChange> {
        let node = self.nodes.get_mut(&id)?;
        if node.status() != NodeStatus::Pending {
            return None;
        }
        node.apply(StatusUpdate::Failed(reason.clone()));
        Some(StatusChange {
            node: id,
            kind: node.kind(),
            status: NodeStatus::Failed,
            reason: Some(reason),
        })
    }

    fn label(&self, id: NodeId) -> String {
        match self.nodes.get(&id) {
            Some(node) => format!("{} ({})", node.name(), id),
            None => id.to_string(),
        }
    }
}
