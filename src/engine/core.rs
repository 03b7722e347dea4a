// src/engine/core.rs

//! Pure scheduling state machine.
//!
//! [`CoreScheduler`] owns the graph store for one run and is the only place
//! where node status changes. It decides which nodes to dispatch, records
//! completions fed back by the IO shell, and handles cancellation. It has no
//! channels, no Tokio types and performs no IO, so it can be stepped by hand
//! in tests.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, error, info, warn};

use crate::dag::{FailureReason, GraphStore, NodeId, StatusChange, StatusUpdate};
use crate::engine::{CoreStep, DispatchedNode, Phase, UpstreamOutput};
use crate::errors::{ExecutionError, QueryDagError, Result};
use crate::progress::{NoProgress, ProgressEvent, ProgressSink};
use crate::types::NodeStatus;

pub struct CoreScheduler<I, O> {
    store: GraphStore<I, O>,
    in_flight: BTreeSet<NodeId>,
    phase: Phase,
    /// Every non-empty ready set that was dispatched, in order.
    history: Vec<BTreeSet<NodeId>>,
    progress: Box<dyn ProgressSink>,
}

impl<I, O> fmt::Debug for CoreScheduler<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreScheduler")
            .field("nodes", &self.store.node_count())
            .field("edges", &self.store.edge_count())
            .field("in_flight", &self.in_flight)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl<I: Clone, O: Clone> CoreScheduler<I, O> {
    pub fn new(store: GraphStore<I, O>) -> Self {
        Self {
            store,
            in_flight: BTreeSet::new(),
            phase: Phase::Idle,
            history: Vec::new(),
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(sink);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn store(&self) -> &GraphStore<I, O> {
        &self.store
    }

    pub fn into_store(self) -> GraphStore<I, O> {
        self.store
    }

    pub fn in_flight(&self) -> &BTreeSet<NodeId> {
        &self.in_flight
    }

    pub fn dispatch_history(&self) -> &[BTreeSet<NodeId>] {
        &self.history
    }

    /// Nodes still waiting to run.
    pub fn pending_nodes(&self) -> Vec<NodeId> {
        self.store
            .nodes()
            .filter(|node| node.status() == NodeStatus::Pending)
            .map(|node| node.id())
            .collect()
    }

    /// Advance the state machine by one scheduling step.
    ///
    /// Ready nodes are marked `Running` and returned for dispatch. An empty
    /// ready set with work still in flight means "wait". An empty ready set
    /// with nothing in flight on a non-terminal graph can never make progress
    /// and is reported as `Stalled`.
    pub fn next_step(&mut self) -> Result<CoreStep<I, O>> {
        if self.store.is_terminal() {
            if self.phase != Phase::Done {
                info!(nodes = self.store.node_count(), "all nodes terminal; run finished");
            }
            self.phase = Phase::Done;
            return Ok(CoreStep::Done);
        }

        self.phase = Phase::Scheduling;
        let ready = self.store.get_ready_nodes();

        if ready.is_empty() {
            if !self.in_flight.is_empty() {
                debug!(in_flight = self.in_flight.len(), "nothing ready; awaiting completions");
                self.phase = Phase::Awaiting;
                return Ok(CoreStep::Await);
            }

            let pending = self.pending_nodes();
            error!(?pending, "no ready nodes and nothing in flight on a non-terminal graph");
            return Err(QueryDagError::Stalled { pending });
        }

        debug!(?ready, "dispatching ready nodes");
        self.history.push(ready.clone());

        let mut batch = Vec::with_capacity(ready.len());
        for id in ready {
            let changes = self.store.update_status(id, StatusUpdate::Running)?;
            self.in_flight.insert(id);
            self.notify(&changes);
            batch.push(self.dispatched(id)?);
        }

        self.phase = Phase::Awaiting;
        Ok(CoreStep::Dispatch(batch))
    }

    /// Record the executor's outcome for an in-flight node.
    pub fn complete(
        &mut self,
        id: NodeId,
        result: std::result::Result<O, ExecutionError>,
    ) -> Result<()> {
        if !self.in_flight.remove(&id) {
            if let Some(FailureReason::Cancelled) = self.store.node(id).and_then(|n| n.failure()) {
                warn!(node = %id, "late completion for an abandoned node; ignoring");
                return Ok(());
            }
            warn!(node = %id, "completion for a node that was not in flight");
        }

        let update = match result {
            Ok(output) => {
                debug!(node = %id, "node completed");
                StatusUpdate::Completed(output)
            }
            Err(ExecutionError::Cancelled) => {
                info!(node = %id, "node stopped by cancellation");
                StatusUpdate::Failed(FailureReason::Cancelled)
            }
            Err(err) => {
                warn!(node = %id, error = %err, "node execution failed");
                StatusUpdate::Failed(FailureReason::Execution(err.to_string()))
            }
        };

        let changes = self.store.update_status(id, update)?;
        self.notify(&changes);
        self.phase = Phase::Scheduling;
        Ok(())
    }

    /// Fail every pending node with `Cancelled`.
    ///
    /// Goes through the regular propagation path, so dependents of a cancelled
    /// node are cancelled too. In-flight nodes are left alone. Returns how many
    /// nodes were failed.
    pub fn cancel(&mut self) -> Result<usize> {
        let mut failed = 0;
        for id in self.pending_nodes() {
            if self.store.status_of(id) != Some(NodeStatus::Pending) {
                // Already cancelled through an earlier node's cascade.
                continue;
            }
            let changes = self
                .store
                .update_status(id, StatusUpdate::Failed(FailureReason::Cancelled))?;
            failed += changes.len();
            self.notify(&changes);
        }

        if failed > 0 {
            warn!(failed, in_flight = self.in_flight.len(), "run cancelled; pending nodes failed");
        }
        Ok(failed)
    }

    /// Give up on every in-flight node, failing it with `Cancelled`.
    pub fn abandon_in_flight(&mut self) -> Result<usize> {
        let abandoned = std::mem::take(&mut self.in_flight);
        for &id in &abandoned {
            warn!(node = %id, "abandoning in-flight node");
            let changes = self
                .store
                .update_status(id, StatusUpdate::Failed(FailureReason::Cancelled))?;
            self.notify(&changes);
        }
        Ok(abandoned.len())
    }

    fn dispatched(&self, id: NodeId) -> Result<DispatchedNode<I, O>> {
        let node = self
            .store
            .node(id)
            .ok_or_else(|| QueryDagError::UnknownNode(id.to_string()))?;

        let upstream = self
            .store
            .dependencies_of(id)
            .into_iter()
            .filter_map(|dep| {
                let dep_node = self.store.node(dep)?;
                Some(UpstreamOutput {
                    id: dep,
                    name: dep_node.name().to_string(),
                    output: dep_node.output()?.clone(),
                })
            })
            .collect();

        Ok(DispatchedNode {
            id,
            name: node.name().to_string(),
            kind: node.kind(),
            input: node.input().clone(),
            upstream,
        })
    }

    fn notify(&mut self, changes: &[StatusChange]) {
        let ready = self.store.get_ready_nodes().len();
        for change in changes {
            let name = self
                .store
                .node(change.node)
                .map(|node| node.name().to_string())
                .unwrap_or_default();
            let event = ProgressEvent {
                node: change.node,
                name,
                kind: change.kind,
                status: change.status,
                reason: change.reason.clone(),
                ready,
            };
            self.progress.on_transition(&event);
        }
    }
}
