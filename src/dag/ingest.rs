// src/dag/ingest.rs

//! Translate decomposed sub-tasks into graph nodes and edges.
//!
//! The decomposition step (outside this crate) hands over a list of
//! [`SubTask`]s, each with a caller-chosen local id and the local ids it
//! depends on. [`PlanIngest`] validates the whole batch first, so a rejected
//! batch never leaves a half-built graph behind.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info};

use crate::dag::graph::GraphStore;
use crate::dag::node::NodeId;
use crate::errors::{QueryDagError, Result};
use crate::types::NodeKind;

/// One sub-task as produced by decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct SubTask<I> {
    pub local_id: String,
    pub name: String,
    pub kind: NodeKind,
    pub payload: I,
    pub depends_on: Vec<String>,
}

impl<I> SubTask<I> {
    /// A `Task` node named after its local id, with no dependencies.
    pub fn new(local_id: impl Into<String>, payload: I) -> Self {
        let local_id = local_id.into();
        Self {
            name: local_id.clone(),
            local_id,
            kind: NodeKind::Task,
            payload,
            depends_on: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn after(mut self, dep: impl Into<String>) -> Self {
        self.depends_on.push(dep.into());
        self
    }
}

/// Payloads for the structural nodes wrapped around a plan.
///
/// A scaffolded plan has a single `Root` feeding every sub-task without
/// dependencies, an `Aggregate` fed by every sub-task, and a `Terminal` after
/// the aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaffold<I> {
    pub root: I,
    pub aggregate: I,
    pub terminal: I,
}

/// Node ids created for a scaffolded plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldIds {
    pub root: NodeId,
    pub tasks: Vec<NodeId>,
    pub aggregate: NodeId,
    pub terminal: NodeId,
}

/// Maps local ids to node ids across one or more ingestion batches.
///
/// Later batches may depend on local ids from earlier ones, which supports
/// iterative decomposition.
#[derive(Debug, Clone, Default)]
pub struct PlanIngest {
    ids: BTreeMap<String, NodeId>,
}

impl PlanIngest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_id(&self, local_id: &str) -> Option<NodeId> {
        self.ids.get(local_id).copied()
    }

    pub fn ids(&self) -> &BTreeMap<String, NodeId> {
        &self.ids
    }

    /// Add a batch of sub-tasks to `store`.
    ///
    /// Fails with `DuplicateNode`, `UnknownNode` or `CycleDetected` before
    /// touching the store. Returns the new node ids in batch order.
    pub fn ingest<I, O>(
        &mut self,
        store: &mut GraphStore<I, O>,
        tasks: Vec<SubTask<I>>,
    ) -> Result<Vec<NodeId>> {
        self.validate(&tasks)?;

        let mut created = Vec::with_capacity(tasks.len());
        let mut pending_edges = Vec::new();

        for task in tasks {
            let id = store.add_node(task.name, task.kind, task.payload);
            self.ids.insert(task.local_id, id);
            created.push(id);
            pending_edges.push((id, task.depends_on));
        }

        for (id, deps) in pending_edges {
            for dep in deps {
                let from = self
                    .node_id(&dep)
                    .ok_or_else(|| QueryDagError::UnknownNode(dep.clone()))?;
                store.add_edge(from, id)?;
            }
        }

        info!(
            nodes = created.len(),
            total_nodes = store.node_count(),
            total_edges = store.edge_count(),
            "ingested sub-tasks"
        );

        Ok(created)
    }

    /// Ingest `tasks` wrapped between a root, an aggregate and a terminal node.
    pub fn ingest_scaffolded<I, O>(
        &mut self,
        store: &mut GraphStore<I, O>,
        tasks: Vec<SubTask<I>>,
        scaffold: Scaffold<I>,
    ) -> Result<ScaffoldIds> {
        self.validate(&tasks)?;

        let root = store.add_node("root", NodeKind::Root, scaffold.root);
        let ids = self.ingest(store, tasks)?;

        let aggregate = store.add_node("aggregate", NodeKind::Aggregate, scaffold.aggregate);
        let terminal = store.add_node("terminal", NodeKind::Terminal, scaffold.terminal);

        for &id in &ids {
            if store.dependencies_of(id).is_empty() {
                store.add_edge(root, id)?;
            }
            store.add_edge(id, aggregate)?;
        }
        if ids.is_empty() {
            store.add_edge(root, aggregate)?;
        }
        store.add_edge(aggregate, terminal)?;

        debug!(%root, %aggregate, %terminal, "scaffold wired");

        Ok(ScaffoldIds {
            root,
            tasks: ids,
            aggregate,
            terminal,
        })
    }

    fn validate<I>(&self, tasks: &[SubTask<I>]) -> Result<()> {
        let mut batch: BTreeSet<&str> = BTreeSet::new();
        for task in tasks {
            if self.ids.contains_key(&task.local_id) || !batch.insert(task.local_id.as_str()) {
                return Err(QueryDagError::DuplicateNode(task.local_id.clone()));
            }
        }

        for task in tasks {
            for dep in &task.depends_on {
                if !batch.contains(dep.as_str()) && !self.ids.contains_key(dep) {
                    return Err(QueryDagError::UnknownNode(format!(
                        "'{}' (dependency of '{}')",
                        dep, task.local_id
                    )));
                }
            }
        }

        // Edges from earlier batches always point into this batch, so a cycle
        // can only close between members of the batch itself.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for task in tasks {
            graph.add_node(task.local_id.as_str());
        }
        for task in tasks {
            let to = task.local_id.as_str();
            for dep in task.depends_on.iter().map(String::as_str) {
                if !batch.contains(dep) {
                    continue;
                }
                if dep == to || has_path_connecting(&graph, to, dep, None) {
                    return Err(QueryDagError::CycleDetected {
                        from: dep.to_string(),
                        to: to.to_string(),
                    });
                }
                graph.add_edge(dep, to, ());
            }
        }

        Ok(())
    }
}
