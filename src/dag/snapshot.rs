// src/dag/snapshot.rs

//! Structural dump of a graph for external rendering.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dag::graph::GraphStore;
use crate::dag::node::{Node, NodeId};
use crate::errors::Result;
use crate::types::{NodeKind, NodeStatus};

#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub status: NodeStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeSnapshot {
    pub from: NodeId,
    pub to: NodeId,
}

/// Nodes, edges and statuses at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    pub created_at: DateTime<Utc>,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

impl<I, O> GraphStore<I, O> {
    /// Structure and statuses only; payloads are left out.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.snapshot_with(|_| None, |_| None)
    }

    fn snapshot_with(
        &self,
        input: impl Fn(&Node<I, O>) -> Option<serde_json::Value>,
        output: impl Fn(&Node<I, O>) -> Option<serde_json::Value>,
    ) -> GraphSnapshot {
        let nodes = self
            .nodes()
            .map(|node| NodeSnapshot {
                id: node.id(),
                name: node.name().to_string(),
                kind: node.kind(),
                status: node.status(),
                created_at: node.created_at(),
                started_at: node.started_at(),
                completed_at: node.completed_at(),
                error: node.failure().map(|reason| reason.to_string()),
                input: input(node),
                output: output(node),
            })
            .collect();

        let mut edges: Vec<EdgeSnapshot> = self
            .edges()
            .into_iter()
            .map(|(from, to)| EdgeSnapshot { from, to })
            .collect();
        edges.sort_by_key(|edge| (edge.from, edge.to));

        GraphSnapshot {
            created_at: self.created_at(),
            nodes,
            edges,
        }
    }
}

impl<I, O> GraphStore<I, O>
where
    I: Serialize,
    O: Serialize,
{
    /// Like [`snapshot`](Self::snapshot), including inputs and outputs.
    pub fn snapshot_with_payloads(&self) -> GraphSnapshot {
        self.snapshot_with(
            |node| serde_json::to_value(node.input()).ok(),
            |node| node.output().and_then(|out| serde_json::to_value(out).ok()),
        )
    }
}

impl GraphSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Graphviz DOT text. Fill colour follows the node kind, border colour
    /// the status.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        out.push_str("digraph QueryGraph {\n");
        out.push_str("  rankdir=TB;\n");
        out.push_str("  node [shape=box, style=filled, penwidth=3];\n");

        for node in &self.nodes {
            let _ = writeln!(
                out,
                "  \"{}\" [label=\"{}\\n({})\", fillcolor=\"{}\", color=\"{}\", fontcolor=\"white\"];",
                node.id,
                escape(&node.name),
                node.status,
                kind_colour(node.kind),
                status_colour(node.status),
            );
        }

        for edge in &self.edges {
            let _ = writeln!(out, "  \"{}\" -> \"{}\";", edge.from, edge.to);
        }

        out.push_str("}\n");
        out
    }
}

fn kind_colour(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Root => "#FF6B6B",
        NodeKind::Task => "#4ECDC4",
        NodeKind::Aggregate => "#45B7D1",
        NodeKind::Terminal => "#96CEB4",
    }
}

fn status_colour(status: NodeStatus) -> &'static str {
    match status {
        NodeStatus::Pending => "#FFA500",
        NodeStatus::Running => "#FFD700",
        NodeStatus::Completed => "#32CD32",
        NodeStatus::Failed => "#DC143C",
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
