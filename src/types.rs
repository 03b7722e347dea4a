// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::QueryDagError;

/// Role a node plays in a decomposed request.
///
/// - `Root`: the original request; usually has no dependencies.
/// - `Task`: one sub-task produced by decomposition (e.g. a search).
/// - `Aggregate`: combines the results of several sub-tasks.
/// - `Terminal`: marks the end of the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Task,
    Aggregate,
    Terminal,
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Task
    }
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Task => "task",
            NodeKind::Aggregate => "aggregate",
            NodeKind::Terminal => "terminal",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = QueryDagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "root" => Ok(NodeKind::Root),
            "task" | "search" => Ok(NodeKind::Task),
            "aggregate" | "result" => Ok(NodeKind::Aggregate),
            "terminal" | "end" => Ok(NodeKind::Terminal),
            other => Err(QueryDagError::InvalidKind(format!(
                "{other} (expected \"root\", \"task\", \"aggregate\" or \"terminal\")"
            ))),
        }
    }
}

/// Lifecycle status of a node.
///
/// Transitions are monotonic: `Pending -> Running -> {Completed, Failed}`.
/// A pending node may also be forced straight to `Failed` when an upstream
/// node fails or the run is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl NodeStatus {
    pub const ALL: [NodeStatus; 4] = [
        NodeStatus::Pending,
        NodeStatus::Running,
        NodeStatus::Completed,
        NodeStatus::Failed,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Failed)
    }

    pub fn can_transition_to(&self, next: NodeStatus) -> bool {
        matches!(
            (self, next),
            (NodeStatus::Pending, NodeStatus::Running)
                | (NodeStatus::Pending, NodeStatus::Failed)
                | (NodeStatus::Running, NodeStatus::Completed)
                | (NodeStatus::Running, NodeStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Completed => "completed",
            NodeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format requested for `--export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Dot,
    Json,
}
