// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::{GraphStore, PlanIngest, Scaffold, ScaffoldIds, SubTask};
use crate::engine::RunOptions;
use crate::errors::Result;
use crate::types::NodeKind;

/// Plan file exactly as read from TOML.
///
/// ```toml
/// [config]
/// node_timeout_secs = 30
/// run_timeout_secs = 300
///
/// [scaffold]
/// aggregate = "cat"
///
/// [task.rust_perf]
/// cmd = "echo rust"
///
/// [task.compare]
/// cmd = "sort"
/// kind = "aggregate"
/// after = ["rust_perf"]
/// ```
///
/// Only `[task.*]` is required. Use [`PlanFile`] (via `TryFrom`) for anything
/// beyond deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// When present, tasks are wrapped between root, aggregate and terminal
    /// nodes.
    #[serde(default)]
    pub scaffold: Option<ScaffoldSection>,

    /// Keys are the tasks' local ids.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default)]
    pub node_timeout_secs: Option<u64>,

    /// Cancels the run once elapsed.
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,

    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,
}

fn default_cancel_grace_ms() -> u64 {
    500
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            node_timeout_secs: None,
            run_timeout_secs: None,
            cancel_grace_ms: default_cancel_grace_ms(),
        }
    }
}

impl ConfigSection {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            node_timeout: self.node_timeout_secs.map(Duration::from_secs),
            run_timeout: self.run_timeout_secs.map(Duration::from_secs),
            cancel_grace: Duration::from_millis(self.cancel_grace_ms),
        }
    }
}

/// `[scaffold]` section: commands for the structural nodes. An empty command
/// forwards its upstream outputs unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScaffoldSection {
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub aggregate: String,
    #[serde(default)]
    pub terminal: String,
}

/// `[task.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub cmd: String,

    /// Node kind name; defaults to `task`.
    #[serde(default)]
    pub kind: Option<String>,

    /// Local ids this task waits for.
    #[serde(default)]
    pub after: Vec<String>,
}

/// One validated task.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTask {
    pub id: String,
    pub cmd: String,
    pub kind: NodeKind,
    pub after: Vec<String>,
}

/// A validated plan.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub config: ConfigSection,
    pub scaffold: Option<ScaffoldSection>,
    pub tasks: Vec<PlanTask>,
}

/// Graph built from a plan, plus the id mapping used to build it.
#[derive(Debug, Clone)]
pub struct BuiltPlan {
    pub graph: GraphStore<String, String>,
    pub ids: PlanIngest,
    pub scaffold: Option<ScaffoldIds>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        scaffold: Option<ScaffoldSection>,
        tasks: Vec<PlanTask>,
    ) -> Self {
        Self {
            config,
            scaffold,
            tasks,
        }
    }

    pub fn run_options(&self) -> RunOptions {
        self.config.run_options()
    }

    pub fn sub_tasks(&self) -> Vec<SubTask<String>> {
        self.tasks
            .iter()
            .map(|task| {
                let mut sub = SubTask::new(task.id.clone(), task.cmd.clone()).kind(task.kind);
                for dep in &task.after {
                    sub = sub.after(dep.clone());
                }
                sub
            })
            .collect()
    }

    /// Build a fresh graph holding every task of the plan.
    pub fn build_graph(&self) -> Result<BuiltPlan> {
        let mut graph = GraphStore::new();
        let mut ids = PlanIngest::new();

        let scaffold = match &self.scaffold {
            Some(section) => {
                let scaffold = Scaffold {
                    root: section.root.clone(),
                    aggregate: section.aggregate.clone(),
                    terminal: section.terminal.clone(),
                };
                Some(ids.ingest_scaffolded(&mut graph, self.sub_tasks(), scaffold)?)
            }
            None => {
                ids.ingest(&mut graph, self.sub_tasks())?;
                None
            }
        };

        Ok(BuiltPlan {
            graph,
            ids,
            scaffold,
        })
    }
}
