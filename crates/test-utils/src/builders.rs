#![allow(dead_code)]

use std::collections::BTreeMap;

use querydag::config::{ConfigSection, PlanFile, RawPlanFile, ScaffoldSection, TaskConfig};
use querydag::dag::{GraphStore, NodeId};
use querydag::types::NodeKind;

pub type TestGraph = GraphStore<String, String>;

/// Ids of the diamond built by [`diamond`].
#[derive(Debug, Clone, Copy)]
pub struct Diamond {
    pub a: NodeId,
    pub b: NodeId,
    pub c: NodeId,
    pub d: NodeId,
}

/// `a -> b`, `a -> c`, `b -> d`, `c -> d`.
pub fn diamond() -> (TestGraph, Diamond) {
    let mut g = TestGraph::new();
    let a = g.add_node("a", NodeKind::Task, "a".into());
    let b = g.add_node("b", NodeKind::Task, "b".into());
    let c = g.add_node("c", NodeKind::Task, "c".into());
    let d = g.add_node("d", NodeKind::Task, "d".into());
    g.add_edge(a, b).expect("a -> b");
    g.add_edge(a, c).expect("a -> c");
    g.add_edge(b, d).expect("b -> d");
    g.add_edge(c, d).expect("c -> d");
    (g, Diamond { a, b, c, d })
}

/// Ids of the graph built by [`root_fanout`].
#[derive(Debug, Clone, Copy)]
pub struct Fanout {
    pub root: NodeId,
    pub a: NodeId,
    pub b: NodeId,
    pub end: NodeId,
}

/// `root -> a`, `root -> b`, `a -> end`, `b -> end`.
pub fn root_fanout() -> (TestGraph, Fanout) {
    let mut g = TestGraph::new();
    let root = g.add_node("root", NodeKind::Root, "root".into());
    let a = g.add_node("a", NodeKind::Task, "a".into());
    let b = g.add_node("b", NodeKind::Task, "b".into());
    let end = g.add_node("end", NodeKind::Terminal, "end".into());
    g.add_edge(root, a).expect("root -> a");
    g.add_edge(root, b).expect("root -> b");
    g.add_edge(a, end).expect("a -> end");
    g.add_edge(b, end).expect("b -> end");
    (g, Fanout { root, a, b, end })
}

/// Straight chain `n0 -> n1 -> ... -> n{len-1}`.
pub fn chain(len: usize) -> (TestGraph, Vec<NodeId>) {
    let mut g = TestGraph::new();
    let ids: Vec<NodeId> = (0..len)
        .map(|i| g.add_node(format!("n{i}"), NodeKind::Task, format!("n{i}")))
        .collect();
    for pair in ids.windows(2) {
        g.add_edge(pair[0], pair[1]).expect("chain edge");
    }
    (g, ids)
}

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanFileBuilder {
    plan: RawPlanFile,
}

impl PlanFileBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile {
                config: ConfigSection::default(),
                scaffold: None,
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, id: &str, task: TaskConfig) -> Self {
        self.plan.task.insert(id.to_string(), task);
        self
    }

    pub fn with_scaffold(mut self, aggregate: &str) -> Self {
        self.plan.scaffold = Some(ScaffoldSection {
            aggregate: aggregate.to_string(),
            ..ScaffoldSection::default()
        });
        self
    }

    pub fn raw(self) -> RawPlanFile {
        self.plan
    }

    pub fn build(self) -> PlanFile {
        PlanFile::try_from(self.plan).expect("Failed to build valid plan from builder")
    }
}

impl Default for PlanFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                kind: None,
                after: vec![],
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn kind(mut self, kind: &str) -> Self {
        self.task.kind = Some(kind.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
