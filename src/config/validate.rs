// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{PlanFile, PlanTask, RawPlanFile};
use crate::errors::{QueryDagError, Result};
use crate::types::NodeKind;

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = QueryDagError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;

        let mut tasks = Vec::with_capacity(raw.task.len());
        for (id, task) in raw.task {
            let kind = match task.kind.as_deref() {
                Some(kind) => kind.parse()?,
                None => NodeKind::Task,
            };
            tasks.push(PlanTask {
                id,
                cmd: task.cmd,
                kind,
                after: task.after,
            });
        }

        Ok(PlanFile::new_unchecked(raw.config, raw.scaffold, tasks))
    }
}

fn validate_raw_plan(plan: &RawPlanFile) -> Result<()> {
    ensure_has_tasks(plan)?;
    validate_global_config(plan)?;
    validate_task_kinds(plan)?;
    validate_task_dependencies(plan)?;
    validate_dag(plan)?;
    Ok(())
}

fn ensure_has_tasks(plan: &RawPlanFile) -> Result<()> {
    if plan.task.is_empty() {
        return Err(QueryDagError::ConfigError(
            "plan must contain at least one [task.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(plan: &RawPlanFile) -> Result<()> {
    if plan.config.node_timeout_secs == Some(0) {
        return Err(QueryDagError::ConfigError(
            "[config].node_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    if plan.config.run_timeout_secs == Some(0) {
        return Err(QueryDagError::ConfigError(
            "[config].run_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_kinds(plan: &RawPlanFile) -> Result<()> {
    for task in plan.task.values() {
        if let Some(kind) = &task.kind {
            kind.parse::<NodeKind>()?;
        }
    }
    Ok(())
}

fn validate_task_dependencies(plan: &RawPlanFile) -> Result<()> {
    for (id, task) in plan.task.iter() {
        for dep in task.after.iter() {
            if dep == id {
                return Err(QueryDagError::CycleDetected {
                    from: id.clone(),
                    to: id.clone(),
                });
            }
            if !plan.task.contains_key(dep) {
                return Err(QueryDagError::UnknownNode(format!(
                    "'{}' (dependency of '{}')",
                    dep, id
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(plan: &RawPlanFile) -> Result<()> {
    // Edge direction: dep -> task, so `after = ["a"]` on `b` adds a -> b.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in plan.task.keys() {
        graph.add_node(id.as_str());
    }

    for (id, task) in plan.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            let from = plan
                .task
                .get(node)
                .and_then(|task| task.after.first())
                .cloned()
                .unwrap_or_else(|| node.to_string());
            Err(QueryDagError::CycleDetected {
                from,
                to: node.to_string(),
            })
        }
    }
}
