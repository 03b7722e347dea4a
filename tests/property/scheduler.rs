use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;
use querydag::dag::{FailureReason, GraphStore, NodeId};
use querydag::engine::{CoreScheduler, CoreStep};
use querydag::errors::{ExecutionError, QueryDagError};
use querydag::stats::RunStatistics;
use querydag::types::{NodeKind, NodeStatus};

/// Random DAG as dependency lists; node `i` may only depend on nodes `0..i`,
/// which keeps it acyclic.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..n), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        if i == 0 {
                            BTreeSet::new()
                        } else {
                            deps.into_iter().map(|d| d % i).collect()
                        }
                    })
                    .collect()
            },
        )
    })
}

fn build(deps: &[BTreeSet<usize>]) -> (GraphStore<usize, usize>, Vec<NodeId>) {
    let mut g = GraphStore::new();
    let ids: Vec<NodeId> = (0..deps.len())
        .map(|i| g.add_node(format!("n{i}"), NodeKind::Task, i))
        .collect();
    for (i, node_deps) in deps.iter().enumerate() {
        for &d in node_deps {
            g.add_edge(ids[d], ids[i]).unwrap();
        }
    }
    (g, ids)
}

/// Transitive ancestors of `i`.
fn ancestors(deps: &[BTreeSet<usize>], i: usize) -> HashSet<usize> {
    let mut seen = HashSet::new();
    let mut stack: Vec<usize> = deps[i].iter().copied().collect();
    while let Some(d) = stack.pop() {
        if seen.insert(d) {
            stack.extend(deps[d].iter().copied());
        }
    }
    seen
}

proptest! {
    #[test]
    fn random_dags_always_terminate(
        deps in dag_strategy(12),
        failing in proptest::collection::hash_set(0..12usize, 0..4),
        // Number of in-flight nodes completed per round.
        batch in 1..4usize,
    ) {
        let (g, ids) = build(&deps);
        let mut core = CoreScheduler::new(g);
        let mut executed: HashSet<usize> = HashSet::new();
        let mut queue: Vec<NodeId> = Vec::new();

        // Upper bound on scheduling rounds; every round makes progress.
        for _ in 0..(deps.len() * 4 + 4) {
            match core.next_step().unwrap() {
                CoreStep::Done => break,
                CoreStep::Dispatch(nodes) => {
                    for node in nodes {
                        executed.insert(node.input);
                        queue.push(node.id);
                    }
                }
                CoreStep::Await => {
                    let take = batch.min(queue.len());
                    for id in queue.drain(..take).collect::<Vec<_>>() {
                        let idx = ids.iter().position(|x| *x == id).unwrap();
                        let result = if failing.contains(&idx) {
                            Err(ExecutionError::failed("boom"))
                        } else {
                            Ok(idx)
                        };
                        core.complete(id, result).unwrap();
                    }
                }
            }
        }

        let store = core.store();
        prop_assert!(store.is_terminal());

        for i in 0..deps.len() {
            let anc = ancestors(&deps, i);
            let failed_ancestor = anc.iter().any(|a| failing.contains(a));
            if failed_ancestor {
                // Never dispatched, failed by propagation.
                prop_assert!(!executed.contains(&i));
                prop_assert_eq!(store.status_of(ids[i]), Some(NodeStatus::Failed));
                let reason = store.node(ids[i]).unwrap().failure().cloned();
                prop_assert!(reason.as_ref().is_some_and(FailureReason::is_upstream));
            } else {
                prop_assert!(executed.contains(&i));
                let expected = if failing.contains(&i) {
                    NodeStatus::Failed
                } else {
                    NodeStatus::Completed
                };
                prop_assert_eq!(store.status_of(ids[i]), Some(expected));
            }
        }

        let stats = RunStatistics::collect(store);
        let completed = stats.count(NodeStatus::Completed);
        let failed = stats.count(NodeStatus::Failed);
        prop_assert_eq!(completed + failed, deps.len());
        if failed == 0 {
            prop_assert_eq!(stats.success_rate, 1.0);
        } else {
            let expected = completed as f64 / (completed + failed) as f64;
            prop_assert!((stats.success_rate - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn ready_nodes_always_have_completed_dependencies(deps in dag_strategy(10)) {
        let (g, _ids) = build(&deps);
        let mut core = CoreScheduler::new(g);

        loop {
            match core.next_step().unwrap() {
                CoreStep::Done => break,
                CoreStep::Dispatch(nodes) => {
                    for node in &nodes {
                        for dep in core.store().dependencies_of(node.id) {
                            prop_assert_eq!(core.store().status_of(dep), Some(NodeStatus::Completed));
                        }
                        prop_assert_eq!(node.upstream.len(), deps[node.input].len());
                    }
                    for node in nodes {
                        core.complete(node.id, Ok(node.input)).unwrap();
                    }
                }
                CoreStep::Await => prop_assert!(false, "nothing should be in flight"),
            }
        }

        prop_assert_eq!(core.dispatch_history().iter().map(|w| w.len()).sum::<usize>(), deps.len());
    }

    #[test]
    fn cycle_closing_edges_are_rejected_and_graph_unchanged(
        deps in dag_strategy(10),
        pick_node in any::<proptest::sample::Index>(),
        pick_target in any::<proptest::sample::Index>(),
    ) {
        let (mut g, ids) = build(&deps);
        let i = pick_node.index(deps.len());
        // Edge i -> j closes a cycle when j is i itself or one of its ancestors.
        let mut targets: Vec<usize> = ancestors(&deps, i).into_iter().collect();
        targets.push(i);
        targets.sort_unstable();
        let j = targets[pick_target.index(targets.len())];

        let mut edges_before = g.edges();
        edges_before.sort();
        let nodes_before = g.node_count();

        let result = g.add_edge(ids[i], ids[j]);
        let is_cycle = matches!(result, Err(QueryDagError::CycleDetected { .. }));
        prop_assert!(is_cycle, "edge {} -> {} was not rejected as a cycle", i, j);

        let mut edges_after = g.edges();
        edges_after.sort();
        prop_assert_eq!(edges_after, edges_before);
        prop_assert_eq!(g.node_count(), nodes_before);
        prop_assert!(g.nodes().all(|node| node.status() == NodeStatus::Pending));
    }
}
