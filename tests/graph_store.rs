// tests/graph_store.rs

mod common;
use crate::common::builders::{TestGraph, chain, diamond};
use crate::common::init_tracing;

use std::collections::BTreeSet;

use querydag::dag::{FailureReason, StatusUpdate};
use querydag::errors::QueryDagError;
use querydag::types::{NodeKind, NodeStatus};

#[test]
fn new_nodes_start_pending_with_fresh_ids() {
    init_tracing();
    let mut g = TestGraph::new();
    let a = g.add_node("a", NodeKind::Task, "a".into());
    let b = g.add_node("a", NodeKind::Task, "a".into());

    assert_ne!(a, b);
    assert_eq!(g.status_of(a), Some(NodeStatus::Pending));
    assert_eq!(g.node_count(), 2);
    assert!(g.node(a).unwrap().started_at().is_none());
}

#[test]
fn edge_that_closes_a_cycle_is_rejected_and_graph_unchanged() {
    init_tracing();
    let (mut g, ids) = chain(3);
    let before_edges = g.edges();

    let err = g.add_edge(ids[2], ids[0]).unwrap_err();
    assert!(matches!(err, QueryDagError::CycleDetected { .. }), "got {err:?}");
    assert_eq!(g.edges(), before_edges);
    assert_eq!(g.edge_count(), 2);
}

#[test]
fn self_loop_is_a_cycle() {
    let mut g = TestGraph::new();
    let a = g.add_node("a", NodeKind::Task, "a".into());
    assert!(matches!(g.add_edge(a, a), Err(QueryDagError::CycleDetected { .. })));
    assert_eq!(g.edge_count(), 0);
}

#[test]
fn edge_to_unknown_node_is_rejected() {
    let (mut g, d) = diamond();
    let mut other = TestGraph::new();
    let foreign = (0..5)
        .map(|i| other.add_node(format!("x{i}"), NodeKind::Task, String::new()))
        .last()
        .unwrap();

    assert!(matches!(g.add_edge(d.a, foreign), Err(QueryDagError::UnknownNode(_))));
    assert_eq!(g.edge_count(), 4);
}

#[test]
fn duplicate_edge_is_a_noop() {
    let (mut g, d) = diamond();
    g.add_edge(d.a, d.b).unwrap();
    assert_eq!(g.edge_count(), 4);
}

#[test]
fn nodes_without_dependencies_are_ready_immediately() {
    let mut g = TestGraph::new();
    let a = g.add_node("a", NodeKind::Task, "a".into());
    let b = g.add_node("b", NodeKind::Task, "b".into());
    let c = g.add_node("c", NodeKind::Task, "c".into());
    g.add_edge(a, c).unwrap();

    assert_eq!(g.get_ready_nodes(), BTreeSet::from([a, b]));
}

#[test]
fn ready_set_is_idempotent_and_follows_completions() {
    let (mut g, d) = diamond();
    assert_eq!(g.get_ready_nodes(), BTreeSet::from([d.a]));
    assert_eq!(g.get_ready_nodes(), g.get_ready_nodes());

    g.update_status(d.a, StatusUpdate::Running).unwrap();
    assert!(g.get_ready_nodes().is_empty());

    g.update_status(d.a, StatusUpdate::Completed("a".into())).unwrap();
    assert_eq!(g.get_ready_nodes(), BTreeSet::from([d.b, d.c]));

    g.update_status(d.b, StatusUpdate::Running).unwrap();
    g.update_status(d.b, StatusUpdate::Completed("b".into())).unwrap();
    // d still waits for c.
    assert_eq!(g.get_ready_nodes(), BTreeSet::from([d.c]));
}

#[test]
fn lifecycle_timestamps_and_outcome_are_recorded() {
    let (mut g, ids) = chain(1);
    let id = ids[0];

    g.update_status(id, StatusUpdate::Running).unwrap();
    let node = g.node(id).unwrap();
    assert!(node.started_at().is_some());
    assert!(node.completed_at().is_none());

    g.update_status(id, StatusUpdate::Completed("out".into())).unwrap();
    let node = g.node(id).unwrap();
    assert_eq!(node.status(), NodeStatus::Completed);
    assert_eq!(node.output(), Some(&"out".to_string()));
    assert!(node.completed_at().is_some());
    assert!(node.duration().is_some());
}

#[test]
fn illegal_transitions_are_rejected() {
    let (mut g, ids) = chain(2);

    // Pending -> Completed skips Running.
    let err = g
        .update_status(ids[0], StatusUpdate::Completed("x".into()))
        .unwrap_err();
    assert!(matches!(
        err,
        QueryDagError::InvalidTransition {
            from: NodeStatus::Pending,
            to: NodeStatus::Completed,
            ..
        }
    ));

    g.update_status(ids[0], StatusUpdate::Running).unwrap();
    // Running -> Running.
    assert!(matches!(
        g.update_status(ids[0], StatusUpdate::Running),
        Err(QueryDagError::InvalidTransition { .. })
    ));

    g.update_status(ids[0], StatusUpdate::Completed("x".into())).unwrap();
    // Terminal states never change again.
    assert!(matches!(
        g.update_status(ids[0], StatusUpdate::Failed(FailureReason::Execution("late".into()))),
        Err(QueryDagError::InvalidTransition { .. })
    ));
    assert_eq!(g.status_of(ids[0]), Some(NodeStatus::Completed));
}

#[test]
fn update_of_unknown_node_is_rejected() {
    let (mut g, _) = chain(1);
    let mut other = TestGraph::new();
    other.add_node("x", NodeKind::Task, "x".into());
    let foreign = other.add_node("y", NodeKind::Task, "y".into());

    assert!(matches!(
        g.update_status(foreign, StatusUpdate::Running),
        Err(QueryDagError::UnknownNode(_))
    ));
}

#[test]
fn pending_node_may_be_failed_directly() {
    let (mut g, ids) = chain(1);
    let changes = g
        .update_status(ids[0], StatusUpdate::Failed(FailureReason::Cancelled))
        .unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(g.status_of(ids[0]), Some(NodeStatus::Failed));
}

#[test]
fn terminal_only_when_every_node_is_terminal() {
    let empty = TestGraph::new();
    assert!(empty.is_terminal());

    let (mut g, ids) = chain(2);
    assert!(!g.is_terminal());

    g.update_status(ids[0], StatusUpdate::Running).unwrap();
    g.update_status(ids[0], StatusUpdate::Completed("x".into())).unwrap();
    assert!(!g.is_terminal());

    g.update_status(ids[1], StatusUpdate::Running).unwrap();
    assert!(!g.is_terminal());
    g.update_status(ids[1], StatusUpdate::Failed(FailureReason::Execution("boom".into())))
        .unwrap();
    assert!(g.is_terminal());
}

#[test]
fn kind_names_parse_with_aliases() {
    assert_eq!("search".parse::<NodeKind>().unwrap(), NodeKind::Task);
    assert_eq!("result".parse::<NodeKind>().unwrap(), NodeKind::Aggregate);
    assert_eq!("end".parse::<NodeKind>().unwrap(), NodeKind::Terminal);
    assert_eq!("root".parse::<NodeKind>().unwrap(), NodeKind::Root);
    assert!(matches!(
        "banana".parse::<NodeKind>(),
        Err(QueryDagError::InvalidKind(k)) if k.contains("banana")
    ));
}
