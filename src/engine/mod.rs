// src/engine/mod.rs

//! Execution engine.
//!
//! This module ties together:
//! - the graph store (readiness, status mutation, propagation)
//! - the pluggable executor
//! - cancellation and time budgets
//!
//! The pure scheduling state machine lives in [`core`]; the async/IO shell
//! that spawns executor work and waits for completions is [`runtime`].

use std::time::Duration;

use crate::dag::NodeId;
use crate::types::NodeKind;

/// Output of a completed dependency, handed to its dependents.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamOutput<O> {
    pub id: NodeId,
    pub name: String,
    pub output: O,
}

/// A node the scheduler wants the executor to run now.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedNode<I, O> {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub input: I,
    /// Outputs of the node's direct dependencies, in dependency order.
    pub upstream: Vec<UpstreamOutput<O>>,
}

/// Phase of the scheduling state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Graph populated, nothing dispatched yet.
    Idle,
    /// Computing the ready set.
    Scheduling,
    /// Waiting for at least one in-flight node to complete.
    Awaiting,
    /// Every node is terminal.
    Done,
}

/// What the IO shell should do after a scheduling step.
#[derive(Debug, Clone)]
pub enum CoreStep<I, O> {
    /// Hand these nodes to the executor.
    Dispatch(Vec<DispatchedNode<I, O>>),
    /// Nothing new is ready; wait for an in-flight completion.
    Await,
    /// The graph is terminal.
    Done,
}

/// Time budgets used by the driver.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Per-node budget; an overrun fails the node.
    pub node_timeout: Option<Duration>,
    /// Whole-run budget; an overrun cancels the run.
    pub run_timeout: Option<Duration>,
    /// How long in-flight nodes may keep running after cancellation before
    /// they are abandoned.
    pub cancel_grace: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            node_timeout: None,
            run_timeout: None,
            cancel_grace: Duration::from_millis(500),
        }
    }
}

pub mod core;
pub mod runtime;

pub use self::core::CoreScheduler;
pub use self::runtime::{Driver, RunReport};
