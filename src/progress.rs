// src/progress.rs

//! Progress notifications for every node status transition.
//!
//! The scheduler calls a [`ProgressSink`] once per applied transition,
//! including failures forced by propagation or cancellation. Closures,
//! unbounded channels and the tracing-backed [`LogProgress`] all implement the
//! trait.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::dag::{FailureReason, NodeId};
use crate::types::{NodeKind, NodeStatus};

/// One status transition, as reported to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub node: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub status: NodeStatus,
    pub reason: Option<FailureReason>,
    /// Size of the ready set right after the transition.
    pub ready: usize,
}

pub trait ProgressSink: Send {
    fn on_transition(&mut self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressEvent) + Send,
{
    fn on_transition(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// Streams events to a receiver; a dropped receiver is ignored.
impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn on_transition(&mut self, event: &ProgressEvent) {
        let _ = self.send(event.clone());
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_transition(&mut self, _event: &ProgressEvent) {}
}

/// Logs every transition through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_transition(&mut self, event: &ProgressEvent) {
        match &event.reason {
            Some(reason) => warn!(
                node = %event.node,
                name = %event.name,
                kind = %event.kind,
                status = %event.status,
                ready = event.ready,
                %reason,
                "node transition"
            ),
            None => info!(
                node = %event.node,
                name = %event.name,
                kind = %event.kind,
                status = %event.status,
                ready = event.ready,
                "node transition"
            ),
        }
    }
}
