// src/engine/runtime.rs

//! Async IO shell around [`CoreScheduler`].
//!
//! The driver owns the executor, the cancellation token and the set of
//! in-flight executor tasks. Every scheduling decision is delegated to the
//! core; this layer only spawns work, waits for the first completion (or a
//! cancel/deadline) and feeds results back.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tokio::task::{self, JoinSet};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dag::{GraphStore, NodeId};
use crate::engine::{CoreScheduler, CoreStep, DispatchedNode, RunOptions};
use crate::errors::{ExecutionError, QueryDagError, Result};
use crate::exec::Executor;
use crate::progress::ProgressSink;
use crate::stats::RunStatistics;

type NodeResult<O> = (NodeId, std::result::Result<O, ExecutionError>);

/// Final state of a run.
#[derive(Debug, Clone)]
pub struct RunReport<I, O> {
    pub statistics: RunStatistics,
    pub graph: GraphStore<I, O>,
    /// Every ready set that was dispatched, in order.
    pub dispatch_history: Vec<BTreeSet<NodeId>>,
    /// Whether the run was cancelled (explicitly or by the run timeout).
    pub cancelled: bool,
}

pub struct Driver<E: Executor> {
    core: CoreScheduler<E::Input, E::Output>,
    executor: Arc<E>,
    options: RunOptions,
    cancel: CancellationToken,
}

impl<E: Executor> fmt::Debug for Driver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("core", &self.core)
            .field("options", &self.options)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<E: Executor> Driver<E> {
    pub fn new(store: GraphStore<E::Input, E::Output>, executor: E) -> Self {
        Self {
            core: CoreScheduler::new(store),
            executor: Arc::new(executor),
            options: RunOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.core = self.core.with_progress(sink);
        self
    }

    /// Use an externally owned token; cancelling it cancels the run.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Handle for cancelling the run from elsewhere.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drive the graph until every node is terminal.
    ///
    /// Returns `Stalled` if the graph can never finish. Cancellation is not an
    /// error: the report comes back with `cancelled = true` and the affected
    /// nodes failed with reason `Cancelled`.
    pub async fn run(mut self) -> Result<RunReport<E::Input, E::Output>> {
        info!(
            nodes = self.core.store().node_count(),
            edges = self.core.store().edge_count(),
            "run started"
        );

        let cancel = self.cancel.clone();
        let run_deadline = self.options.run_timeout.map(|budget| Instant::now() + budget);
        let mut grace_deadline: Option<Instant> = None;
        let mut cancelled = false;

        let mut tasks: JoinSet<NodeResult<E::Output>> = JoinSet::new();
        let mut task_nodes: HashMap<task::Id, NodeId> = HashMap::new();

        loop {
            if !cancelled && cancel.is_cancelled() {
                cancelled = true;
                grace_deadline = self.begin_cancel()?;
            }

            match self.core.next_step()? {
                CoreStep::Done => break,
                CoreStep::Dispatch(batch) => {
                    for node in batch {
                        if cancel.is_cancelled() {
                            // Token fired mid-batch; never hand this one out.
                            self.core.complete(node.id, Err(ExecutionError::Cancelled))?;
                            continue;
                        }
                        self.spawn_node(&mut tasks, &mut task_nodes, node);
                    }
                    continue;
                }
                CoreStep::Await => {}
            }

            tokio::select! {
                joined = tasks.join_next_with_id() => match joined {
                    Some(Ok((task_id, (node, result)))) => {
                        task_nodes.remove(&task_id);
                        self.core.complete(node, result)?;
                    }
                    Some(Err(join_err)) => {
                        let Some(node) = task_nodes.remove(&join_err.id()) else {
                            warn!(error = %join_err, "join error for an unknown executor task");
                            continue;
                        };
                        if join_err.is_panic() {
                            let message = panic_message(join_err.into_panic());
                            error!(node = %node, %message, "executor panicked");
                            self.core.complete(node, Err(ExecutionError::Panicked(message)))?;
                        } else {
                            debug!(node = %node, "executor task aborted");
                            self.core.complete(node, Err(ExecutionError::Cancelled))?;
                        }
                    }
                    None => {
                        // The core believes work is in flight but nothing is running.
                        let pending = self.core.pending_nodes();
                        error!(in_flight = ?self.core.in_flight(), "no executor tasks left to await");
                        return Err(QueryDagError::Stalled { pending });
                    }
                },

                _ = cancel.cancelled(), if !cancelled => {
                    info!("cancellation requested");
                }

                _ = wait_until(run_deadline), if !cancelled => {
                    warn!(timeout = ?self.options.run_timeout, "run timeout elapsed; cancelling");
                    cancel.cancel();
                }

                _ = wait_until(grace_deadline), if grace_deadline.is_some() => {
                    grace_deadline = None;
                    warn!(
                        in_flight = self.core.in_flight().len(),
                        "cancel grace period elapsed; abandoning in-flight nodes"
                    );
                    tasks.shutdown().await;
                    task_nodes.clear();
                    self.core.abandon_in_flight()?;
                }
            }
        }

        let statistics = RunStatistics::collect(self.core.store());
        info!(
            completed = statistics.count(crate::types::NodeStatus::Completed),
            failed = statistics.failed_nodes,
            success_rate = statistics.success_rate,
            cancelled,
            "run finished"
        );

        let dispatch_history = self.core.dispatch_history().to_vec();
        Ok(RunReport {
            statistics,
            graph: self.core.into_store(),
            dispatch_history,
            cancelled,
        })
    }

    /// Fail pending work and decide whether in-flight nodes get a grace period.
    fn begin_cancel(&mut self) -> Result<Option<Instant>> {
        let failed = self.core.cancel()?;
        let in_flight = self.core.in_flight().len();
        info!(failed, in_flight, grace = ?self.options.cancel_grace, "run cancelled");

        if in_flight == 0 {
            return Ok(None);
        }
        Ok(Some(Instant::now() + self.options.cancel_grace))
    }

    fn spawn_node(
        &self,
        tasks: &mut JoinSet<NodeResult<E::Output>>,
        task_nodes: &mut HashMap<task::Id, NodeId>,
        node: DispatchedNode<E::Input, E::Output>,
    ) {
        let id = node.id;
        let executor = Arc::clone(&self.executor);
        let token = self.cancel.child_token();
        let budget = self.options.node_timeout;

        debug!(node = %id, name = %node.name, kind = %node.kind, "spawning executor");

        let handle = tasks.spawn(async move {
            let fut = executor.execute(node, token);
            let result = match budget {
                Some(budget) => time::timeout(budget, fut)
                    .await
                    .unwrap_or(Err(ExecutionError::TimedOut(budget))),
                None => fut.await,
            };
            (id, result)
        });
        task_nodes.insert(handle.id(), id);
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "executor panicked".to_string()
    }
}
