use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use querydag::engine::DispatchedNode;
use querydag::errors::ExecutionError;
use querydag::exec::{ExecFuture, Executor};
use tokio_util::sync::CancellationToken;

/// A fake executor that:
/// - records which nodes were invoked, by name, in invocation order
/// - tracks how many invocations overlap
/// - fails, panics, sleeps or hangs for the names it was scripted with.
///
/// Successful nodes output `name(upstream1,upstream2,...)`.
#[derive(Clone, Default)]
pub struct ScriptedExecutor {
    invoked: Arc<Mutex<Vec<String>>>,
    failing: Arc<HashSet<String>>,
    panicking: Arc<HashSet<String>>,
    hanging: Arc<HashSet<String>>,
    delays: Arc<HashMap<String, Duration>>,
    ignore_cancel: bool,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, names: &[&str]) -> Self {
        self.failing = Arc::new(names.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn panicking(mut self, names: &[&str]) -> Self {
        self.panicking = Arc::new(names.iter().map(|s| s.to_string()).collect());
        self
    }

    /// These nodes never finish on their own.
    pub fn hanging(mut self, names: &[&str]) -> Self {
        self.hanging = Arc::new(names.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn delay(mut self, name: &str, delay: Duration) -> Self {
        let mut delays = (*self.delays).clone();
        delays.insert(name.to_string(), delay);
        self.delays = Arc::new(delays);
        self
    }

    /// Keep running (or hanging) after the cancellation token fires.
    pub fn ignoring_cancel(mut self) -> Self {
        self.ignore_cancel = true;
        self
    }

    /// Shared handle to the invocation log; clone before handing the
    /// executor to a driver.
    pub fn invoked_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.invoked)
    }

    pub fn invoked(&self) -> Vec<String> {
        self.invoked.lock().unwrap().clone()
    }

    /// Highest number of simultaneously running invocations seen.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct RunningGuard(Arc<AtomicUsize>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Executor for ScriptedExecutor {
    type Input = String;
    type Output = String;

    fn execute(
        &self,
        node: DispatchedNode<String, String>,
        cancel: CancellationToken,
    ) -> ExecFuture<String> {
        let this = self.clone();
        Box::pin(async move {
            this.invoked.lock().unwrap().push(node.name.clone());
            let now = this.running.fetch_add(1, Ordering::SeqCst) + 1;
            this.peak.fetch_max(now, Ordering::SeqCst);
            let _guard = RunningGuard(Arc::clone(&this.running));

            if this.panicking.contains(&node.name) {
                panic!("scripted panic in {}", node.name);
            }

            let wait = if this.hanging.contains(&node.name) {
                None
            } else {
                this.delays.get(&node.name).copied()
            };
            let must_wait = wait.is_some() || this.hanging.contains(&node.name);

            if must_wait {
                let sleep = async {
                    match wait {
                        Some(d) => tokio::time::sleep(d).await,
                        None => std::future::pending::<()>().await,
                    }
                };
                if this.ignore_cancel {
                    sleep.await;
                } else {
                    tokio::select! {
                        _ = sleep => {}
                        _ = cancel.cancelled() => return Err(ExecutionError::Cancelled),
                    }
                }
            }

            if this.failing.contains(&node.name) {
                return Err(ExecutionError::failed(format!("scripted failure in {}", node.name)));
            }

            let upstream: Vec<&str> = node.upstream.iter().map(|u| u.output.as_str()).collect();
            Ok(format!("{}({})", node.name, upstream.join(",")))
        })
    }
}
