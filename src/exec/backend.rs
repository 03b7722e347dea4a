// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! The driver talks to an `Executor` instead of spawning processes directly.
//! Production code uses [`CommandExecutor`](super::CommandExecutor); tests
//! provide their own implementation that records dispatches and returns
//! scripted outcomes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::engine::DispatchedNode;
use crate::errors::ExecutionError;

/// Boxed future returned by [`Executor::execute`].
pub type ExecFuture<O> =
    Pin<Box<dyn Future<Output = std::result::Result<O, ExecutionError>> + Send + 'static>>;

/// Performs the actual work of a node.
///
/// The returned future is spawned onto the runtime, so it must own everything
/// it needs. `cancel` fires when the run is cancelled; honouring it is up to
/// the implementation. An executor that ignores it is abandoned once the
/// driver's grace period runs out.
pub trait Executor: Send + Sync + 'static {
    type Input: Clone + Send + Sync + 'static;
    type Output: Clone + Send + Sync + 'static;

    fn execute(
        &self,
        node: DispatchedNode<Self::Input, Self::Output>,
        cancel: CancellationToken,
    ) -> ExecFuture<Self::Output>;
}

impl<E: Executor> Executor for Arc<E> {
    type Input = E::Input;
    type Output = E::Output;

    fn execute(
        &self,
        node: DispatchedNode<Self::Input, Self::Output>,
        cancel: CancellationToken,
    ) -> ExecFuture<Self::Output> {
        (**self).execute(node, cancel)
    }
}
