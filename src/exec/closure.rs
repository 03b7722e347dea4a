// src/exec/closure.rs

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use tokio_util::sync::CancellationToken;

use crate::engine::DispatchedNode;
use crate::errors::ExecutionError;
use crate::exec::{ExecFuture, Executor};

/// Executor backed by an async closure.
///
/// ```ignore
/// let exec = FnExecutor::new(|node: DispatchedNode<String, String>, _cancel| async move {
///     Ok(node.input.to_uppercase())
/// });
/// ```
pub struct FnExecutor<F, I, O> {
    f: F,
    _marker: PhantomData<fn(I) -> O>,
}

impl<F, I, O> FnExecutor<F, I, O> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, I, O> fmt::Debug for FnExecutor<F, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExecutor").finish_non_exhaustive()
    }
}

impl<F, Fut, I, O> Executor for FnExecutor<F, I, O>
where
    F: Fn(DispatchedNode<I, O>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<O, ExecutionError>> + Send + 'static,
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
{
    type Input = I;
    type Output = O;

    fn execute(&self, node: DispatchedNode<I, O>, cancel: CancellationToken) -> ExecFuture<O> {
        Box::pin((self.f)(node, cancel))
    }
}
