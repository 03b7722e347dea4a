// src/exec/mod.rs

//! Node execution layer.
//!
//! The driver never runs work itself; it hands each dispatched node to an
//! [`Executor`] and awaits the returned future.
//!
//! - [`backend`] defines the `Executor` trait and its future type.
//! - [`closure`] adapts an async closure into an executor, mostly for tests
//!   and embedding.
//! - [`command`] runs each node's input as a shell command, which is what the
//!   `querydag` binary uses.

pub mod backend;
pub mod closure;
pub mod command;

pub use backend::{ExecFuture, Executor};
pub use closure::FnExecutor;
pub use command::CommandExecutor;
