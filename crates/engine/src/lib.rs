//! Run lifecycle engine.
//!
//! Contains the job backend abstraction and its local process
//! implementation, the dispatcher that materializes and submits a run's
//! invocation, the reconciler that folds backend job states into run
//! states, and [`lifecycle::RunLifecycle`], which the transport layer calls.

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod invocation;
pub mod lifecycle;
pub mod process;
pub mod reconciler;
