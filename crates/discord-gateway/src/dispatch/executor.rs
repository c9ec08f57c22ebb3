//! Task executor for event handlers

use futures::future::BoxFuture;

/// Runs handler tasks without the caller waiting for them
///
/// `spawn` must return immediately; handlers never block the receive loop.
pub trait Executor: Send + Sync + 'static {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Spawns each task on the current tokio runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioExecutor;

impl Executor for TokioExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }
}
