//! Detached background work.
//!
//! Revalidation writes outlive the request that started them. Their outcome
//! is logged here and never reaches the request that spawned them.

use std::future::Future;
use std::sync::Arc;

use edge_cache_core::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Runner for fire-and-forget tasks.
///
/// Cloning shares the same set of tasks. Dropping the last clone aborts
/// whatever is still running.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    set: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task`; an error it returns is logged under `label`.
    pub async fn spawn<F>(&self, label: impl Into<String>, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let label = label.into();
        let mut set = self.set.lock().await;

        while let Some(finished) = set.try_join_next() {
            log_join(finished);
        }

        set.spawn(async move {
            if let Err(e) = task.await {
                tracing::warn!(task = %label, error = %e, "background task failed");
            }
        });
    }

    /// Number of tasks spawned and not yet reaped.
    pub async fn in_flight(&self) -> usize {
        self.set.lock().await.len()
    }

    /// Wait for every spawned task to finish, including tasks spawned while
    /// waiting.
    ///
    /// The lock is only held to take the pending tasks, so `spawn` never
    /// blocks behind a wait. Cancelling the wait aborts the tasks it took.
    pub async fn wait_idle(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.set.lock().await);
            if pending.is_empty() {
                return;
            }
            while let Some(finished) = pending.join_next().await {
                log_join(finished);
            }
        }
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        tracing::error!(error = %e, "background task panicked");
    }
}
