//! Compensating actions for multi-step commits.
//!
//! Each step that leaves an artifact behind registers an undo future right
//! after it succeeds. If a later step fails the log is unwound newest-first;
//! once the commit point is reached the log is discarded. A log dropped
//! before either happens unwinds itself on the current runtime.

use futures_util::future::BoxFuture;
use std::fmt::Display;
use std::future::Future;

type Step = (&'static str, BoxFuture<'static, Result<(), String>>);

#[derive(Default)]
pub struct Rollback {
    steps: Vec<Step>,
}

impl Rollback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the undo for a step that just succeeded. The future is not
    /// polled unless the log is unwound.
    pub fn push<F, E>(&mut self, label: &'static str, undo: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display,
    {
        self.steps.push((
            label,
            Box::pin(async move { undo.await.map_err(|e| e.to_string()) }),
        ));
    }

    /// Discard all registered undos; the artifacts are now owned by the commit.
    pub fn commit(mut self) {
        tracing::debug!(
            steps = self.steps.len(),
            "commit reached, discarding rollback log"
        );
        self.steps.clear();
    }

    /// Run every registered undo in reverse order. A failing undo is logged
    /// and does not stop the remaining ones. Returns the labels that failed.
    pub async fn unwind(mut self) -> Vec<&'static str> {
        run_steps(std::mem::take(&mut self.steps)).await
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        if self.steps.is_empty() {
            return;
        }
        let steps = std::mem::take(&mut self.steps);
        let labels: Vec<&'static str> = steps.iter().map(|(label, _)| *label).collect();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(steps = ?labels, "rollback log dropped mid-commit, unwinding");
                handle.spawn(run_steps(steps));
            }
            Err(_) => {
                tracing::error!(steps = ?labels, "rollback log dropped without a runtime");
            }
        }
    }
}

async fn run_steps(steps: Vec<Step>) -> Vec<&'static str> {
    let mut failed = Vec::new();
    for (label, undo) in steps.into_iter().rev() {
        match undo.await {
            Ok(()) => tracing::info!(step = label, "compensating action completed"),
            Err(cause) => {
                tracing::error!(step = label, %cause, "compensating action failed");
                failed.push(label);
            }
        }
    }
    failed
}
