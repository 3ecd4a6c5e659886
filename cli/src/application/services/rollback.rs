//! Compensating actions for a partially applied install.
//!
//! Each mutating step that succeeds pushes the action that undoes it. On a
//! later failure the stack is unwound newest-first; on success it is
//! committed (discarded) so nothing runs.

use crate::application::ports::{ProgressReporter, ServiceInstaller};
use crate::domain::InstallLayout;

/// The undo operation for one completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Undo a fresh install: remove the files and the service registration.
    Uninstall,
    /// Undo a service start.
    StopService,
}

impl Compensation {
    fn progress(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Uninstall => ("Uninstalling", "Uninstalled", "Failed to Uninstall"),
            Self::StopService => (
                "Stopping Service",
                "Successfully Stopped Service",
                "Failed to Stop Service",
            ),
        }
    }
}

/// One entry on the compensation stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensatingAction {
    pub compensation: Compensation,
    /// What the forward step did, for logs.
    pub description: String,
}

/// LIFO stack of compensating actions, scoped to one transaction.
#[derive(Debug, Default)]
pub struct Rollback {
    actions: Vec<CompensatingAction>,
}

impl Rollback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the undo for a step that just succeeded.
    pub fn push(&mut self, compensation: Compensation, description: impl Into<String>) {
        let description = description.into();
        tracing::debug!(?compensation, %description, "registered compensation");
        self.actions.push(CompensatingAction {
            compensation,
            description,
        });
    }

    /// Pending actions, oldest first.
    #[must_use]
    pub fn pending(&self) -> &[CompensatingAction] {
        &self.actions
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The transaction succeeded: drop every compensation unexecuted.
    pub fn commit(mut self) {
        if !self.actions.is_empty() {
            tracing::debug!(discarded = self.actions.len(), "transaction committed");
        }
        self.actions.clear();
    }

    /// Run every pending compensation, newest first.
    ///
    /// Best effort: a failing compensation is logged and reported, and the
    /// remaining ones still run. The stack is drained, so a second call does
    /// nothing. Returns how many compensations failed.
    pub async fn unwind(
        &mut self,
        installer: &impl ServiceInstaller,
        layout: &InstallLayout,
        reporter: &impl ProgressReporter,
    ) -> usize {
        let mut failures = 0;
        while let Some(action) = self.actions.pop() {
            let (running, done, failed) = action.compensation.progress();
            reporter.step(running);
            let result = match action.compensation {
                Compensation::Uninstall => installer.uninstall(layout).await,
                Compensation::StopService => installer.stop_service(layout).await,
            };
            match result {
                Ok(()) => reporter.step(done),
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        compensation = ?action.compensation,
                        step = %action.description,
                        error = %format!("{e:#}"),
                        "compensation failed"
                    );
                    reporter.warn(&format!("{failed}: {e:#}"));
                }
            }
        }
        failures
    }
}
