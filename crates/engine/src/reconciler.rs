//! Brings a run's persisted state up to date with its backend job.

use std::sync::Arc;

use wes_core::error::CoreError;
use wes_core::run_state::{reconcile_state, RunState};
use wes_db::models::run::Run;
use wes_db::repositories::{RunStore, StoreError};

use crate::backend::{BackendError, JobBackend};

pub struct StatusReconciler {
    store: Arc<dyn RunStore>,
    backend: Arc<dyn JobBackend>,
}

impl StatusReconciler {
    pub fn new(store: Arc<dyn RunStore>, backend: Arc<dyn JobBackend>) -> Self {
        Self { store, backend }
    }

    /// Query the backend for the run's job, map its state, and persist the
    /// run if the state changed.
    ///
    /// Runs that are terminal, `CANCELING`, or not yet dispatched come back
    /// untouched without a backend call. If another writer updated the run
    /// in the meantime, the stored record wins and is returned instead.
    pub async fn reconcile(&self, mut run: Run) -> Result<Run, CoreError> {
        if !run.run_status.is_reconcilable() {
            return Ok(run);
        }
        let Some(handle) = run.job_handle().cloned() else {
            return Ok(run);
        };

        let next = match self.backend.get_state(&handle).await {
            Ok(job_state) => reconcile_state(run.run_status, job_state),
            Err(BackendError::UnknownJob(_)) => {
                tracing::warn!(
                    run_id = %run.run_id(),
                    job_handle = %handle,
                    "Backend has no record of job, marking run as system error",
                );
                RunState::SystemError
            }
            Err(e) => return Err(CoreError::BackendUnavailable(e.to_string())),
        };

        if next == run.run_status {
            return Ok(run);
        }

        tracing::debug!(
            run_id = %run.run_id(),
            from = %run.run_status,
            to = %next,
            "Run state changed",
        );
        run.run_status = next;

        if next.is_terminal() {
            // Exit details are best effort; a backend that lost them still
            // yields a terminal run.
            let outcome = self.backend.outcome(&handle).await.ok().flatten();
            let outcome = outcome.unwrap_or_default();
            if outcome.exit_code.is_some() {
                run.run_log.exit_code = outcome.exit_code;
            }
            run.run_log.end_time = outcome.finished_at.or_else(|| Some(chrono::Utc::now()));
        }

        let run_id = run.run_id().clone();
        match self.store.update(run).await {
            Ok(run) => Ok(run),
            Err(StoreError::Conflict { .. }) => {
                tracing::debug!(run_id = %run_id, "Run changed during reconciliation, keeping stored record");
                Ok(self.store.get(&run_id).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}
