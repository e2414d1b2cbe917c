//! Run lifecycle controller.
//!
//! [`RunLifecycle`] is the surface the transport layer calls. It owns no
//! state of its own: every operation works on snapshots read from the
//! [`RunStore`] and writes them back with conditional updates. Concurrent
//! writers are resolved per operation:
//!
//! - reconciliation lets the other writer win (see [`StatusReconciler`]);
//! - submission re-reads and re-applies its own fields;
//! - cancel re-reads and re-applies `CANCELED` until it lands.

use std::sync::Arc;

use wes_core::error::CoreError;
use wes_core::request::{RunRequest, SupportedWorkflows};
use wes_core::run_state::RunState;
use wes_core::types::{JobHandle, RunId};
use wes_db::models::run::{Run, RunSummary};
use wes_db::repositories::{RunStore, StoreError};
use wes_drs::InputResolver;

use crate::backend::JobBackend;
use crate::config::EngineConfig;
use crate::dispatcher::{Dispatched, JobDispatcher};
use crate::reconciler::StatusReconciler;

/// Conditional-write attempts before an operation gives up with `Conflict`.
pub const MAX_WRITE_ATTEMPTS: usize = 8;

/// Create attempts when a freshly allocated id turns out to be taken.
const MAX_CREATE_ATTEMPTS: usize = 3;

pub struct RunLifecycle {
    store: Arc<dyn RunStore>,
    backend: Arc<dyn JobBackend>,
    resolver: InputResolver,
    dispatcher: JobDispatcher,
    reconciler: StatusReconciler,
    supported: SupportedWorkflows,
}

impl RunLifecycle {
    pub fn new(
        store: Arc<dyn RunStore>,
        backend: Arc<dyn JobBackend>,
        resolver: InputResolver,
        engine: &EngineConfig,
        supported: SupportedWorkflows,
    ) -> Self {
        Self {
            dispatcher: JobDispatcher::new(Arc::clone(&backend), engine),
            reconciler: StatusReconciler::new(Arc::clone(&store), Arc::clone(&backend)),
            store,
            backend,
            resolver,
            supported,
        }
    }

    pub fn supported_workflows(&self) -> &SupportedWorkflows {
        &self.supported
    }

    /// Accept, resolve and dispatch a workflow run.
    ///
    /// The run is persisted as `UNKNOWN` before any external call, so a
    /// failed resolution or dispatch still leaves a record behind, without
    /// a job handle. Returns once the backend has accepted the job.
    pub async fn submit(&self, request: RunRequest) -> Result<RunId, CoreError> {
        request.validate(&self.supported)?;

        let run = self.create_run(request).await?;
        let run_id = run.run_id().clone();
        tracing::info!(
            run_id = %run_id,
            workflow_url = %run.request().workflow_url,
            "Run accepted",
        );

        let resolved = self
            .resolver
            .resolve_params(&run.request().workflow_params)
            .await
            .map_err(|e| {
                tracing::warn!(run_id = %run_id, error = %e, "Input resolution failed");
                CoreError::from(e)
            })?;

        let workdir = self.dispatcher.workdir_for(&run_id);
        let run = self
            .write_with_retry(run, |run| {
                if run.run_status != RunState::Unknown {
                    return Ok(false);
                }
                run.run_status = RunState::Initializing;
                run.record_execution_path(workdir.clone())?;
                Ok(true)
            })
            .await?;

        if run.run_status != RunState::Initializing {
            tracing::info!(
                run_id = %run_id,
                state = %run.run_status,
                "Run left UNKNOWN before dispatch, not dispatching",
            );
            return Ok(run_id);
        }

        let dispatched = self.dispatcher.dispatch(&run, &resolved).await.map_err(|e| {
            tracing::error!(run_id = %run_id, error = %e, "Dispatch failed");
            e
        })?;

        let run = match self.record_dispatch(run, &dispatched).await {
            Ok(run) => run,
            Err(e) => {
                // No stored run references the job, so nothing could stop it later.
                tracing::error!(
                    run_id = %run_id,
                    job_handle = %dispatched.job_handle,
                    error = %e,
                    "Recording dispatch failed, terminating job",
                );
                self.terminate_best_effort(&run_id, &dispatched.job_handle).await;
                return Err(e);
            }
        };

        if run.run_status == RunState::Canceled {
            // Canceled while the job was being submitted.
            self.terminate_best_effort(&run_id, &dispatched.job_handle).await;
        }

        Ok(run_id)
    }

    /// Current WES state of a run, reconciled against the backend.
    pub async fn get_status(&self, run_id: &RunId) -> Result<RunState, CoreError> {
        Ok(self.get_log(run_id).await?.run_status)
    }

    /// Full run record, reconciled against the backend.
    pub async fn get_log(&self, run_id: &RunId) -> Result<Run, CoreError> {
        let run = self.store.get(run_id).await?;
        self.reconciler.reconcile(run).await
    }

    /// Last-persisted summaries of all runs. No reconciliation.
    pub async fn list(&self) -> Result<Vec<RunSummary>, CoreError> {
        Ok(self.store.list_summaries().await?)
    }

    /// Signal the backend to stop the run's job and mark the run `CANCELED`.
    ///
    /// The terminate signal is best effort and not awaited to completion;
    /// the state change is applied regardless of the run's current state.
    pub async fn cancel(&self, run_id: &RunId) -> Result<RunId, CoreError> {
        let mut run = self.store.get(run_id).await?;

        let mut signalled: Option<JobHandle> = None;
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            if let Some(handle) = run.job_handle() {
                if signalled.as_ref() != Some(handle) {
                    self.terminate_best_effort(run_id, handle).await;
                    signalled = Some(handle.clone());
                }
            }

            run.run_status = RunState::Canceled;
            if run.run_log.end_time.is_none() {
                run.run_log.end_time = Some(chrono::Utc::now());
            }

            match self.store.update(run).await {
                Ok(_) => {
                    tracing::info!(run_id = %run_id, "Run canceled");
                    return Ok(run_id.clone());
                }
                Err(StoreError::Conflict { .. }) => {
                    tracing::debug!(run_id = %run_id, attempt, "Cancel raced another writer, retrying");
                    run = self.store.get(run_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CoreError::Conflict(format!(
            "Run {run_id} kept changing; cancel gave up after {MAX_WRITE_ATTEMPTS} attempts"
        )))
    }

    // ---- private helpers ----

    async fn create_run(&self, request: RunRequest) -> Result<Run, CoreError> {
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let run_id = self.store.allocate_id().await?;
            match self.store.create(Run::new(run_id, request.clone())).await {
                Ok(run) => return Ok(run),
                Err(StoreError::Duplicate(id)) => {
                    tracing::debug!(run_id = %id, "Allocated id taken before create, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CoreError::Internal(format!(
            "No run could be created after {MAX_CREATE_ATTEMPTS} attempts"
        )))
    }

    /// Record the job handle, command line and start time of a dispatched run.
    async fn record_dispatch(&self, run: Run, dispatched: &Dispatched) -> Result<Run, CoreError> {
        let stdout = dispatched.invocation.stdout_path().display().to_string();
        let stderr = dispatched.invocation.stderr_path().display().to_string();

        self.write_with_retry(run, |run| {
            run.record_job_handle(dispatched.job_handle.clone())?;
            run.run_log.cmd = Some(dispatched.cmd.clone());
            run.run_log.start_time = Some(chrono::Utc::now());
            run.run_log.stdout = Some(stdout.clone());
            run.run_log.stderr = Some(stderr.clone());
            Ok(true)
        })
        .await
    }

    /// Apply `mutate` and persist, re-reading and re-applying on conflict.
    ///
    /// `mutate` returns `false` when the run needs no write.
    async fn write_with_retry<F>(&self, mut run: Run, mut mutate: F) -> Result<Run, CoreError>
    where
        F: FnMut(&mut Run) -> Result<bool, CoreError> + Send,
    {
        let run_id = run.run_id().clone();
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            if !mutate(&mut run)? {
                return Ok(run);
            }
            match self.store.update(run).await {
                Ok(saved) => return Ok(saved),
                Err(StoreError::Conflict { .. }) => {
                    tracing::debug!(run_id = %run_id, attempt, "Run changed concurrently, re-applying");
                    run = self.store.get(&run_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(CoreError::Conflict(format!(
            "Run {run_id} kept changing; gave up after {MAX_WRITE_ATTEMPTS} attempts"
        )))
    }

    async fn terminate_best_effort(&self, run_id: &RunId, handle: &JobHandle) {
        if let Err(e) = self.backend.terminate(handle).await {
            tracing::warn!(
                run_id = %run_id,
                job_handle = %handle,
                error = %e,
                "Terminate signal failed, canceling anyway",
            );
        }
    }
}
