//! Local child-process job backend.
//!
//! [`ProcessBackend`] runs each submitted invocation as a child process of
//! the service. A semaphore bounds how many execute at once; jobs waiting
//! for a slot report `pending`. Standard output and error go to files in
//! the run's working directory. Job state lives only in memory, so handles
//! from a previous process are unknown after a restart. Finished jobs are
//! forgotten once their retention window has passed.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::{watch, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use wes_core::run_state::JobState;
use wes_core::types::JobHandle;

use crate::backend::{BackendError, JobBackend, JobOutcome};
use crate::invocation::Invocation;

/// How long [`ProcessBackend::shutdown`] waits for job tasks to exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// How long a finished job stays queryable when no retention is given.
pub const DEFAULT_JOB_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

type JobTable = Arc<RwLock<HashMap<JobHandle, Arc<ManagedJob>>>>;

/// Runs engine invocations as local child processes.
pub struct ProcessBackend {
    /// Program and leading arguments; engine arguments are appended.
    program: Vec<String>,
    jobs: JobTable,
    slots: Arc<Semaphore>,
    /// Time a finished job is kept before its handle becomes unknown.
    retention: Duration,
    tasks: TaskTracker,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

/// Bookkeeping for a single submitted job.
struct ManagedJob {
    status: watch::Sender<JobSnapshot>,
    /// Per-job cancellation token (child of the master token).
    cancel: CancellationToken,
}

#[derive(Debug, Clone)]
struct JobSnapshot {
    state: JobState,
    outcome: JobOutcome,
}

impl ProcessBackend {
    pub fn new(program: Vec<String>, max_concurrent_jobs: usize) -> Arc<Self> {
        Self::with_retention(program, max_concurrent_jobs, DEFAULT_JOB_RETENTION)
    }

    pub fn with_retention(
        program: Vec<String>,
        max_concurrent_jobs: usize,
        retention: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            program,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            slots: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            retention,
            tasks: TaskTracker::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Number of jobs this backend still tracks, finished or not.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Terminate every outstanding job and wait briefly for them to exit.
    ///
    /// Further submissions are refused.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down process backend");
        self.cancel.cancel();
        self.tasks.close();

        if tokio::time::timeout(SHUTDOWN_GRACE, self.tasks.wait())
            .await
            .is_err()
        {
            tracing::warn!("Job tasks did not exit within the shutdown grace period");
        }

        tracing::info!("Process backend shut down complete");
    }

    async fn lookup(&self, handle: &JobHandle) -> Result<Arc<ManagedJob>, BackendError> {
        self.jobs
            .read()
            .await
            .get(handle)
            .cloned()
            .ok_or_else(|| BackendError::UnknownJob(handle.clone()))
    }
}

#[async_trait]
impl JobBackend for ProcessBackend {
    async fn submit(&self, invocation: Invocation) -> Result<JobHandle, BackendError> {
        if self.cancel.is_cancelled() {
            return Err(BackendError::Unavailable("backend is shutting down".into()));
        }
        let Some((program, leading)) = self.program.split_first() else {
            return Err(BackendError::Rejected("no engine program configured".into()));
        };

        let handle = JobHandle::new(uuid::Uuid::new_v4().to_string());
        let (status, _) = watch::channel(JobSnapshot {
            state: JobState::Pending,
            outcome: JobOutcome::default(),
        });
        let job = Arc::new(ManagedJob {
            status,
            cancel: self.cancel.child_token(),
        });

        self.jobs.write().await.insert(handle.clone(), Arc::clone(&job));

        let mut command = Command::new(program);
        command.args(leading).args(invocation.engine_args());

        tracing::info!(
            job_handle = %handle,
            workdir = %invocation.workdir.display(),
            "Job accepted by process backend",
        );

        let handle_for_task = handle.clone();
        let slots = Arc::clone(&self.slots);
        let jobs = Arc::clone(&self.jobs);
        let retention = self.retention;
        let shutdown = self.cancel.clone();
        self.tasks.spawn(async move {
            run_job(&handle_for_task, command, invocation, slots, job).await;
            evict_after(jobs, handle_for_task, retention, shutdown).await;
        });

        Ok(handle)
    }

    async fn get_state(&self, handle: &JobHandle) -> Result<JobState, BackendError> {
        let job = self.lookup(handle).await?;
        let state = job.status.borrow().state;
        Ok(state)
    }

    async fn terminate(&self, handle: &JobHandle) -> Result<(), BackendError> {
        let job = self.lookup(handle).await?;
        tracing::info!(job_handle = %handle, "Terminating job");
        job.cancel.cancel();
        Ok(())
    }

    async fn outcome(&self, handle: &JobHandle) -> Result<Option<JobOutcome>, BackendError> {
        let job = self.lookup(handle).await?;
        let snapshot = job.status.borrow().clone();
        Ok(is_finished(snapshot.state).then_some(snapshot.outcome))
    }
}

fn is_finished(state: JobState) -> bool {
    matches!(
        state,
        JobState::Success | JobState::Failure | JobState::Revoked
    )
}

// ---------------------------------------------------------------------------
// Job task
// ---------------------------------------------------------------------------

impl ManagedJob {
    fn set_started(&self) {
        self.status.send_modify(|s| {
            s.state = JobState::Started;
            s.outcome.started_at = Some(chrono::Utc::now());
        });
    }

    fn set_finished(&self, state: JobState, exit_code: Option<i32>) {
        self.status.send_modify(|s| {
            s.state = state;
            s.outcome.exit_code = exit_code;
            s.outcome.finished_at = Some(chrono::Utc::now());
        });
    }
}

async fn run_job(
    handle: &JobHandle,
    mut command: Command,
    invocation: Invocation,
    slots: Arc<Semaphore>,
    job: Arc<ManagedJob>,
) {
    let permit = tokio::select! {
        _ = job.cancel.cancelled() => {
            tracing::info!(job_handle = %handle, "Job revoked before start");
            job.set_finished(JobState::Revoked, None);
            return;
        }
        permit = slots.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                job.set_finished(JobState::Revoked, None);
                return;
            }
        },
    };

    let mut child = match spawn(&mut command, &invocation) {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(job_handle = %handle, error = %e, "Failed to start engine process");
            job.set_finished(JobState::Failure, None);
            return;
        }
    };
    job.set_started();
    tracing::info!(job_handle = %handle, pid = ?child.id(), "Engine process started");

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => {
                tracing::info!(job_handle = %handle, "Engine process succeeded");
                job.set_finished(JobState::Success, status.code());
            }
            Ok(status) => {
                tracing::warn!(job_handle = %handle, exit_code = ?status.code(), "Engine process failed");
                job.set_finished(JobState::Failure, status.code());
            }
            Err(e) => {
                tracing::error!(job_handle = %handle, error = %e, "Lost track of engine process");
                job.set_finished(JobState::Failure, None);
            }
        },
        _ = job.cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                tracing::warn!(job_handle = %handle, error = %e, "Failed to kill engine process");
            }
            tracing::info!(job_handle = %handle, "Engine process revoked");
            job.set_finished(JobState::Revoked, None);
        }
    }

    drop(permit);
}

/// Forget a finished job once `retention` has passed. Shutdown keeps it.
async fn evict_after(
    jobs: JobTable,
    handle: JobHandle,
    retention: Duration,
    shutdown: CancellationToken,
) {
    tokio::select! {
        _ = tokio::time::sleep(retention) => {
            jobs.write().await.remove(&handle);
            tracing::debug!(job_handle = %handle, "Finished job evicted");
        }
        _ = shutdown.cancelled() => {}
    }
}

fn spawn(command: &mut Command, invocation: &Invocation) -> std::io::Result<Child> {
    let stdout = std::fs::File::create(invocation.stdout_path())?;
    let stderr = std::fs::File::create(invocation.stderr_path())?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true)
        .spawn()
}
