//! The asynchronous job backend contract.

use async_trait::async_trait;
use wes_core::run_state::JobState;
use wes_core::types::{JobHandle, Timestamp};

use crate::invocation::Invocation;

/// Errors from talking to a job backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached or is shutting down.
    #[error("Job backend unavailable: {0}")]
    Unavailable(String),

    /// The backend has no record of this handle.
    #[error("Unknown job handle {0}")]
    UnknownJob(JobHandle),

    /// The backend refused the submission.
    #[error("Job submission rejected: {0}")]
    Rejected(String),
}

/// What the backend knows about a finished job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobOutcome {
    pub exit_code: Option<i32>,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

/// Submits opaque jobs and reports their state.
///
/// Implementations own all execution concurrency; callers only submit,
/// poll and terminate.
#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn submit(&self, invocation: Invocation) -> Result<JobHandle, BackendError>;

    async fn get_state(&self, handle: &JobHandle) -> Result<JobState, BackendError>;

    /// Ask the backend to stop the job. Does not wait for it to stop.
    async fn terminate(&self, handle: &JobHandle) -> Result<(), BackendError>;

    /// Exit details of a finished job, if the backend tracks them.
    async fn outcome(&self, _handle: &JobHandle) -> Result<Option<JobOutcome>, BackendError> {
        Ok(None)
    }
}
