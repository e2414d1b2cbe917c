//! The workflow run entity and its listing projection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wes_core::error::CoreError;
use wes_core::request::RunRequest;
use wes_core::run_state::RunState;
use wes_core::types::{JobHandle, RunId, Timestamp};

/// Execution metadata accumulated while a run is dispatched and observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub name: Option<String>,
    /// Human-readable rendering of the engine invocation.
    pub cmd: Option<String>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    /// Path of the captured standard output.
    pub stdout: Option<String>,
    /// Path of the captured standard error.
    pub stderr: Option<String>,
    pub exit_code: Option<i32>,
}

/// One submitted workflow execution attempt.
///
/// Identity (`run_id`, `request_time`, `request`) is fixed at construction
/// and only readable afterwards. `execution_path` and `job_handle` may each
/// be recorded once. `version` is owned by the store and drives its
/// conditional updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    run_id: RunId,
    request_time: Timestamp,
    request: RunRequest,
    #[serde(rename = "state")]
    pub run_status: RunState,
    execution_path: Option<PathBuf>,
    pub run_log: RunLog,
    #[serde(default)]
    pub task_logs: Vec<serde_json::Value>,
    #[serde(default)]
    pub outputs: serde_json::Value,
    job_handle: Option<JobHandle>,
    #[serde(skip)]
    version: i64,
}

impl Run {
    /// A freshly accepted run in `UNKNOWN` state.
    pub fn new(run_id: RunId, request: RunRequest) -> Self {
        Self {
            run_id,
            request_time: chrono::Utc::now(),
            request,
            run_status: RunState::Unknown,
            execution_path: None,
            run_log: RunLog::default(),
            task_logs: Vec::new(),
            outputs: serde_json::Value::Object(Default::default()),
            job_handle: None,
            version: 0,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn request_time(&self) -> Timestamp {
        self.request_time
    }

    pub fn request(&self) -> &RunRequest {
        &self.request
    }

    pub fn execution_path(&self) -> Option<&Path> {
        self.execution_path.as_deref()
    }

    pub fn job_handle(&self) -> Option<&JobHandle> {
        self.job_handle.as_ref()
    }

    /// Store revision this snapshot was read at; `0` before the first write.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    /// Record the engine working directory. Fails if one is already set.
    pub fn record_execution_path(&mut self, path: PathBuf) -> Result<(), CoreError> {
        if let Some(existing) = &self.execution_path {
            return Err(CoreError::Conflict(format!(
                "Run {} already has execution path {}",
                self.run_id,
                existing.display()
            )));
        }
        self.execution_path = Some(path);
        Ok(())
    }

    /// Record the backend job handle. Fails if one is already set.
    pub fn record_job_handle(&mut self, handle: JobHandle) -> Result<(), CoreError> {
        if let Some(existing) = &self.job_handle {
            return Err(CoreError::Conflict(format!(
                "Run {} already has job handle {existing}",
                self.run_id
            )));
        }
        self.job_handle = Some(handle);
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            state: self.run_status,
        }
    }
}

/// Listing projection: id and last persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub state: RunState,
}
