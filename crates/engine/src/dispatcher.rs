//! Materializes a run's working directory and submits its invocation.

use std::path::PathBuf;
use std::sync::Arc;

use wes_core::error::CoreError;
use wes_core::types::{JobHandle, RunId};
use wes_db::models::run::Run;

use crate::backend::JobBackend;
use crate::config::EngineConfig;
use crate::invocation::{self, Invocation, CONFIG_FILE_NAME};

/// Result of a successful dispatch.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub job_handle: JobHandle,
    pub invocation: Invocation,
    /// Human-readable rendering of the engine command line.
    pub cmd: String,
}

/// Turns a run into exactly one backend job.
pub struct JobDispatcher {
    backend: Arc<dyn JobBackend>,
    work_dir: PathBuf,
    engine_command: Vec<String>,
    default_parameters: Vec<String>,
}

impl JobDispatcher {
    pub fn new(backend: Arc<dyn JobBackend>, config: &EngineConfig) -> Self {
        Self {
            backend,
            work_dir: config.work_dir.clone(),
            engine_command: config.command.clone(),
            default_parameters: config.default_parameters.clone(),
        }
    }

    /// Working directory a run will execute in.
    pub fn workdir_for(&self, run_id: &RunId) -> PathBuf {
        invocation::workdir_for(&self.work_dir, run_id.as_str())
    }

    /// Create the working directory, write the resolved parameters to the
    /// config file and submit the invocation.
    ///
    /// Any failure here is fatal for the submission and yields no handle.
    pub async fn dispatch(
        &self,
        run: &Run,
        resolved_params: &serde_json::Value,
    ) -> Result<Dispatched, CoreError> {
        let workdir = run
            .execution_path()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.workdir_for(run.run_id()));

        let config_file = self.materialize(&workdir, resolved_params).await?;

        let invocation = Invocation {
            workflow_url: run.request().workflow_url.clone(),
            workdir,
            config_file_paths: vec![config_file],
            engine_default_parameters: self.default_parameters.clone(),
        };
        let cmd = invocation.render(&self.engine_command);

        let job_handle = self
            .backend
            .submit(invocation.clone())
            .await
            .map_err(|e| CoreError::Dispatch(e.to_string()))?;

        tracing::info!(
            run_id = %run.run_id(),
            job_handle = %job_handle,
            cmd = %cmd,
            "Run dispatched",
        );

        Ok(Dispatched {
            job_handle,
            invocation,
            cmd,
        })
    }

    async fn materialize(
        &self,
        workdir: &std::path::Path,
        params: &serde_json::Value,
    ) -> Result<PathBuf, CoreError> {
        tokio::fs::create_dir_all(workdir).await.map_err(|e| {
            CoreError::Dispatch(format!(
                "Cannot create working directory {}: {e}",
                workdir.display()
            ))
        })?;

        let body = serde_json::to_vec_pretty(params)
            .map_err(|e| CoreError::Dispatch(format!("Cannot serialize parameters: {e}")))?;

        let config_file = workdir.join(CONFIG_FILE_NAME);
        tokio::fs::write(&config_file, body).await.map_err(|e| {
            CoreError::Dispatch(format!(
                "Cannot write config file {}: {e}",
                config_file.display()
            ))
        })?;

        Ok(config_file)
    }
}
