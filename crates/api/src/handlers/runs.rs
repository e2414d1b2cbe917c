//! Handlers for the `/runs` resource.
//!
//! Thin adapters over [`RunLifecycle`](wes_engine::lifecycle::RunLifecycle):
//! each handler decodes its input, makes one lifecycle call and encodes
//! the result using the WES response shapes.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use wes_core::request::RunRequest;
use wes_core::run_state::RunState;
use wes_core::types::{RunId, Timestamp};
use wes_db::models::run::{Run, RunLog, RunSummary};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct RunIdResponse {
    pub run_id: RunId,
}

#[derive(Debug, Serialize)]
pub struct RunStatusResponse {
    pub run_id: RunId,
    pub state: RunState,
}

#[derive(Debug, Serialize)]
pub struct RunListResponse {
    pub runs: Vec<RunSummary>,
    /// Always empty; the listing is not paginated.
    pub next_page_token: String,
}

/// Full run record as exposed to clients. Backend bookkeeping (job handle,
/// store version) is left out.
#[derive(Debug, Serialize)]
pub struct RunLogResponse {
    pub run_id: RunId,
    pub request: RunRequest,
    pub state: RunState,
    pub request_time: Timestamp,
    /// Engine working directory, once the run has been prepared for dispatch.
    pub execution_path: Option<PathBuf>,
    pub run_log: RunLog,
    pub task_logs: Vec<serde_json::Value>,
    pub outputs: serde_json::Value,
}

impl From<Run> for RunLogResponse {
    fn from(run: Run) -> Self {
        Self {
            run_id: run.run_id().clone(),
            request: run.request().clone(),
            state: run.run_status,
            request_time: run.request_time(),
            execution_path: run.execution_path().map(FsPath::to_path_buf),
            run_log: run.run_log,
            task_logs: run.task_logs,
            outputs: run.outputs,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /ga4gh/wes/v1/runs
///
/// Validate, resolve and dispatch a run. Returns once the backend accepted
/// the job.
pub async fn submit_run(
    State(state): State<AppState>,
    body: Result<Json<RunRequest>, JsonRejection>,
) -> AppResult<Json<RunIdResponse>> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let run_id = state.lifecycle.submit(request).await?;
    tracing::info!(run_id = %run_id, "Run submitted");

    Ok(Json(RunIdResponse { run_id }))
}

/// GET /ga4gh/wes/v1/runs
pub async fn list_runs(State(state): State<AppState>) -> AppResult<Json<RunListResponse>> {
    let runs = state.lifecycle.list().await?;
    Ok(Json(RunListResponse {
        runs,
        next_page_token: String::new(),
    }))
}

/// GET /ga4gh/wes/v1/runs/{id}
pub async fn get_run_log(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> AppResult<Json<RunLogResponse>> {
    let run = state.lifecycle.get_log(&RunId::from(run_id)).await?;
    Ok(Json(run.into()))
}

/// GET /ga4gh/wes/v1/runs/{id}/status
pub async fn get_run_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> AppResult<Json<RunStatusResponse>> {
    let run_id = RunId::from(run_id);
    let run_state = state.lifecycle.get_status(&run_id).await?;
    Ok(Json(RunStatusResponse {
        run_id,
        state: run_state,
    }))
}

/// POST /ga4gh/wes/v1/runs/{id}/cancel
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> AppResult<Json<RunIdResponse>> {
    let run_id = state.lifecycle.cancel(&RunId::from(run_id)).await?;
    Ok(Json(RunIdResponse { run_id }))
}
