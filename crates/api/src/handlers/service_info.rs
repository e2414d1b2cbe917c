use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use wes_core::run_state::RunState;
use wes_db::models::run::RunSummary;

use crate::error::AppResult;
use crate::state::AppState;

/// WES API versions this server implements.
const SUPPORTED_WES_VERSIONS: &[&str] = &["1.0.0"];

/// URI schemes accepted for workflow inputs.
const SUPPORTED_FILESYSTEM_PROTOCOLS: &[&str] = &["file", "http", "https", "drs"];

#[derive(Debug, Serialize)]
pub struct WorkflowTypeVersion {
    pub workflow_type_version: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfoResponse {
    pub workflow_type_versions: BTreeMap<String, WorkflowTypeVersion>,
    pub supported_wes_versions: Vec<&'static str>,
    pub supported_filesystem_protocols: Vec<&'static str>,
    pub workflow_engine_versions: BTreeMap<String, String>,
    pub default_workflow_engine_parameters: Vec<String>,
    /// Runs per state, from last-persisted states.
    pub system_state_counts: BTreeMap<&'static str, usize>,
    pub tags: BTreeMap<String, String>,
}

/// GET /ga4gh/wes/v1/service-info
pub async fn get_service_info(State(state): State<AppState>) -> AppResult<Json<ServiceInfoResponse>> {
    let runs = state.lifecycle.list().await?;
    let supported = state.lifecycle.supported_workflows();

    let workflow_type_versions = supported
        .types
        .iter()
        .map(|t| {
            (
                t.clone(),
                WorkflowTypeVersion {
                    workflow_type_version: supported.versions.clone(),
                },
            )
        })
        .collect();

    let engine = &state.config.engine;
    let workflow_engine_versions = engine
        .command
        .first()
        .map(|program| (program.clone(), "unknown".to_string()))
        .into_iter()
        .collect();

    Ok(Json(ServiceInfoResponse {
        workflow_type_versions,
        supported_wes_versions: SUPPORTED_WES_VERSIONS.to_vec(),
        supported_filesystem_protocols: SUPPORTED_FILESYSTEM_PROTOCOLS.to_vec(),
        workflow_engine_versions,
        default_workflow_engine_parameters: engine.default_parameters.clone(),
        system_state_counts: state_counts(&runs),
        tags: BTreeMap::new(),
    }))
}

/// Count runs per state. Every state is present, zero when unused.
pub fn state_counts(runs: &[RunSummary]) -> BTreeMap<&'static str, usize> {
    let mut counts: BTreeMap<&'static str, usize> =
        RunState::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for run in runs {
        *counts.entry(run.state.as_str()).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use wes_core::types::RunId;

    use super::*;

    #[test]
    fn counts_cover_every_state() {
        let runs = vec![
            RunSummary {
                run_id: RunId::from("a"),
                state: RunState::Running,
            },
            RunSummary {
                run_id: RunId::from("b"),
                state: RunState::Running,
            },
            RunSummary {
                run_id: RunId::from("c"),
                state: RunState::Canceled,
            },
        ];

        let counts = state_counts(&runs);
        assert_eq!(counts.len(), RunState::ALL.len());
        assert_eq!(counts["RUNNING"], 2);
        assert_eq!(counts["CANCELED"], 1);
        assert_eq!(counts["COMPLETE"], 0);
    }
}
