#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use wes_api::config::ServerConfig;
use wes_api::router::build_app_router;
use wes_api::state::AppState;
use wes_core::request::SupportedWorkflows;
use wes_core::run_state::JobState;
use wes_core::types::JobHandle;
use wes_db::repositories::MemoryRunStore;
use wes_drs::api::{DrsObject, ObjectMetadataSource};
use wes_drs::config::DrsConfig;
use wes_drs::{InputResolver, ResolveError};
use wes_engine::backend::{BackendError, JobBackend};
use wes_engine::config::EngineConfig;
use wes_engine::invocation::Invocation;
use wes_engine::lifecycle::RunLifecycle;

/// Build a test `ServerConfig` rooted at `work_dir`.
pub fn test_config(work_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: None,
        supported_workflows: SupportedWorkflows {
            types: vec!["SMK".into()],
            versions: vec!["6.0".into()],
        },
        engine: EngineConfig {
            work_dir: work_dir.to_path_buf(),
            command: vec!["snakemake".into()],
            default_parameters: vec!["--cores".into(), "1".into()],
            max_concurrent_jobs: 1,
            job_retention_secs: 3600,
        },
        drs: DrsConfig {
            api_prefix: "ga4gh/drs/v1".into(),
            request_timeout_secs: 5,
        },
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Backend whose job states are set by the test.
#[derive(Default)]
pub struct FakeBackend {
    states: Mutex<HashMap<JobHandle, JobState>>,
    next_id: AtomicUsize,
}

impl FakeBackend {
    pub fn set_all(&self, state: JobState) {
        for s in self.states.lock().unwrap().values_mut() {
            *s = state;
        }
    }
}

#[async_trait]
impl JobBackend for FakeBackend {
    async fn submit(&self, _invocation: Invocation) -> Result<JobHandle, BackendError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = JobHandle::new(format!("job-{n}"));
        self.states
            .lock()
            .unwrap()
            .insert(handle.clone(), JobState::Pending);
        Ok(handle)
    }

    async fn get_state(&self, handle: &JobHandle) -> Result<JobState, BackendError> {
        self.states
            .lock()
            .unwrap()
            .get(handle)
            .copied()
            .ok_or_else(|| BackendError::UnknownJob(handle.clone()))
    }

    async fn terminate(&self, _handle: &JobHandle) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Metadata source that knows no objects.
pub struct NoObjects;

#[async_trait]
impl ObjectMetadataSource for NoObjects {
    async fn fetch_object(&self, objects_url: &str) -> Result<DrsObject, ResolveError> {
        Err(ResolveError::Api {
            url: objects_url.to_string(),
            status: 404,
            body: String::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub backend: Arc<FakeBackend>,
    pub work_dir: tempfile::TempDir,
}

/// Build the full application router with all middleware layers, backed
/// by an in-memory store and a fake job backend.
pub fn build_test_app() -> TestApp {
    let work_dir = tempfile::tempdir().unwrap();
    let config = test_config(work_dir.path());
    let backend = Arc::new(FakeBackend::default());

    let lifecycle = RunLifecycle::new(
        Arc::new(MemoryRunStore::new()),
        backend.clone(),
        InputResolver::new(Arc::new(NoObjects), config.drs.api_prefix.clone()),
        &config.engine,
        config.supported_workflows.clone(),
    );

    let state = AppState {
        lifecycle: Arc::new(lifecycle),
        config: Arc::new(config.clone()),
        pool: None,
    };

    TestApp {
        router: build_app_router(state, &config),
        backend,
        work_dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_empty(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
