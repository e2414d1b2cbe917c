#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wes_core::request::{RunRequest, SupportedWorkflows};
use wes_core::run_state::{JobState, RunState};
use wes_core::types::{JobHandle, RunId};
use wes_db::models::run::{Run, RunSummary};
use wes_db::repositories::{MemoryRunStore, RunStore, StoreError};
use wes_drs::api::{DrsObject, ObjectMetadataSource};
use wes_drs::{InputResolver, ResolveError};
use wes_engine::backend::{BackendError, JobBackend, JobOutcome};
use wes_engine::config::EngineConfig;
use wes_engine::invocation::Invocation;
use wes_engine::lifecycle::RunLifecycle;

pub const DRS_PREFIX: &str = "ga4gh/drs/v1";

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn supported() -> SupportedWorkflows {
    SupportedWorkflows {
        types: vec!["SMK".into()],
        versions: vec!["6.0".into()],
    }
}

pub fn request(params: serde_json::Value) -> RunRequest {
    RunRequest {
        workflow_url: "file:wf/Snakefile".into(),
        workflow_type: "SMK".into(),
        workflow_type_version: "6.0".into(),
        workflow_params: params,
        tags: BTreeMap::new(),
    }
}

pub fn engine_config(work_dir: PathBuf) -> EngineConfig {
    EngineConfig {
        work_dir,
        command: vec!["snakemake".into()],
        default_parameters: vec!["--cores".into(), "1".into()],
        max_concurrent_jobs: 1,
        job_retention_secs: 3600,
    }
}

// ---------------------------------------------------------------------------
// Fake job backend
// ---------------------------------------------------------------------------

/// In-memory backend whose job states are set by the test.
#[derive(Default)]
pub struct ScriptedBackend {
    states: Mutex<HashMap<JobHandle, JobState>>,
    submitted: Mutex<Vec<Invocation>>,
    terminated: Mutex<Vec<JobHandle>>,
    outcome: Mutex<Option<JobOutcome>>,
    state_calls: AtomicUsize,
    next_id: AtomicUsize,
    reject_submit: AtomicBool,
    unavailable: AtomicBool,
}

impl ScriptedBackend {
    pub fn set_state(&self, handle: &JobHandle, state: JobState) {
        self.states.lock().unwrap().insert(handle.clone(), state);
    }

    /// Make the backend forget a job, as after a restart.
    pub fn forget(&self, handle: &JobHandle) {
        self.states.lock().unwrap().remove(handle);
    }

    pub fn set_outcome(&self, outcome: JobOutcome) {
        *self.outcome.lock().unwrap() = Some(outcome);
    }

    pub fn reject_submissions(&self) {
        self.reject_submit.store(true, Ordering::SeqCst);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<Invocation> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn terminated(&self) -> Vec<JobHandle> {
        self.terminated.lock().unwrap().clone()
    }

    pub fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn submit(&self, invocation: Invocation) -> Result<JobHandle, BackendError> {
        if self.reject_submit.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected("queue full".into()));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = JobHandle::new(format!("job-{n}"));
        self.states
            .lock()
            .unwrap()
            .insert(handle.clone(), JobState::Pending);
        self.submitted.lock().unwrap().push(invocation);
        Ok(handle)
    }

    async fn get_state(&self, handle: &JobHandle) -> Result<JobState, BackendError> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("connection refused".into()));
        }
        self.states
            .lock()
            .unwrap()
            .get(handle)
            .copied()
            .ok_or_else(|| BackendError::UnknownJob(handle.clone()))
    }

    async fn terminate(&self, handle: &JobHandle) -> Result<(), BackendError> {
        self.terminated.lock().unwrap().push(handle.clone());
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("connection refused".into()));
        }
        Ok(())
    }

    async fn outcome(&self, _handle: &JobHandle) -> Result<Option<JobOutcome>, BackendError> {
        Ok(self.outcome.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Fake metadata source
// ---------------------------------------------------------------------------

/// Serves fixed object documents by URL.
#[derive(Default)]
pub struct StaticSource {
    objects: HashMap<String, DrsObject>,
}

impl StaticSource {
    pub fn with(mut self, url: &str, object: serde_json::Value) -> Self {
        let object: DrsObject = serde_json::from_value(object).unwrap();
        self.objects.insert(url.to_string(), object);
        self
    }
}

#[async_trait]
impl ObjectMetadataSource for StaticSource {
    async fn fetch_object(&self, objects_url: &str) -> Result<DrsObject, ResolveError> {
        self.objects
            .get(objects_url)
            .cloned()
            .ok_or_else(|| ResolveError::Api {
                url: objects_url.to_string(),
                status: 404,
                body: "no such object".into(),
            })
    }
}

// ---------------------------------------------------------------------------
// Interfering store
// ---------------------------------------------------------------------------

/// Wraps a store and, when armed, slips a competing write in front of
/// a chosen update, so that update hits a version conflict. Can also be
/// told to fail updates outright, as when the database goes away.
pub struct InterferingStore {
    inner: Arc<MemoryRunStore>,
    updates: AtomicUsize,
    /// Absolute update number to interfere with, and the state to write.
    armed: Mutex<Option<(usize, RunState)>>,
    /// Absolute update number from which every update fails.
    failing_from: Mutex<Option<usize>>,
}

impl InterferingStore {
    pub fn new(inner: Arc<MemoryRunStore>) -> Self {
        Self {
            inner,
            updates: AtomicUsize::new(0),
            armed: Mutex::new(None),
            failing_from: Mutex::new(None),
        }
    }

    /// The next update is preceded by another writer setting `state`.
    pub fn interfere_once(&self, state: RunState) {
        self.interfere_on_update(1, state);
    }

    /// The `nth` update from now (1-based) is preceded by another writer
    /// setting `state`.
    pub fn interfere_on_update(&self, nth: usize, state: RunState) {
        let at = self.updates.load(Ordering::SeqCst) + nth;
        *self.armed.lock().unwrap() = Some((at, state));
    }

    /// The `nth` update from now (1-based) and every later one fail.
    pub fn fail_updates_from(&self, nth: usize) {
        let at = self.updates.load(Ordering::SeqCst) + nth;
        *self.failing_from.lock().unwrap() = Some(at);
    }
}

#[async_trait]
impl RunStore for InterferingStore {
    async fn exists(&self, run_id: &RunId) -> Result<bool, StoreError> {
        self.inner.exists(run_id).await
    }

    async fn create(&self, run: Run) -> Result<Run, StoreError> {
        self.inner.create(run).await
    }

    async fn get(&self, run_id: &RunId) -> Result<Run, StoreError> {
        self.inner.get(run_id).await
    }

    async fn update(&self, run: Run) -> Result<Run, StoreError> {
        let n = self.updates.fetch_add(1, Ordering::SeqCst) + 1;

        if self.failing_from.lock().unwrap().is_some_and(|from| n >= from) {
            return Err(StoreError::Corrupt("db went away".into()));
        }

        let competing = {
            let mut armed = self.armed.lock().unwrap();
            match *armed {
                Some((at, state)) if at == n => {
                    *armed = None;
                    Some(state)
                }
                _ => None,
            }
        };
        if let Some(state) = competing {
            let mut other = self.inner.get(run.run_id()).await?;
            other.run_status = state;
            self.inner.update(other).await?;
        }
        self.inner.update(run).await
    }

    async fn list_summaries(&self) -> Result<Vec<RunSummary>, StoreError> {
        self.inner.list_summaries().await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub lifecycle: RunLifecycle,
    pub store: Arc<InterferingStore>,
    pub backend: Arc<ScriptedBackend>,
    pub work_dir: tempfile::TempDir,
}

pub fn harness() -> Harness {
    harness_with_source(StaticSource::default())
}

pub fn harness_with_source(source: StaticSource) -> Harness {
    let work_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InterferingStore::new(Arc::new(MemoryRunStore::new())));
    let backend = Arc::new(ScriptedBackend::default());
    let resolver = InputResolver::new(Arc::new(source), DRS_PREFIX);

    let lifecycle = RunLifecycle::new(
        store.clone(),
        backend.clone(),
        resolver,
        &engine_config(work_dir.path().to_path_buf()),
        supported(),
    );

    Harness {
        lifecycle,
        store,
        backend,
        work_dir,
    }
}

impl Harness {
    pub async fn run(&self, run_id: &RunId) -> Run {
        self.store.get(run_id).await.unwrap()
    }

    pub fn handle_of(run: &Run) -> JobHandle {
        run.job_handle().cloned().expect("run has no job handle")
    }

    /// Parameters the engine was handed for the `n`th submitted job.
    pub fn submitted_params(&self, n: usize) -> serde_json::Value {
        let invocation = &self.backend.submitted()[n];
        let body = std::fs::read(&invocation.config_file_paths[0]).unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}
