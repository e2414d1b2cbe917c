//! In-process run store.
//!
//! Used when no database is configured and throughout the test suites.
//! Allocation reserves ids under a lock, so two concurrent allocations can
//! never hand out the same id even before either run is created.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use wes_core::types::RunId;

use crate::models::run::{Run, RunSummary};
use crate::repositories::run_store::{RunStore, StoreError, MAX_ALLOCATION_ATTEMPTS};

type IdGenerator = Box<dyn Fn() -> RunId + Send + Sync>;

pub struct MemoryRunStore {
    runs: RwLock<HashMap<RunId, Run>>,
    /// Ids handed out by `allocate_id` but not yet created.
    reserved: Mutex<HashSet<RunId>>,
    generate: IdGenerator,
}

impl Default for MemoryRunStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::with_id_generator(RunId::generate)
    }

    /// Use a custom id source (deterministic ids in tests).
    pub fn with_id_generator(generate: impl Fn() -> RunId + Send + Sync + 'static) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            reserved: Mutex::new(HashSet::new()),
            generate: Box::new(generate),
        }
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn exists(&self, run_id: &RunId) -> Result<bool, StoreError> {
        Ok(self.runs.read().await.contains_key(run_id))
    }

    async fn allocate_id(&self) -> Result<RunId, StoreError> {
        let mut reserved = self.reserved.lock().await;
        let runs = self.runs.read().await;

        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let candidate = (self.generate)();
            if !runs.contains_key(&candidate) && !reserved.contains(&candidate) {
                reserved.insert(candidate.clone());
                return Ok(candidate);
            }
            tracing::debug!(run_id = %candidate, attempt, "Run id collision, regenerating");
        }
        Err(StoreError::IdSpaceExhausted(MAX_ALLOCATION_ATTEMPTS))
    }

    async fn create(&self, mut run: Run) -> Result<Run, StoreError> {
        {
            let mut runs = self.runs.write().await;
            if runs.contains_key(run.run_id()) {
                return Err(StoreError::Duplicate(run.run_id().clone()));
            }
            run.set_version(1);
            runs.insert(run.run_id().clone(), run.clone());
        }
        // Released separately: allocate_id takes `reserved` before `runs`.
        self.reserved.lock().await.remove(run.run_id());
        Ok(run)
    }

    async fn get(&self, run_id: &RunId) -> Result<Run, StoreError> {
        self.runs
            .read()
            .await
            .get(run_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(run_id.clone()))
    }

    async fn update(&self, mut run: Run) -> Result<Run, StoreError> {
        let mut runs = self.runs.write().await;
        let stored = runs
            .get_mut(run.run_id())
            .ok_or_else(|| StoreError::NotFound(run.run_id().clone()))?;

        if stored.version() != run.version() {
            return Err(StoreError::Conflict {
                run_id: run.run_id().clone(),
                expected_version: run.version(),
            });
        }

        run.set_version(run.version() + 1);
        *stored = run.clone();
        Ok(run)
    }

    async fn list_summaries(&self) -> Result<Vec<RunSummary>, StoreError> {
        Ok(self.runs.read().await.values().map(Run::summary).collect())
    }
}
