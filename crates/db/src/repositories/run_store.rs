//! The run store contract.

use async_trait::async_trait;
use wes_core::error::CoreError;
use wes_core::types::RunId;

use crate::models::run::{Run, RunSummary};

/// Upper bound on id generation attempts before allocation gives up.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 16;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Run {0} not found")]
    NotFound(RunId),

    /// The caller's snapshot is stale: someone else wrote the run since it
    /// was read.
    #[error("Run {run_id} was modified concurrently (expected version {expected_version})")]
    Conflict { run_id: RunId, expected_version: i64 },

    #[error("Run {0} already exists")]
    Duplicate(RunId),

    #[error("No unique run id found after {0} attempts")]
    IdSpaceExhausted(usize),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Run document could not be (de)serialized: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Stored run is corrupt: {0}")]
    Corrupt(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoreError::run_not_found(id),
            StoreError::Conflict { .. } | StoreError::Duplicate(_) => {
                CoreError::Conflict(err.to_string())
            }
            other => CoreError::Internal(other.to_string()),
        }
    }
}

/// Whole-record CRUD over persisted runs.
///
/// Reads return full snapshots and writes replace whole records. `update`
/// is conditional on [`Run::version`]: it succeeds only when the stored
/// revision still matches the snapshot the caller read, then bumps it.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn exists(&self, run_id: &RunId) -> Result<bool, StoreError>;

    /// Produce an id that no stored run uses.
    async fn allocate_id(&self) -> Result<RunId, StoreError> {
        allocate_unique_id(self, RunId::generate).await
    }

    /// Insert a new run. Fails with [`StoreError::Duplicate`] if the id is taken.
    async fn create(&self, run: Run) -> Result<Run, StoreError>;

    async fn get(&self, run_id: &RunId) -> Result<Run, StoreError>;

    /// Replace a stored run, returning it at its new version.
    async fn update(&self, run: Run) -> Result<Run, StoreError>;

    async fn list_summaries(&self) -> Result<Vec<RunSummary>, StoreError>;
}

/// Generate ids until one is not already in the store.
pub async fn allocate_unique_id<S, G>(store: &S, mut generate: G) -> Result<RunId, StoreError>
where
    S: RunStore + ?Sized,
    G: FnMut() -> RunId + Send,
{
    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
        let candidate = generate();
        if !store.exists(&candidate).await? {
            return Ok(candidate);
        }
        tracing::debug!(run_id = %candidate, attempt, "Run id collision, regenerating");
    }
    Err(StoreError::IdSpaceExhausted(MAX_ALLOCATION_ATTEMPTS))
}
