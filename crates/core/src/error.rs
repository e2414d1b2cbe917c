/// Errors surfaced by the run lifecycle to its callers.
///
/// The transport layer maps each variant onto a response status; the
/// lower-level crates (store, resolver, backend) convert their own error
/// types into one of these.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// Malformed submission, rejected before any run is created.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An indirect input reference could not be resolved.
    #[error("Input resolution failed: {0}")]
    Resolution(String),

    /// Working directory setup or backend submission failed.
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    /// The job backend could not be reached while querying state.
    #[error("Job backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing run.
    pub fn run_not_found(id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: "Run",
            id: id.to_string(),
        }
    }
}
