use std::sync::Arc;

use wes_engine::lifecycle::RunLifecycle;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<RunLifecycle>,
    pub config: Arc<ServerConfig>,
    /// Database pool, when runs are persisted in Postgres.
    pub pool: Option<wes_db::DbPool>,
}
