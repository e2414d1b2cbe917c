pub mod health;
pub mod runs;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the WES route tree, mounted under `/ga4gh/wes/v1`.
///
/// ```text
/// /service-info                    service description and state counts
/// /runs                            list (GET), submit (POST)
/// /runs/{id}                       full run log
/// /runs/{id}/status                reconciled state
/// /runs/{id}/cancel                cancel (POST)
/// ```
pub fn wes_routes() -> Router<AppState> {
    Router::new()
        .route("/service-info", get(handlers::service_info::get_service_info))
        .nest("/runs", runs::router())
}
