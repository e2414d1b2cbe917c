use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wes_api::config::ServerConfig;
use wes_api::router::build_app_router;
use wes_api::state::AppState;
use wes_db::repositories::{MemoryRunStore, PgRunStore, RunStore};
use wes_drs::api::DrsApi;
use wes_drs::InputResolver;
use wes_engine::lifecycle::RunLifecycle;
use wes_engine::process::ProcessBackend;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "wes_api=debug,wes_engine=debug,wes_drs=debug,wes_db=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Run store ---
    let (store, pool) = match &config.database_url {
        Some(database_url) => {
            let pool = wes_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            wes_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            wes_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let store: Arc<dyn RunStore> = Arc::new(PgRunStore::new(pool.clone()));
            (store, Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, runs are kept in memory only");
            let store: Arc<dyn RunStore> = Arc::new(MemoryRunStore::new());
            (store, None)
        }
    };

    // --- Job backend ---
    std::fs::create_dir_all(&config.engine.work_dir).expect("Failed to create WES_WORK_DIR");
    let backend = ProcessBackend::with_retention(
        config.engine.command.clone(),
        config.engine.max_concurrent_jobs,
        Duration::from_secs(config.engine.job_retention_secs),
    );
    tracing::info!(
        work_dir = %config.engine.work_dir.display(),
        max_concurrent_jobs = config.engine.max_concurrent_jobs,
        job_retention_secs = config.engine.job_retention_secs,
        "Process backend started",
    );

    // --- Input resolver ---
    let drs_api = DrsApi::new(Duration::from_secs(config.drs.request_timeout_secs))
        .expect("Failed to build DRS HTTP client");
    let resolver = InputResolver::new(Arc::new(drs_api), config.drs.api_prefix.clone());

    // --- Lifecycle ---
    let lifecycle = RunLifecycle::new(
        store,
        backend.clone(),
        resolver,
        &config.engine,
        config.supported_workflows.clone(),
    );

    // --- App state ---
    let state = AppState {
        lifecycle: Arc::new(lifecycle),
        config: Arc::new(config.clone()),
        pool,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    let outstanding = backend.job_count().await;
    tracing::info!(outstanding, "Terminating engine processes");
    backend.shutdown().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
