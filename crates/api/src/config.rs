use wes_core::request::SupportedWorkflows;
use wes_drs::config::DrsConfig;
use wes_engine::config::EngineConfig;

/// Default HTTP request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Postgres URL; runs are kept in memory when unset.
    pub database_url: Option<String>,
    /// Workflow types and versions accepted on submission.
    pub supported_workflows: SupportedWorkflows,
    pub engine: EngineConfig,
    pub drs: DrsConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `HOST`                       | `0.0.0.0`               |
    /// | `PORT`                       | `8080`                  |
    /// | `CORS_ORIGINS`               | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                    |
    /// | `DATABASE_URL`               | unset                   |
    /// | `WES_WORKFLOW_TYPES`         | `SMK`                   |
    /// | `WES_WORKFLOW_TYPE_VERSIONS` | `6.0`                   |
    ///
    /// Engine and object resolution settings are read by
    /// [`EngineConfig::from_env`] and [`DrsConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = split_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .map(|v| v.parse().expect("REQUEST_TIMEOUT_SECS must be a valid u64"))
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let supported_workflows = SupportedWorkflows {
            types: split_list(
                &std::env::var("WES_WORKFLOW_TYPES").unwrap_or_else(|_| "SMK".into()),
            ),
            versions: split_list(
                &std::env::var("WES_WORKFLOW_TYPE_VERSIONS").unwrap_or_else(|_| "6.0".into()),
            ),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            supported_workflows,
            engine: EngineConfig::from_env(),
            drs: DrsConfig::from_env(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
