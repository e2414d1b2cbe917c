/// Default per-request timeout for metadata lookups. Must stay below the
/// HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Object resolution settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DrsConfig {
    /// Path prefix of the metadata API on the referenced host.
    pub api_prefix: String,
    /// Per-request timeout for metadata lookups, in seconds.
    pub request_timeout_secs: u64,
}

impl DrsConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default        |
    /// |----------------------------|----------------|
    /// | `DRS_API_PREFIX`           | `ga4gh/drs/v1` |
    /// | `DRS_REQUEST_TIMEOUT_SECS` | `10`           |
    pub fn from_env() -> Self {
        let api_prefix =
            std::env::var("DRS_API_PREFIX").unwrap_or_else(|_| "ga4gh/drs/v1".into());

        let request_timeout_secs: u64 = std::env::var("DRS_REQUEST_TIMEOUT_SECS")
            .map(|v| v.parse().expect("DRS_REQUEST_TIMEOUT_SECS must be a valid u64"))
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Self {
            api_prefix,
            request_timeout_secs,
        }
    }
}
