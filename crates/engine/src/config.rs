use std::path::PathBuf;

/// Workflow engine and backend settings loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base directory under which each run gets its working directory.
    pub work_dir: PathBuf,
    /// Engine program and any leading arguments.
    pub command: Vec<String>,
    /// Parameters appended to every engine invocation.
    pub default_parameters: Vec<String>,
    /// Jobs allowed to execute at once; further jobs stay pending.
    pub max_concurrent_jobs: usize,
    /// Seconds a finished job stays queryable on the backend.
    pub job_retention_secs: u64,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default     |
    /// |-----------------------------|-------------|
    /// | `WES_WORK_DIR`              | `./runs`    |
    /// | `WES_ENGINE_COMMAND`        | `snakemake` |
    /// | `WES_ENGINE_DEFAULT_PARAMS` | `--cores 1` |
    /// | `WES_MAX_CONCURRENT_JOBS`   | `4`         |
    /// | `WES_JOB_RETENTION_SECS`    | `86400`     |
    pub fn from_env() -> Self {
        let work_dir = PathBuf::from(
            std::env::var("WES_WORK_DIR").unwrap_or_else(|_| "./runs".into()),
        );

        let command = split_words(
            &std::env::var("WES_ENGINE_COMMAND").unwrap_or_else(|_| "snakemake".into()),
        );
        assert!(!command.is_empty(), "WES_ENGINE_COMMAND must not be empty");

        let default_parameters = split_words(
            &std::env::var("WES_ENGINE_DEFAULT_PARAMS").unwrap_or_else(|_| "--cores 1".into()),
        );

        let max_concurrent_jobs: usize = std::env::var("WES_MAX_CONCURRENT_JOBS")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("WES_MAX_CONCURRENT_JOBS must be a valid usize");

        let job_retention_secs: u64 = std::env::var("WES_JOB_RETENTION_SECS")
            .unwrap_or_else(|_| "86400".into())
            .parse()
            .expect("WES_JOB_RETENTION_SECS must be a valid u64");

        Self {
            work_dir,
            command,
            default_parameters,
            max_concurrent_jobs: max_concurrent_jobs.max(1),
            job_retention_secs,
        }
    }
}

fn split_words(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}
