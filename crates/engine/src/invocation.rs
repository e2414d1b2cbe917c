//! The invocation descriptor handed to a job backend.

use std::path::{Path, PathBuf};

/// Name of the serialized parameter file inside a run's working directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Captured engine standard output, relative to the working directory.
pub const STDOUT_FILE_NAME: &str = "stdout.log";

/// Captured engine standard error, relative to the working directory.
pub const STDERR_FILE_NAME: &str = "stderr.log";

/// Everything the engine needs to execute one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub workflow_url: String,
    pub workdir: PathBuf,
    pub config_file_paths: Vec<PathBuf>,
    pub engine_default_parameters: Vec<String>,
}

impl Invocation {
    /// Workflow location as the engine expects it: `file:` prefixes are
    /// stripped, anything else is passed through.
    pub fn workflow_path(&self) -> &str {
        let url = self.workflow_url.as_str();
        url.strip_prefix("file://")
            .or_else(|| url.strip_prefix("file:"))
            .unwrap_or(url)
    }

    /// Engine arguments, without the program itself.
    pub fn engine_args(&self) -> Vec<String> {
        let mut args = vec![
            "--snakefile".to_string(),
            self.workflow_path().to_string(),
            "--directory".to_string(),
            self.workdir.display().to_string(),
        ];
        if !self.config_file_paths.is_empty() {
            args.push("--configfile".to_string());
            args.extend(self.config_file_paths.iter().map(|p| p.display().to_string()));
        }
        args.extend(self.engine_default_parameters.iter().cloned());
        args
    }

    pub fn stdout_path(&self) -> PathBuf {
        self.workdir.join(STDOUT_FILE_NAME)
    }

    pub fn stderr_path(&self) -> PathBuf {
        self.workdir.join(STDERR_FILE_NAME)
    }

    /// Shell-like rendering of `program` followed by the engine arguments.
    pub fn render(&self, program: &[String]) -> String {
        program
            .iter()
            .cloned()
            .chain(self.engine_args())
            .map(|arg| quote(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(arg: &str) -> String {
    if !arg.is_empty() && !arg.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Working directory of a run under the configured base directory.
pub fn workdir_for(base: &Path, run_id: &str) -> PathBuf {
    base.join(run_id)
}
