use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One invocation of an external program.
///
/// Arguments are passed as a vector and never through a shell, so file names
/// with spaces or quotes cannot change the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>, working_dir: &Path, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.to_path_buf(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        let rendered = path.to_string_lossy().into_owned();
        self.arg(rendered)
    }

    /// Render for logs.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Seam between the converters and the host's external binaries.
///
/// The native implementation spawns real processes; tests substitute a
/// recording runner to assert what would have been launched.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Human-readable runner name for logs (e.g. `"native"`).
    fn name(&self) -> &str;

    /// Run `spec` to completion or until its timeout elapses.
    ///
    /// Returns `Err` only when the process could not be started or timed out;
    /// a non-zero exit is reported through [`ProcessOutput::success`].
    async fn run(&self, spec: &ProcessSpec) -> anyhow::Result<ProcessOutput>;
}
