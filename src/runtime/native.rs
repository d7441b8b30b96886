use super::traits::{CommandRunner, ProcessOutput, ProcessSpec};
use anyhow::Context;
use async_trait::async_trait;
use std::process::Stdio;

/// Native runner: spawns the program directly on the host.
pub struct NativeRunner;

impl NativeRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NativeRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for NativeRunner {
    fn name(&self) -> &str {
        "native"
    }

    async fn run(&self, spec: &ProcessSpec) -> anyhow::Result<ProcessOutput> {
        let mut command = tokio::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(command = %spec.display(), "Spawning conversion process");
        let child = command
            .spawn()
            .with_context(|| format!("Failed to start {}", spec.program))?;

        let output = tokio::time::timeout(spec.timeout, child.wait_with_output())
            .await
            .with_context(|| {
                format!("{} timed out after {}s", spec.program, spec.timeout.as_secs())
            })?
            .with_context(|| format!("Failed to wait for {}", spec.program))?;

        Ok(ProcessOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
