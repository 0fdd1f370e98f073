//! External engine invocation.
//!
//! The engine exits non-zero when it finds issues, so exit codes are
//! ignored and stdout is captured regardless. Each invocation carries a
//! unique key; starting a run while another with the same key is in flight
//! kills the older one, which resolves to a null sentinel instead of output.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Notify;

/// Wall-clock bound applied unless the configuration opts out.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A fully described engine invocation.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    pub executable: PathBuf,
    pub args: Vec<String>,
    /// Project root the engine runs in.
    pub cwd: PathBuf,
    /// Concurrent invocations sharing this key supersede each other.
    pub unique_key: String,
    /// `None` runs without a wall-clock bound.
    pub timeout: Option<Duration>,
}

impl EngineCommand {
    /// Stable identity of the command for notification dedup.
    pub fn signature(&self) -> String {
        format!(
            "{} {} @ {}",
            self.executable.display(),
            self.args.join(" "),
            self.cwd.display()
        )
    }
}

/// Why an engine run produced no output.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("engine binary not found: {0}")]
    NotFound(PathBuf),
    #[error("engine path is not an executable binary: {0}")]
    NotExecutable(PathBuf),
    #[error("engine run exceeded the {}s time limit", .0.as_secs())]
    Timeout(Duration),
    #[error("engine execution failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Collaborator seam for running the engine.
#[async_trait]
pub trait EngineRunner: Send + Sync {
    /// Run the engine and return its stdout. `Ok(None)` means a newer
    /// invocation with the same unique key superseded this one.
    async fn run(&self, command: &EngineCommand) -> Result<Option<String>, ExecError>;
}

/// Production runner on `tokio::process`.
#[derive(Debug, Default)]
pub struct ProcessEngineRunner {
    inflight: DashMap<String, Arc<Notify>>,
}

impl ProcessEngineRunner {
    pub fn new() -> Self {
        Self::default()
    }

    async fn spawn_and_wait(
        &self,
        command: &EngineCommand,
        cancel: &Notify,
    ) -> Result<Option<String>, ExecError> {
        let child = Command::new(&command.executable)
            .args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ExecError::NotFound(command.executable.clone()),
                std::io::ErrorKind::PermissionDenied => {
                    ExecError::NotExecutable(command.executable.clone())
                }
                _ => ExecError::Io(e),
            })?;

        let wait = child.wait_with_output();
        let bounded = async {
            match command.timeout {
                Some(limit) => match tokio::time::timeout(limit, wait).await {
                    Ok(result) => result.map_err(ExecError::Io),
                    Err(_) => Err(ExecError::Timeout(limit)),
                },
                None => wait.await.map_err(ExecError::Io),
            }
        };

        let output = tokio::select! {
            // Dropping the wait future kills the child (kill_on_drop).
            _ = cancel.notified() => {
                tracing::debug!(key = %command.unique_key, "run superseded by a newer invocation");
                return Ok(None);
            }
            output = bounded => output?,
        };

        if !output.status.success() {
            tracing::debug!(
                key = %command.unique_key,
                code = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "engine exited non-zero (exit code ignored)"
            );
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}

#[async_trait]
impl EngineRunner for ProcessEngineRunner {
    async fn run(&self, command: &EngineCommand) -> Result<Option<String>, ExecError> {
        let cancel = Arc::new(Notify::new());
        if let Some(previous) = self
            .inflight
            .insert(command.unique_key.clone(), cancel.clone())
        {
            previous.notify_one();
        }

        let result = self.spawn_and_wait(command, &cancel).await;

        // Only remove the slot if it is still ours; a newer run may have
        // replaced it already.
        self.inflight
            .remove_if(&command.unique_key, |_, slot| Arc::ptr_eq(slot, &cancel));
        result
    }
}
