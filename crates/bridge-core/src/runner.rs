//! External step execution with deadline and cancellation.
//!
//! The toolchain is invoked as two steps (configure, build). Each step's
//! exit status is recorded but never turned into an error; only a failure to
//! launch, a missed deadline or a cancellation aborts the request.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};
use crate::log::append_block;

/// The two toolchain invocations, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildStep {
    /// Generate the build system (`cmake <project>`).
    Configure,

    /// Run the build (`cmake --build .`).
    Build,
}

impl BuildStep {
    pub fn name(&self) -> &'static str {
        match self {
            BuildStep::Configure => "configure",
            BuildStep::Build => "build",
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully resolved step ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInvocation {
    pub step: BuildStep,

    /// Program followed by its arguments, placeholders already substituted.
    pub argv: Vec<String>,

    /// Working directory (the request's build workspace).
    pub cwd: PathBuf,
}

impl StepInvocation {
    /// Command line as shown in the command log.
    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

/// Captured result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutput {
    pub step: BuildStep,

    /// Command line as shown in the command log.
    pub command_line: String,

    /// Exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl StepOutput {
    /// Whether the step exited with status 0.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout followed by stderr.
    pub fn combined_output(&self) -> String {
        let mut combined = self.stdout.clone();
        append_block(&mut combined, &self.stderr);
        combined
    }
}

/// Absolute point in time by which the whole build must finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: tokio::time::Instant,
    limit: Duration,
}

impl Deadline {
    /// Deadline `limit` from now.
    pub fn after(limit: Duration) -> Self {
        Self {
            at: tokio::time::Instant::now() + limit,
            limit,
        }
    }

    /// The configured limit in milliseconds, for error reporting.
    pub fn limit_ms(&self) -> u64 {
        self.limit.as_millis() as u64
    }

    pub fn at(&self) -> tokio::time::Instant {
        self.at
    }
}

/// Cloneable cancellation signal shared between a request and its host.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Fire the signal. Every clone observes it.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the token has been cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                // Sender is held by every clone, so this only happens on teardown.
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Backend that executes a toolchain step.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run `invocation` to completion, or fail on deadline/cancellation.
    async fn run(
        &self,
        invocation: &StepInvocation,
        deadline: Option<Deadline>,
        cancel: &CancelToken,
    ) -> Result<StepOutput>;
}

/// Runs steps as child processes.
///
/// On unix each child leads its own process group so that a timeout or
/// cancellation can kill the whole tree (cmake spawns make, the compiler and
/// the compiled program).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl StepRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: &StepInvocation,
        deadline: Option<Deadline>,
        cancel: &CancelToken,
    ) -> Result<StepOutput> {
        let step = invocation.step;
        let (exe, args) = invocation
            .argv
            .split_first()
            .ok_or(BridgeError::EmptyCommand { step })?;

        if cancel.is_cancelled() {
            return Err(BridgeError::Cancelled { step });
        }

        let start = Instant::now();

        let mut command = Command::new(exe);
        command
            .args(args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| BridgeError::Launch {
            step,
            program: exe.clone(),
            source,
        })?;
        let pid = child.id();
        debug!(step = %step, pid = ?pid, command = %invocation.command_line(), "step launched");

        let wait = child.wait_with_output();
        tokio::pin!(wait);

        let expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline.at()).await,
                None => std::future::pending::<()>().await,
            }
        };

        let output = tokio::select! {
            output = &mut wait => output?,
            _ = expired => {
                terminate_process_group(pid);
                let limit_ms = deadline.map(|d| d.limit_ms()).unwrap_or_default();
                warn!(step = %step, limit_ms, "step exceeded deadline, process group killed");
                return Err(BridgeError::Timeout { step, limit_ms });
            }
            _ = cancel.cancelled() => {
                terminate_process_group(pid);
                warn!(step = %step, "step cancelled, process group killed");
                return Err(BridgeError::Cancelled { step });
            }
        };

        Ok(StepOutput {
            step,
            command_line: invocation.command_line(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(unix)]
fn terminate_process_group(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    // SAFETY: killpg only sends a signal; the group id is the pid of a child
    // we spawned with process_group(0), so it names that child's group.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        debug!(pid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

// Without process groups only the direct child is killed, via kill_on_drop.
#[cfg(not(unix))]
fn terminate_process_group(_pid: Option<u32>) {}
