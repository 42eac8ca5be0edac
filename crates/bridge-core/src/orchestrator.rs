//! Build orchestration: write source, configure, build.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::log::BuildLog;
use crate::obs;
use crate::response::CompileRequest;
use crate::runner::{BuildStep, CancelToken, ProcessRunner, StepRunner};
use crate::workspace::{source_digest, BuildWorkspace};

/// States a compile request moves through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Idle,
    WritingSource,
    Configuring,
    Building,
    Extracting,
    Assembling,
    Done,
    Failed,
}

impl BuildState {
    /// Whether `next` is a legal successor of `self`.
    ///
    /// Only the three orchestration states may fail; extraction and assembly
    /// are infallible.
    pub fn can_advance_to(self, next: BuildState) -> bool {
        use BuildState::*;
        matches!(
            (self, next),
            (Idle, WritingSource)
                | (WritingSource, Configuring)
                | (Configuring, Building)
                | (Building, Extracting)
                | (Extracting, Assembling)
                | (Assembling, Done)
                | (WritingSource | Configuring | Building, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BuildState::Done | BuildState::Failed)
    }
}

/// Recorded state history of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    history: Vec<BuildState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            history: vec![BuildState::Idle],
        }
    }

    pub fn current(&self) -> BuildState {
        self.history
            .last()
            .copied()
            .unwrap_or(BuildState::Idle)
    }

    pub fn history(&self) -> &[BuildState] {
        &self.history
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub fn advance(&mut self, next: BuildState) {
        let current = self.current();
        if !current.can_advance_to(next) {
            warn!(from = ?current, to = ?next, "ignoring illegal build state transition");
            return;
        }
        debug!(from = ?current, to = ?next, "build state");
        self.history.push(next);
        if next.is_terminal() {
            debug!(history = ?self.history, "build lifecycle complete");
        }
    }
}

/// Output of a completed orchestration.
#[derive(Debug)]
pub struct BuildRun {
    pub log: BuildLog,

    /// Wall time from before the source write to after the build step.
    pub elapsed_ms: u64,
}

/// Drives the configure and build steps for one request at a time.
#[derive(Clone)]
pub struct BuildOrchestrator {
    config: Arc<BridgeConfig>,
    runner: Arc<dyn StepRunner>,
}

impl BuildOrchestrator {
    pub fn new(config: Arc<BridgeConfig>, runner: Arc<dyn StepRunner>) -> Self {
        Self { config, runner }
    }

    /// Orchestrator backed by real child processes.
    pub fn with_process_runner(config: Arc<BridgeConfig>) -> Self {
        Self::new(config, Arc::new(ProcessRunner))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Create the isolated workspace a request will build in.
    pub async fn prepare(&self) -> Result<BuildWorkspace> {
        BuildWorkspace::create(&self.config.workspace_root, self.config.keep_workspaces).await
    }

    /// Write the source into `workspace` and run both steps in it.
    ///
    /// Non-zero exit codes are folded into the log. Errors are only returned
    /// for source writes, launches, deadline expiry and cancellation.
    pub async fn build(
        &self,
        workspace: &BuildWorkspace,
        request: &CompileRequest,
        cancel: &CancelToken,
        lifecycle: &mut Lifecycle,
    ) -> Result<BuildRun> {
        obs::emit_build_started(
            workspace.id(),
            workspace.created_at(),
            &source_digest(&request.code),
            request.code.len(),
        );
        let deadline = self.config.deadline();
        let start = Instant::now();

        workspace
            .write_source(&self.config.source_file, &request.code)
            .await?;

        let mut steps = Vec::with_capacity(2);
        for (step, state) in [
            (BuildStep::Configure, BuildState::Configuring),
            (BuildStep::Build, BuildState::Building),
        ] {
            lifecycle.advance(state);
            let invocation = self.config.invocation(step, workspace.dir())?;
            let output = self.runner.run(&invocation, deadline, cancel).await?;
            obs::emit_step_finished(workspace.id(), &output);
            steps.push(output);
        }

        Ok(BuildRun {
            log: BuildLog::from_steps(steps),
            elapsed_ms: round_millis(start.elapsed()),
        })
    }
}

/// Milliseconds rounded to the nearest integer.
pub fn round_millis(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}
