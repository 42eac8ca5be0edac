//! Top-level compile request handling.
//!
//! [`CompileService::handle`] is the single place where hard-tier errors are
//! caught and turned into an [`ErrorEnvelope`]. No partial result is returned
//! alongside an error.

use std::sync::Arc;

use tracing::{warn, Instrument};
use uuid::Uuid;

use crate::artifact::read_artifact;
use crate::assemble::Extractions;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::extraction::Extraction;
use crate::log::BuildLog;
use crate::metrics::METRICS;
use crate::obs;
use crate::orchestrator::{BuildOrchestrator, BuildState, Lifecycle};
use crate::response::{CompileOutcome, CompileRequest, CompileResponse, ErrorEnvelope};
use crate::runner::{CancelToken, StepRunner};
use crate::workspace::BuildWorkspace;

/// Outcome of one request plus what happened on the way.
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub outcome: CompileOutcome,
    pub lifecycle: Lifecycle,

    /// `None` when the workspace could not be created.
    pub workspace_id: Option<Uuid>,
}

/// Handles compile requests end to end.
#[derive(Clone)]
pub struct CompileService {
    orchestrator: BuildOrchestrator,
}

impl CompileService {
    /// Service backed by real child processes.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            orchestrator: BuildOrchestrator::with_process_runner(Arc::new(config)),
        })
    }

    /// Service backed by a custom step runner.
    pub fn with_runner(config: BridgeConfig, runner: Arc<dyn StepRunner>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            orchestrator: BuildOrchestrator::new(Arc::new(config), runner),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        self.orchestrator.config()
    }

    /// Handle one request, returning only the wire outcome.
    pub async fn handle(&self, request: &CompileRequest, cancel: &CancelToken) -> CompileOutcome {
        self.execute(request, cancel).await.outcome
    }

    /// Handle one request and report its lifecycle.
    pub async fn execute(&self, request: &CompileRequest, cancel: &CancelToken) -> CompileReport {
        METRICS.inc_builds_started();
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(BuildState::WritingSource);

        let (result, workspace_id) = match self.orchestrator.prepare().await {
            Ok(workspace) => {
                let id = workspace.id();
                let result = self
                    .compile_in(&workspace, request, cancel, &mut lifecycle)
                    .instrument(obs::build_span(id))
                    .await;
                workspace.cleanup().await;
                (result, Some(id))
            }
            Err(e) => (Err(e), None),
        };

        let outcome = match result {
            Ok(response) => CompileOutcome::Success(response),
            Err(e) => {
                lifecycle.advance(BuildState::Failed);
                METRICS.inc_builds_failed();
                obs::emit_build_failed(&e);
                CompileOutcome::Failure(ErrorEnvelope::from_error(&e))
            }
        };

        CompileReport {
            outcome,
            lifecycle,
            workspace_id,
        }
    }

    async fn compile_in(
        &self,
        workspace: &BuildWorkspace,
        request: &CompileRequest,
        cancel: &CancelToken,
        lifecycle: &mut Lifecycle,
    ) -> Result<CompileResponse> {
        let run = self
            .orchestrator
            .build(workspace, request, cancel, lifecycle)
            .await?;

        lifecycle.advance(BuildState::Extracting);
        let ir = read_artifact(&workspace.path(&self.config().ir_file)).await;
        let extractions = Extractions::from_log(&run.log, ir);
        warn_on_total_miss(&run.log, &extractions);

        lifecycle.advance(BuildState::Assembling);
        let sentinels = extractions.sentinel_count();
        METRICS.add_sentinels(sentinels as u64);
        let response = CompileResponse::assemble(&run.log, extractions, run.elapsed_ms);

        lifecycle.advance(BuildState::Done);
        obs::emit_build_finished(workspace.id(), run.elapsed_ms, sentinels);
        Ok(response)
    }
}

/// Assemble a response from a saved build log without running anything.
///
/// `ir` is the IR file read with [`read_artifact`]. Timing is reported as zero.
pub fn assemble_offline(log_text: &str, ir: Extraction) -> CompileResponse {
    let log = BuildLog::from_text(log_text);
    let extractions = Extractions::from_log(&log, ir);
    warn_on_total_miss(&log, &extractions);
    CompileResponse::assemble(&log, extractions, 0)
}

// Marker phrases are hard-coded to the toolchain's wording; a non-empty log
// where nothing matches usually means that wording changed.
fn warn_on_total_miss(log: &BuildLog, extractions: &Extractions) {
    if extractions.all_missed() && !log.is_blank() {
        warn!(
            lines = log.lines().len(),
            "no extraction matched a non-empty build log; toolchain marker phrases may have changed"
        );
    }
}
