//! Structured lifecycle events for compile requests.
//!
//! Every event carries the workspace id so that log lines from concurrent
//! builds can be told apart.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::runner::StepOutput;

/// Span tagged with the build's workspace id.
///
/// Attach it with `tracing::Instrument` rather than entering it: builds
/// await child processes, and an entered guard must not cross an `.await`.
pub fn build_span(workspace_id: Uuid) -> tracing::Span {
    tracing::info_span!("bridge.build", workspace_id = %workspace_id)
}

/// Emit event: build accepted and workspace prepared.
pub fn emit_build_started(
    workspace_id: Uuid,
    created_at: DateTime<Utc>,
    source_digest: &str,
    source_len: usize,
) {
    info!(
        event = "build.started",
        workspace_id = %workspace_id,
        created_at = %created_at.to_rfc3339(),
        source_digest = %source_digest,
        source_len = source_len,
    );
}

/// Emit event: one toolchain step finished (any exit status).
pub fn emit_step_finished(workspace_id: Uuid, output: &StepOutput) {
    info!(
        event = "build.step_finished",
        workspace_id = %workspace_id,
        step = %output.step,
        exit_code = ?output.exit_code,
        succeeded = output.succeeded(),
        duration_ms = output.duration_ms,
    );
}

/// Emit event: response assembled.
pub fn emit_build_finished(workspace_id: Uuid, elapsed_ms: u64, sentinels: usize) {
    info!(
        event = "build.finished",
        workspace_id = %workspace_id,
        elapsed_ms = elapsed_ms,
        sentinels = sentinels,
    );
}

/// Emit event: hard failure, no response payload produced (warning level).
pub fn emit_build_failed(error: &dyn std::fmt::Display) {
    warn!(event = "build.failed", error = %error);
}
