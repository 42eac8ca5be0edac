//! Error taxonomy for build orchestration.
//!
//! Only infrastructure faults live here. A compiler that fails, a missing
//! marker or a missing IR file is never an error: those surface as
//! [`Extraction::NotFound`](crate::extraction::Extraction) inside a
//! successful response.

use std::path::PathBuf;

use crate::runner::BuildStep;

/// Hard-tier failures that abort a compile request.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to create build workspace {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write source file {path}: {source}")]
    WriteSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch {step} step ({program}): {source}")]
    Launch {
        step: BuildStep,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} step has an empty command")]
    EmptyCommand { step: BuildStep },

    #[error("{step} step timed out after {limit_ms}ms")]
    Timeout { step: BuildStep, limit_ms: u64 },

    #[error("{step} step was cancelled")]
    Cancelled { step: BuildStep },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
