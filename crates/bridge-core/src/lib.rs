//! compile-bridge core library
//!
//! Runs an external compiler toolchain (configure + build) for submitted
//! source text and turns its unstructured console output into a structured
//! response:
//! - parse confirmation / semantic analysis trace ([`segment`])
//! - program output ([`execution`])
//! - generated IR ([`artifact`])
//! - rendered command log and timing ([`assemble`])
//!
//! Every request builds in its own workspace ([`workspace`]) under a
//! deadline with a cancellation path ([`runner`]).

pub mod artifact;
pub mod assemble;
pub mod config;
pub mod error;
pub mod execution;
pub mod extraction;
pub mod log;
pub mod markers;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod response;
pub mod runner;
pub mod segment;
pub mod service;
pub mod telemetry;
pub mod workspace;

pub use artifact::read_artifact;
pub use assemble::Extractions;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use execution::extract_execution_result;
pub use extraction::{Extraction, EXECUTION_SENTINEL, IR_SENTINEL, TRACE_SENTINEL};
pub use log::BuildLog;
pub use metrics::METRICS;
pub use orchestrator::{BuildOrchestrator, BuildRun, BuildState, Lifecycle};
pub use response::{CompileOutcome, CompileRequest, CompileResponse, ErrorEnvelope};
pub use runner::{
    BuildStep, CancelToken, Deadline, ProcessRunner, StepInvocation, StepOutput, StepRunner,
};
pub use segment::{extract_trace, LogScanner, SegmentBounds, SegmentRule, Trace};
pub use service::{assemble_offline, CompileReport, CompileService};
pub use telemetry::init_tracing;
pub use workspace::BuildWorkspace;

/// compile-bridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
