//! Result assembly from one build log snapshot.

use crate::execution::extract_execution_result;
use crate::extraction::{Extraction, EXECUTION_SENTINEL, IR_SENTINEL, TRACE_SENTINEL};
use crate::log::BuildLog;
use crate::response::CompileResponse;
use crate::segment::{extract_trace, Trace};

/// Every extraction over one log, kept typed until rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extractions {
    pub trace: Trace,
    pub execution: Extraction,
    pub ir: Extraction,
}

impl Extractions {
    /// Run the log-based extractions over `log`; `ir` is read separately.
    pub fn from_log(log: &BuildLog, ir: Extraction) -> Self {
        let lines = log.lines();
        Self {
            trace: extract_trace(&lines),
            execution: extract_execution_result(&lines),
            ir,
        }
    }

    /// Number of extractions that will render as sentinels.
    pub fn sentinel_count(&self) -> usize {
        [&self.trace.text, &self.execution, &self.ir]
            .into_iter()
            .filter(|e| !e.is_found())
            .count()
    }

    /// Whether no extraction matched at all.
    pub fn all_missed(&self) -> bool {
        self.sentinel_count() == 3
    }
}

impl CompileResponse {
    /// Combine a log, its extractions and timing into a response.
    pub fn assemble(log: &BuildLog, extractions: Extractions, compile_time_ms: u64) -> Self {
        Self {
            command_log: log.render_command_log(),
            ast_semantic: extractions.trace.text.into_wire(TRACE_SENTINEL),
            llvm_ir: extractions.ir.into_wire(IR_SENTINEL),
            execution_result: extractions.execution.into_wire(EXECUTION_SENTINEL),
            compile_time_ms,
        }
    }
}
