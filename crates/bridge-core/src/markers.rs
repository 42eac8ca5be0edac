//! Marker phrases printed by the external toolchain.
//!
//! Extraction locates lines by plain substring match against these literals.
//! They mirror the compiler driver's console wording exactly; if the
//! toolchain rewords a message, the matching extraction silently falls back
//! to its sentinel. The service logs a warning when every extraction misses
//! on a non-empty log, which is the only diagnostic for that drift.

/// Printed by the parser driver after a successful parse.
pub const PARSED_SUCCESSFULLY: &str = "Parsed successfully";

/// Printed by the build tool once the `run` target is up to date.
pub const BUILT_TARGET_RUN: &str = "[100%] Built target run";

/// Printed after semantic analysis completes.
pub const SEMANTIC_ANALYSIS_COMPLETED: &str = "Semantic analysis completed successfully";

/// Printed when IR generation starts.
pub const GENERATING_LLVM_IR: &str = "Generating LLVM IR";

/// Printed once the IR file has been written; program output follows it.
pub const LLVM_IR_WRITTEN: &str = "LLVM IR written to output.ll";
