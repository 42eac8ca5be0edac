//! Program output extraction.
//!
//! The compiled program runs as part of the build, so its stdout lands in the
//! build log after the IR has been written. The extractor peels the log
//! twice: first down to the IR generation header, then past the
//! "IR written" line; what remains is the program's output.

use crate::extraction::Extraction;
use crate::markers;
use crate::segment::LogScanner;

/// Extract the program's output from the build log lines.
///
/// * No IR generation header: [`Extraction::NotFound`].
/// * Header present but no "IR written" line after it: `Found("")`.
/// * Otherwise every line after the "IR written" line, joined and trimmed.
///   Only the first "IR written" line is consumed; later repeats of it are
///   program output and are kept.
pub fn extract_execution_result(lines: &[&str]) -> Extraction {
    let scanner = LogScanner::new(lines);
    let Some(header) = scanner.find_from(0, markers::GENERATING_LLVM_IR) else {
        return Extraction::NotFound;
    };

    let output = match scanner.find_from(header, markers::LLVM_IR_WRITTEN) {
        Some(written) => lines[written + 1..].join("\n"),
        None => String::new(),
    };

    Extraction::Found(output.trim().to_string())
}
