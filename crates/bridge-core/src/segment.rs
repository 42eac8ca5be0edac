//! Marker-driven segmentation of the build log into the semantic trace.
//!
//! Three independent rules each locate one contiguous run of lines. The trace
//! is always emitted in rule order (parse confirmation, run-target summary,
//! semantic analysis) regardless of where the segments sit in the log, so
//! overlapping segments repeat their shared lines.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extraction::Extraction;
use crate::markers;

/// One named segment rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SegmentRule {
    /// "Parsed successfully" line plus the one line after it.
    ParseConfirmation,

    /// "[100%] Built target run" line through the end of the log.
    RunTargetSummary,

    /// "Semantic analysis completed successfully" through the first
    /// "Generating LLVM IR" at or after it.
    SemanticAnalysis,
}

impl SegmentRule {
    /// All rules, in trace output order.
    pub const ALL: [SegmentRule; 3] = [
        SegmentRule::ParseConfirmation,
        SegmentRule::RunTargetSummary,
        SegmentRule::SemanticAnalysis,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SegmentRule::ParseConfirmation => "parse_confirmation",
            SegmentRule::RunTargetSummary => "run_target_summary",
            SegmentRule::SemanticAnalysis => "semantic_analysis",
        }
    }
}

/// Inclusive line bounds of a located segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentBounds {
    pub rule: SegmentRule,
    pub start: usize,
    pub end: usize,
}

/// Read-only scanner over a log's lines.
#[derive(Debug, Clone, Copy)]
pub struct LogScanner<'a> {
    lines: &'a [&'a str],
}

impl<'a> LogScanner<'a> {
    pub fn new(lines: &'a [&'a str]) -> Self {
        Self { lines }
    }

    /// Index of the first line at or after `from` containing `marker`.
    pub fn find_from(&self, from: usize, marker: &str) -> Option<usize> {
        self.lines
            .iter()
            .skip(from)
            .position(|line| line.contains(marker))
            .map(|offset| from + offset)
    }

    /// Apply one rule. `None` means the rule's markers were not all found.
    pub fn locate(&self, rule: SegmentRule) -> Option<SegmentBounds> {
        let last = self.lines.len().checked_sub(1)?;
        let (start, end) = match rule {
            SegmentRule::ParseConfirmation => {
                let start = self.find_from(0, markers::PARSED_SUCCESSFULLY)?;
                (start, (start + 1).min(last))
            }
            SegmentRule::RunTargetSummary => {
                let start = self.find_from(0, markers::BUILT_TARGET_RUN)?;
                (start, last)
            }
            SegmentRule::SemanticAnalysis => {
                let start = self.find_from(0, markers::SEMANTIC_ANALYSIS_COMPLETED)?;
                let end = self.find_from(start, markers::GENERATING_LLVM_IR)?;
                (start, end)
            }
        };
        Some(SegmentBounds { rule, start, end })
    }

    /// Lines covered by `bounds`.
    pub fn slice(&self, bounds: &SegmentBounds) -> &'a [&'a str] {
        &self.lines[bounds.start..=bounds.end]
    }
}

/// Segments located in one log plus the assembled trace text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub segments: Vec<SegmentBounds>,
    pub text: Extraction,
}

/// Locate every segment and join them in rule order.
///
/// Yields [`Extraction::NotFound`] only when no rule matched.
pub fn extract_trace(lines: &[&str]) -> Trace {
    let scanner = LogScanner::new(lines);
    let segments: Vec<SegmentBounds> = SegmentRule::ALL
        .iter()
        .filter_map(|rule| scanner.locate(*rule))
        .collect();

    for bounds in &segments {
        debug!(
            segment = bounds.rule.name(),
            start = bounds.start,
            end = bounds.end,
            "trace segment located"
        );
    }

    if segments.is_empty() {
        return Trace {
            segments,
            text: Extraction::NotFound,
        };
    }

    let text = segments
        .iter()
        .flat_map(|bounds| scanner.slice(bounds).iter().copied())
        .collect::<Vec<_>>()
        .join("\n");

    Trace {
        segments,
        text: Extraction::Found(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds_for(lines: &[&str], rule: SegmentRule) -> Option<(usize, usize)> {
        LogScanner::new(lines).locate(rule).map(|b| (b.start, b.end))
    }

    #[test]
    fn test_parse_confirmation_takes_two_lines() {
        let lines = ["noise", "Parsed successfully!", "OK", "more"];
        assert_eq!(
            bounds_for(&lines, SegmentRule::ParseConfirmation),
            Some((1, 2))
        );
    }

    #[test]
    fn test_parse_confirmation_on_last_line() {
        let lines = ["noise", "Parsed successfully!"];
        assert_eq!(
            bounds_for(&lines, SegmentRule::ParseConfirmation),
            Some((1, 1))
        );
    }

    #[test]
    fn test_run_target_summary_runs_to_end() {
        let lines = ["a", "[100%] Built target run", "b", "c"];
        assert_eq!(
            bounds_for(&lines, SegmentRule::RunTargetSummary),
            Some((1, 3))
        );
    }

    #[test]
    fn test_semantic_analysis_requires_ir_marker_after_start() {
        let lines = [
            "Generating LLVM IR...",
            "Semantic analysis completed successfully.",
            "tree",
        ];
        assert_eq!(bounds_for(&lines, SegmentRule::SemanticAnalysis), None);
    }

    #[test]
    fn test_semantic_analysis_same_line_markers() {
        let lines = ["Semantic analysis completed successfully. Generating LLVM IR"];
        assert_eq!(
            bounds_for(&lines, SegmentRule::SemanticAnalysis),
            Some((0, 0))
        );
    }

    #[test]
    fn test_semantic_analysis_uses_first_matches() {
        let lines = [
            "Generating LLVM IR (stale)",
            "Semantic analysis completed successfully.",
            "Program",
            "Generating LLVM IR...",
            "Semantic analysis completed successfully.",
            "Generating LLVM IR...",
        ];
        assert_eq!(
            bounds_for(&lines, SegmentRule::SemanticAnalysis),
            Some((1, 3))
        );
    }

    #[test]
    fn test_empty_log_matches_nothing() {
        let lines: [&str; 0] = [];
        for rule in SegmentRule::ALL {
            assert_eq!(bounds_for(&lines, rule), None);
        }
        assert_eq!(extract_trace(&lines).text, Extraction::NotFound);
    }

    #[test]
    fn test_trace_without_markers_is_not_found() {
        let lines = ["-- Configuring done", "[ 50%] Building CXX object"];
        let trace = extract_trace(&lines);
        assert!(trace.segments.is_empty());
        assert_eq!(trace.text, Extraction::NotFound);
    }

    #[test]
    fn test_trace_order_is_fixed() {
        // Run-target summary physically precedes the others but is emitted second.
        let lines = [
            "[100%] Built target run",
            "Semantic analysis completed successfully.",
            "Generating LLVM IR...",
            "Parsed successfully!",
            "  OK  ",
        ];
        let trace = extract_trace(&lines);
        let expected = [
            "Parsed successfully!",
            "  OK  ",
            "[100%] Built target run",
            "Semantic analysis completed successfully.",
            "Generating LLVM IR...",
            "Parsed successfully!",
            "  OK  ",
            "Semantic analysis completed successfully.",
            "Generating LLVM IR...",
        ]
        .join("\n");
        assert_eq!(trace.text, Extraction::Found(expected));
        let rules: Vec<_> = trace.segments.iter().map(|b| b.rule).collect();
        assert_eq!(rules, SegmentRule::ALL.to_vec());
    }

    #[test]
    fn test_missing_segment_does_not_affect_others() {
        let lines = ["Parsed successfully!", "OK", "Generating LLVM IR..."];
        let trace = extract_trace(&lines);
        assert_eq!(trace.segments.len(), 1);
        assert_eq!(trace.text, Extraction::Found("Parsed successfully!\nOK".into()));
    }
}
