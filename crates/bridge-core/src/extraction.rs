//! Tagged extraction results and their wire sentinels.

use serde::{Deserialize, Serialize};

/// Sentinel for a log in which none of the trace segments were found.
pub const TRACE_SENTINEL: &str = "❌ AST & Semantic block not found.";

/// Sentinel for a missing or unreadable IR file.
pub const IR_SENTINEL: &str = "❌ LLVM IR not generated.";

/// Sentinel for a log without an IR generation header.
pub const EXECUTION_SENTINEL: &str = "❌ Could not extract final output.";

/// Outcome of a single extraction pass.
///
/// `Found` may carry an empty string: a matched-but-empty result is distinct
/// from `NotFound`, which only becomes a sentinel at the wire boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "text")]
pub enum Extraction {
    Found(String),
    NotFound,
}

impl Extraction {
    /// Returns `true` when the extraction matched.
    pub fn is_found(&self) -> bool {
        matches!(self, Extraction::Found(_))
    }

    /// Render for the external response, substituting `sentinel` when nothing matched.
    pub fn into_wire(self, sentinel: &str) -> String {
        match self {
            Extraction::Found(text) => text,
            Extraction::NotFound => sentinel.to_string(),
        }
    }
}
