//! Request and response wire types.

use serde::{Deserialize, Serialize};

/// A compile request: source text, unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    #[serde(default)]
    pub code: String,
}

impl CompileRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Successful compile response. Every field is always present; extraction
/// misses appear as sentinel strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResponse {
    /// Rendered configure + build output.
    pub command_log: String,

    /// Parse confirmation, run-target summary and semantic analysis segments.
    pub ast_semantic: String,

    /// Generated IR file contents.
    pub llvm_ir: String,

    /// Output of the compiled program.
    pub execution_result: String,

    /// Elapsed wall time, rendered as `"<n>ms"` on the wire.
    #[serde(rename = "compile_time", with = "millis_suffix")]
    pub compile_time_ms: u64,
}

/// Orchestration-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

impl ErrorEnvelope {
    pub fn from_error(err: &dyn std::fmt::Display) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Either a full response or an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompileOutcome {
    Success(CompileResponse),
    Failure(ErrorEnvelope),
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CompileOutcome::Success(_))
    }

    /// HTTP-style status the hosting layer should report.
    pub fn status_code(&self) -> u16 {
        match self {
            CompileOutcome::Success(_) => 200,
            CompileOutcome::Failure(_) => 500,
        }
    }
}

mod millis_suffix {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ms: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{ms}ms"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.strip_suffix("ms")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| de::Error::custom(format!("expected \"<n>ms\", got {raw:?}")))
    }
}
