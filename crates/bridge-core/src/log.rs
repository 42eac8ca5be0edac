//! The combined build log consumed by every extraction pass.

use crate::runner::StepOutput;

/// Immutable snapshot of configure + build output.
///
/// `text` is the configure block followed by the build block, each block
/// being stdout followed by stderr. Extractions scan `text`; the rendered
/// command log additionally carries a `$ <command>` header per step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLog {
    steps: Vec<StepOutput>,
    text: String,
}

impl BuildLog {
    /// Build the log from step outputs, in execution order.
    pub fn from_steps(steps: Vec<StepOutput>) -> Self {
        let mut text = String::new();
        for step in &steps {
            append_block(&mut text, &step.combined_output());
        }
        Self { steps, text }
    }

    /// Wrap previously captured log text (no step metadata).
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            steps: Vec::new(),
            text: text.into(),
        }
    }

    /// Split into lines; `\n` and `\r\n` terminators are both accepted.
    pub fn lines(&self) -> Vec<&str> {
        self.text.lines().collect()
    }

    /// Whether the log holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Render the log the way it is shown to clients.
    ///
    /// Each step is `$ <command line>` followed by its output; steps are
    /// separated by one blank line. Logs without step metadata render as-is.
    pub fn render_command_log(&self) -> String {
        if self.steps.is_empty() {
            return self.text.clone();
        }
        self.steps
            .iter()
            .map(|step| format!("$ {}\n{}", step.command_line, step.combined_output()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Append `block` to `buf`, inserting a line break if the previous block
/// left a line unterminated so two blocks never share a line.
pub(crate) fn append_block(buf: &mut String, block: &str) {
    if !buf.is_empty() && !buf.ends_with('\n') && !block.is_empty() {
        buf.push('\n');
    }
    buf.push_str(block);
}
