//! Bridge configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::runner::{BuildStep, Deadline, StepInvocation};

/// Placeholder replaced with the absolute toolchain project directory.
pub const PROJECT_DIR_PLACEHOLDER: &str = "{project_dir}";

/// Placeholder replaced with the absolute per-request build directory.
pub const BUILD_DIR_PLACEHOLDER: &str = "{build_dir}";

/// Placeholder replaced with the absolute path of the written source file.
pub const SOURCE_PLACEHOLDER: &str = "{source}";

/// Configuration for the compile bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Toolchain project root handed to the configure step.
    pub project_dir: PathBuf,

    /// Parent directory of per-request build workspaces.
    pub workspace_root: PathBuf,

    /// Source file name inside a build workspace.
    pub source_file: String,

    /// IR file name the toolchain writes inside a build workspace.
    pub ir_file: String,

    /// Configure step command (first element is the executable).
    pub configure_command: Vec<String>,

    /// Build step command (first element is the executable).
    pub build_command: Vec<String>,

    /// Deadline for both steps together, in seconds. 0 disables it.
    pub timeout_secs: u64,

    /// Leave build workspaces on disk after the response is assembled.
    pub keep_workspaces: bool,

    /// Maximum builds in flight in serve mode.
    pub max_concurrent: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            workspace_root: PathBuf::from("build"),
            source_file: "test.prog".to_string(),
            ir_file: "output.ll".to_string(),
            configure_command: vec!["cmake".to_string(), PROJECT_DIR_PLACEHOLDER.to_string()],
            build_command: vec!["cmake".to_string(), "--build".to_string(), ".".to_string()],
            timeout_secs: 120,
            keep_workspaces: false,
            max_concurrent: 4,
        }
    }
}

impl BridgeConfig {
    /// Load a JSON config file; missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a build.
    pub fn validate(&self) -> Result<()> {
        if self.configure_command.is_empty() {
            return Err(BridgeError::InvalidConfig(
                "configure_command must not be empty".to_string(),
            ));
        }
        if self.build_command.is_empty() {
            return Err(BridgeError::InvalidConfig(
                "build_command must not be empty".to_string(),
            ));
        }
        for (field, name) in [("source_file", &self.source_file), ("ir_file", &self.ir_file)] {
            if name.trim().is_empty() {
                return Err(BridgeError::InvalidConfig(format!("{field} must not be empty")));
            }
            if Path::new(name).components().count() != 1 {
                return Err(BridgeError::InvalidConfig(format!(
                    "{field} must be a plain file name, got {name:?}"
                )));
            }
        }
        if self.max_concurrent == 0 {
            return Err(BridgeError::InvalidConfig(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Deadline for one build, or `None` when disabled.
    pub fn deadline(&self) -> Option<Deadline> {
        (self.timeout_secs > 0).then(|| Deadline::after(Duration::from_secs(self.timeout_secs)))
    }

    /// Resolve the command for `step` to run inside `build_dir`.
    pub fn invocation(&self, step: BuildStep, build_dir: &Path) -> Result<StepInvocation> {
        let template = match step {
            BuildStep::Configure => &self.configure_command,
            BuildStep::Build => &self.build_command,
        };
        let project_dir = std::path::absolute(&self.project_dir)?;
        let source = build_dir.join(&self.source_file);

        let argv = template
            .iter()
            .map(|arg| {
                arg.replace(PROJECT_DIR_PLACEHOLDER, &project_dir.to_string_lossy())
                    .replace(BUILD_DIR_PLACEHOLDER, &build_dir.to_string_lossy())
                    .replace(SOURCE_PLACEHOLDER, &source.to_string_lossy())
            })
            .collect();

        Ok(StepInvocation {
            step,
            argv,
            cwd: build_dir.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = BridgeConfig::default();
        assert_eq!(config.source_file, "test.prog");
        assert_eq!(config.ir_file, "output.ll");
        assert_eq!(config.configure_command, vec!["cmake", "{project_dir}"]);
        assert_eq!(config.build_command, vec!["cmake", "--build", "."]);
        assert_eq!(config.timeout_secs, 120);
        assert!(!config.keep_workspaces);
        config.validate().expect("default config is valid");
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"timeout_secs": 5, "keep_workspaces": true}"#).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert!(config.keep_workspaces);
        assert_eq!(config.source_file, "test.prog");
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let config = BridgeConfig {
            build_command: Vec::new(),
            ..BridgeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BridgeError::InvalidConfig(msg)) if msg.contains("build_command")
        ));
    }

    #[test]
    fn test_validate_rejects_nested_file_name() {
        let config = BridgeConfig {
            ir_file: "../output.ll".to_string(),
            ..BridgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = BridgeConfig {
            max_concurrent: 0,
            ..BridgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deadline_disabled_at_zero() {
        let config = BridgeConfig {
            timeout_secs: 0,
            ..BridgeConfig::default()
        };
        assert!(config.deadline().is_none());
        assert_eq!(
            BridgeConfig::default().deadline().map(|d| d.limit_ms()),
            Some(120_000)
        );
    }

    #[test]
    fn test_invocation_substitutes_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            project_dir: dir.path().to_path_buf(),
            configure_command: vec![
                "tool".to_string(),
                "{project_dir}".to_string(),
                "--in={source}".to_string(),
                "--out={build_dir}".to_string(),
            ],
            ..BridgeConfig::default()
        };
        let build_dir = dir.path().join("ws");
        let inv = config.invocation(BuildStep::Configure, &build_dir).unwrap();

        assert_eq!(inv.step, BuildStep::Configure);
        assert_eq!(inv.cwd, build_dir);
        assert_eq!(inv.argv[1], dir.path().to_string_lossy());
        assert_eq!(
            inv.argv[2],
            format!("--in={}", build_dir.join("test.prog").display())
        );
        assert_eq!(inv.argv[3], format!("--out={}", build_dir.display()));
    }

    #[test]
    fn test_invocation_build_step_unchanged() {
        let config = BridgeConfig::default();
        let inv = config
            .invocation(BuildStep::Build, Path::new("/tmp/ws"))
            .unwrap();
        assert_eq!(inv.command_line(), "cmake --build .");
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, r#"{"ir_file": "prog.ll"}"#).unwrap();
        let config = BridgeConfig::from_json_file(&path).unwrap();
        assert_eq!(config.ir_file, "prog.ll");

        std::fs::write(&path, r#"{"configure_command": []}"#).unwrap();
        assert!(BridgeConfig::from_json_file(&path).is_err());
    }
}
