//! End-to-end compile request tests with an in-process fake toolchain.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bridge_core::{
    BridgeConfig, BuildState, BuildStep, CancelToken, CompileOutcome, CompileRequest,
    CompileResponse, CompileService, Deadline, StepInvocation, StepOutput, StepRunner,
    EXECUTION_SENTINEL, IR_SENTINEL, TRACE_SENTINEL,
};

/// Toolchain stand-in: echoes the source as build output and optionally
/// writes an IR file, the way the real compiler driver does.
struct FakeToolchain {
    build_exit_code: i32,
    write_ir: bool,
}

#[async_trait]
impl StepRunner for FakeToolchain {
    async fn run(
        &self,
        invocation: &StepInvocation,
        _deadline: Option<Deadline>,
        _cancel: &CancelToken,
    ) -> bridge_core::Result<StepOutput> {
        let (stdout, exit_code) = match invocation.step {
            BuildStep::Configure => ("-- Configuring done\n-- Generating done\n".to_string(), 0),
            BuildStep::Build => {
                let source = std::fs::read_to_string(invocation.cwd.join("test.prog"))?;
                if self.write_ir {
                    std::fs::write(invocation.cwd.join("output.ll"), format!("; ir for {source}"))?;
                }
                (source, self.build_exit_code)
            }
        };
        Ok(StepOutput {
            step: invocation.step,
            command_line: invocation.command_line(),
            exit_code: Some(exit_code),
            stdout,
            stderr: String::new(),
            duration_ms: 0,
        })
    }
}

const COMPILER_OUTPUT: &str = "\
[ 50%] Built target compiler
Parsed successfully!
Running semantic analysis...
Semantic analysis completed successfully.
Program
  Print 42
Generating LLVM IR...
LLVM IR written to output.ll
42
[100%] Built target run
";

fn config(root: &Path) -> BridgeConfig {
    BridgeConfig {
        project_dir: root.to_path_buf(),
        workspace_root: root.join("build"),
        ..BridgeConfig::default()
    }
}

fn service(root: &Path, toolchain: FakeToolchain) -> CompileService {
    CompileService::with_runner(config(root), Arc::new(toolchain)).expect("valid config")
}

fn expect_success(outcome: CompileOutcome) -> CompileResponse {
    match outcome {
        CompileOutcome::Success(resp) => resp,
        CompileOutcome::Failure(err) => panic!("expected success, got error: {}", err.error),
    }
}

#[tokio::test]
async fn test_full_build_populates_every_field() {
    let root = tempfile::tempdir().unwrap();
    let svc = service(
        root.path(),
        FakeToolchain {
            build_exit_code: 0,
            write_ir: true,
        },
    );

    let report = svc
        .execute(&CompileRequest::new(COMPILER_OUTPUT), &CancelToken::new())
        .await;

    assert_eq!(
        report.lifecycle.history(),
        &[
            BuildState::Idle,
            BuildState::WritingSource,
            BuildState::Configuring,
            BuildState::Building,
            BuildState::Extracting,
            BuildState::Assembling,
            BuildState::Done,
        ]
    );
    assert!(report.outcome.is_success());
    let resp = expect_success(report.outcome);

    assert!(resp.command_log.starts_with("$ cmake "));
    assert!(resp.command_log.contains("\n\n$ cmake --build .\n"));
    assert!(resp.ast_semantic.starts_with("Parsed successfully!\nRunning semantic analysis..."));
    assert!(resp.ast_semantic.ends_with("  Print 42\nGenerating LLVM IR..."));
    assert_eq!(resp.llvm_ir, format!("; ir for {COMPILER_OUTPUT}"));
    assert_eq!(resp.execution_result, "42\n[100%] Built target run");

    // Workspace is cleaned up once the response exists.
    let ws = root.path().join("build").join(report.workspace_id.unwrap().to_string());
    assert!(!ws.exists());
}

#[tokio::test]
async fn test_missing_ir_file_yields_sentinel_only_for_ir() {
    let root = tempfile::tempdir().unwrap();
    let svc = service(
        root.path(),
        FakeToolchain {
            build_exit_code: 0,
            write_ir: false,
        },
    );

    let resp = expect_success(
        svc.handle(&CompileRequest::new(COMPILER_OUTPUT), &CancelToken::new())
            .await,
    );
    assert_eq!(resp.llvm_ir, IR_SENTINEL);
    assert_ne!(resp.ast_semantic, TRACE_SENTINEL);
    assert_eq!(resp.execution_result, "42\n[100%] Built target run");
}

#[tokio::test]
async fn test_compiler_failure_is_still_success() {
    let root = tempfile::tempdir().unwrap();
    let svc = service(
        root.path(),
        FakeToolchain {
            build_exit_code: 2,
            write_ir: false,
        },
    );

    let resp = expect_success(
        svc.handle(
            &CompileRequest::new("main.y: syntax error\nParsing failed.\n"),
            &CancelToken::new(),
        )
        .await,
    );
    assert_eq!(resp.ast_semantic, TRACE_SENTINEL);
    assert_eq!(resp.llvm_ir, IR_SENTINEL);
    assert_eq!(resp.execution_result, EXECUTION_SENTINEL);
    assert!(resp.command_log.contains("Parsing failed."));
}

#[tokio::test]
async fn test_ir_header_without_written_line_is_empty_output() {
    let root = tempfile::tempdir().unwrap();
    let svc = service(
        root.path(),
        FakeToolchain {
            build_exit_code: 0,
            write_ir: false,
        },
    );

    let resp = expect_success(
        svc.handle(
            &CompileRequest::new("Generating LLVM IR...\nSemantic error: undeclared x\n"),
            &CancelToken::new(),
        )
        .await,
    );
    assert_eq!(resp.execution_result, "");
}

#[tokio::test]
async fn test_workspace_creation_failure_is_error_envelope() {
    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let cfg = BridgeConfig {
        workspace_root: blocker,
        ..config(root.path())
    };
    let svc = CompileService::with_runner(
        cfg,
        Arc::new(FakeToolchain {
            build_exit_code: 0,
            write_ir: false,
        }),
    )
    .unwrap();

    let report = svc
        .execute(&CompileRequest::new("x"), &CancelToken::new())
        .await;
    assert!(report.workspace_id.is_none());
    assert_eq!(report.lifecycle.current(), BuildState::Failed);
    assert_eq!(report.outcome.status_code(), 500);
    match report.outcome {
        CompileOutcome::Failure(err) => assert!(err.error.contains("build workspace")),
        CompileOutcome::Success(_) => panic!("expected failure"),
    }
}

#[tokio::test]
async fn test_sequential_requests_are_independent() {
    let root = tempfile::tempdir().unwrap();
    let svc = service(
        root.path(),
        FakeToolchain {
            build_exit_code: 0,
            write_ir: true,
        },
    );
    let cancel = CancelToken::new();

    let first = expect_success(svc.handle(&CompileRequest::new("first"), &cancel).await);
    let second = expect_success(svc.handle(&CompileRequest::new("second"), &cancel).await);

    assert_eq!(first.llvm_ir, "; ir for first");
    assert_eq!(second.llvm_ir, "; ir for second");
}

#[tokio::test]
async fn test_concurrent_requests_use_isolated_workspaces() {
    let root = tempfile::tempdir().unwrap();
    let svc = service(
        root.path(),
        FakeToolchain {
            build_exit_code: 0,
            write_ir: true,
        },
    );
    let cancel = CancelToken::new();
    let req_a = CompileRequest::new("alpha");
    let req_b = CompileRequest::new("beta");

    let (a, b) = tokio::join!(svc.execute(&req_a, &cancel), svc.execute(&req_b, &cancel));

    assert_ne!(a.workspace_id, b.workspace_id);
    assert_eq!(expect_success(a.outcome).llvm_ir, "; ir for alpha");
    assert_eq!(expect_success(b.outcome).llvm_ir, "; ir for beta");
}

#[tokio::test]
async fn test_kept_workspace_holds_source() {
    let root = tempfile::tempdir().unwrap();
    let cfg = BridgeConfig {
        keep_workspaces: true,
        ..config(root.path())
    };
    let svc = CompileService::with_runner(
        cfg,
        Arc::new(FakeToolchain {
            build_exit_code: 0,
            write_ir: true,
        }),
    )
    .unwrap();

    let report = svc
        .execute(&CompileRequest::new("kept source"), &CancelToken::new())
        .await;
    let ws = root
        .path()
        .join("build")
        .join(report.workspace_id.unwrap().to_string());
    assert_eq!(
        std::fs::read_to_string(ws.join("test.prog")).unwrap(),
        "kept source"
    );
    assert!(ws.join("output.ll").is_file());
}
