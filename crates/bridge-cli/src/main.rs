//! compile-bridge - structured artifacts from an external compiler toolchain
//!
//! ## Commands
//!
//! - `compile`: build one source file and print the JSON response
//! - `extract`: run the log extractions over a saved build log
//! - `serve`: answer line-delimited JSON compile requests on stdin/stdout

mod serve;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bridge_core::{
    assemble_offline, read_artifact, BridgeConfig, CancelToken, CompileRequest, CompileResponse,
    CompileService, Extraction, METRICS,
};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "compile-bridge")]
#[command(author = "Stevedores Org")]
#[command(version = bridge_core::VERSION)]
#[command(about = "Run a compiler toolchain and extract structured build artifacts", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one source file and print the JSON response
    Compile {
        /// Source file (default: read stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Pretty-print the JSON response
        #[arg(long)]
        pretty: bool,
    },

    /// Extract trace, program output and IR from a saved build log
    Extract {
        /// Build log file
        #[arg(short, long)]
        log: PathBuf,

        /// Generated IR file to include
        #[arg(long)]
        ir: Option<PathBuf>,
    },

    /// Serve line-delimited JSON compile requests on stdin/stdout
    Serve,
}

/// Configuration flags; each overrides the config file when given.
#[derive(Args)]
struct ConfigArgs {
    /// JSON config file
    #[arg(long, global = true, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Toolchain project directory passed to the configure step
    #[arg(long, global = true, env = "BRIDGE_PROJECT_DIR")]
    project_dir: Option<PathBuf>,

    /// Parent directory for per-request build workspaces
    #[arg(long, global = true, env = "BRIDGE_WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    /// Configure command, whitespace-separated ({project_dir}, {build_dir}, {source} are substituted)
    #[arg(long, global = true, env = "BRIDGE_CONFIGURE_COMMAND")]
    configure_command: Option<String>,

    /// Build command, whitespace-separated
    #[arg(long, global = true, env = "BRIDGE_BUILD_COMMAND")]
    build_command: Option<String>,

    /// Deadline for configure + build in seconds (0 disables)
    #[arg(long, global = true, env = "BRIDGE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Keep build workspaces on disk
    #[arg(long, global = true, env = "BRIDGE_KEEP_WORKSPACES")]
    keep_workspaces: bool,

    /// Maximum builds in flight in serve mode
    #[arg(long, global = true, env = "BRIDGE_MAX_CONCURRENT")]
    max_concurrent: Option<usize>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => BridgeConfig::default(),
        };

        if let Some(dir) = &self.project_dir {
            config.project_dir = dir.clone();
        }
        if let Some(root) = &self.workspace_root {
            config.workspace_root = root.clone();
        }
        if let Some(cmd) = &self.configure_command {
            config.configure_command = split_command(cmd);
        }
        if let Some(cmd) = &self.build_command {
            config.build_command = split_command(cmd);
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        if self.keep_workspaces {
            config.keep_workspaces = true;
        }
        if let Some(n) = self.max_concurrent {
            config.max_concurrent = n;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn split_command(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    bridge_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Compile { input, pretty } => {
            cmd_compile(&cli.config, input.as_deref(), pretty).await
        }
        Commands::Extract { log, ir } => cmd_extract(&log, ir.as_deref()).await,
        Commands::Serve => cmd_serve(&cli.config).await,
    }
}

/// Cancel token fired on ctrl-c.
fn ctrl_c_token() -> CancelToken {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight builds");
            trigger.cancel();
        }
    });
    cancel
}

async fn cmd_compile(args: &ConfigArgs, input: Option<&Path>, pretty: bool) -> Result<ExitCode> {
    let config = args.resolve()?;
    let code = match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read source file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read source from stdin")?;
            buf
        }
    };

    let service = CompileService::new(config)?;
    let outcome = service
        .handle(&CompileRequest::new(code), &ctrl_c_token())
        .await;

    let rendered = if pretty {
        serde_json::to_string_pretty(&outcome)?
    } else {
        serde_json::to_string(&outcome)?
    };
    println!("{rendered}");

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn cmd_extract(log: &Path, ir: Option<&Path>) -> Result<ExitCode> {
    let response = extract_response(log, ir).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(ExitCode::SUCCESS)
}

/// Offline response for a saved build log; an unreadable IR file is a soft miss.
async fn extract_response(log: &Path, ir: Option<&Path>) -> Result<CompileResponse> {
    let log_text = tokio::fs::read_to_string(log)
        .await
        .with_context(|| format!("failed to read build log {}", log.display()))?;

    let ir = match ir {
        Some(path) => read_artifact(path).await,
        None => Extraction::NotFound,
    };

    Ok(assemble_offline(&log_text, ir))
}

async fn cmd_serve(args: &ConfigArgs) -> Result<ExitCode> {
    let config = args.resolve()?;
    info!(
        workspace_root = %config.workspace_root.display(),
        max_concurrent = config.max_concurrent,
        timeout_secs = config.timeout_secs,
        "serving compile requests on stdin"
    );
    let service = CompileService::new(config)?;
    let cancel = ctrl_c_token();

    let served = serve::serve(
        &service,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        &cancel,
    )
    .await
    .context("serve loop failed")?;

    info!(served, "serve loop finished");
    METRICS.flush();
    Ok(ExitCode::SUCCESS)
}
