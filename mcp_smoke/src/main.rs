use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use mcp_smoke::{HarnessConfig, LineStrategy, Reporter, SuiteRunner};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run a fixed list of tool calls against an MCP server, one process per call
#[derive(Debug, Parser)]
#[command(name = "mcp_smoke", version, about)]
struct Cli {
    /// TOML file with the server path and cases; built-in defaults otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server executable, overrides the config
    #[arg(short, long, env = "MCP_SMOKE_EXECUTABLE")]
    executable: Option<PathBuf>,

    /// Per-case timeout in seconds, overrides the config
    #[arg(short, long, env = "MCP_SMOKE_TIMEOUT_SECS")]
    timeout: Option<u64>,

    /// How the response line is picked out of stdout
    #[arg(long, value_enum)]
    line_strategy: Option<LineStrategy>,

    /// Only run cases for these tools (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    only: Vec<String>,

    /// Force colored output
    #[arg(long)]
    color: bool,

    /// Exit with status 1 when any case fails
    #[arg(long)]
    fail_on_error: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path).await?,
        None => HarnessConfig::default(),
    };
    if let Some(executable) = cli.executable {
        config.executable = mcp_smoke::config::expand_tilde(&executable);
    }
    if let Some(secs) = cli.timeout {
        config.timeout_secs = secs;
    }
    if let Some(strategy) = cli.line_strategy {
        config.line_strategy = strategy;
    }

    let cases = config.test_cases(&cli.only);
    info!(
        "Running {} cases against {:?} with a {:?} timeout",
        cases.len(),
        config.executable,
        config.timeout()
    );

    let reporter = Reporter::new(std::io::stdout(), cli.color);
    let mut runner = SuiteRunner::new(config.driver(), config.executable.clone(), reporter)
        .with_line_strategy(config.line_strategy)
        .with_ids(config.id_generator())
        .with_title(config.title.clone());

    let summary = runner.run_suite(&cases).await;
    if cli.fail_on_error && summary.failed() > 0 {
        std::process::exit(1);
    }
    Ok(())
}
