//! cadrelay CLI - fetch tool-generated scripts and run them behind a gate

mod repl;
mod terminal;

use anyhow::{Context, Result};
use cadrelay_bridge::FetchDriver;
use cadrelay_core::{Endpoint, RelayConfig, config_path, load_config, parse_parameters};
use cadrelay_script::{Design, DesignHandle, ExecutionGate, HostContext};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::terminal::{PrintNotifier, TerminalConfirm};

#[derive(Parser)]
#[command(name = "cadrelay")]
#[command(about = "Fetch CAD scripts from a tool server and run them after confirmation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the per-user config directory)
    #[arg(long, global = true, env = "CADRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,
}

/// Settings that override the config file for this run
#[derive(Args, Default)]
struct Overrides {
    /// Tool server base URL
    #[arg(long, global = true, env = "CADRELAY_SERVER_URL")]
    server: Option<String>,

    /// Endpoint to post to (/call_tool or /call_tools)
    #[arg(long, global = true, env = "CADRELAY_ENDPOINT", value_parser = parse_endpoint)]
    endpoint: Option<Endpoint>,

    /// Tool to request
    #[arg(long, global = true, env = "CADRELAY_TOOL")]
    tool: Option<String>,

    /// Tool parameters as a JSON object
    #[arg(long, global = true, env = "CADRELAY_PARAMS")]
    params: Option<String>,

    /// Run received scripts without asking
    #[arg(long, global = true, env = "CADRELAY_AUTO_EXECUTE")]
    auto_execute: bool,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "CADRELAY_TIMEOUT")]
    timeout: Option<u64>,

    /// Script characters shown before confirmation
    #[arg(long, global = true, env = "CADRELAY_PREVIEW_LIMIT")]
    preview_limit: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one script from the tool server and run it
    Fetch {
        /// Write the resulting design as JSON
        #[arg(long)]
        design_out: Option<PathBuf>,
    },

    /// Interactive console for arbitrary tool calls
    Repl {
        /// Also append the session transcript to this file
        #[arg(long)]
        transcript: Option<PathBuf>,
    },

    /// Run a saved script through the confirmation gate
    Run {
        /// Script file to run
        script: PathBuf,

        /// Write the resulting design as JSON
        #[arg(long)]
        design_out: Option<PathBuf>,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = effective_config(cli.config.as_deref(), &cli.overrides)?;

    match cli.command {
        Commands::Fetch { design_out } => run_fetch(&config, design_out.as_deref()),
        Commands::Repl { transcript } => {
            repl::run_repl(&config, transcript.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { script, design_out } => run_script(&config, &script, design_out.as_deref()),
        Commands::Config { action } => {
            run_config(action, cli.config.as_deref(), &config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`, `debug` with --verbose)
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_endpoint(value: &str) -> Result<Endpoint, String> {
    Endpoint::parse(value).ok_or_else(|| format!("unknown endpoint '{}', expected /call_tool or /call_tools", value))
}

/// Load the config file and apply command-line overrides
fn effective_config(path: Option<&Path>, overrides: &Overrides) -> Result<RelayConfig> {
    let mut config = load_config(path);

    if let Some(server) = &overrides.server {
        config.server_url.clone_from(server);
    }
    if let Some(endpoint) = overrides.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(tool) = &overrides.tool {
        config.tool_name.clone_from(tool);
    }
    if let Some(params) = &overrides.params {
        config.parameters = parse_parameters(params).context("Invalid --params")?;
    }
    if overrides.auto_execute {
        config.auto_execute = true;
    }
    if let Some(timeout) = overrides.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(limit) = overrides.preview_limit {
        config.preview_limit = limit;
    }

    config.validate()?;
    Ok(config)
}

fn run_fetch(config: &RelayConfig, design_out: Option<&Path>) -> Result<ExitCode> {
    let driver = FetchDriver::new(config)?;
    let design = DesignHandle::new();

    let outcome = driver.run(&mut TerminalConfirm, &mut PrintNotifier, &design);

    if let Some(path) = design_out {
        write_design(path, &design.snapshot())?;
    }

    Ok(exit_code(outcome.is_fault()))
}

fn run_script(config: &RelayConfig, script: &Path, design_out: Option<&Path>) -> Result<ExitCode> {
    let source = std::fs::read_to_string(script)
        .with_context(|| format!("Failed to read {}", script.display()))?;

    let gate = ExecutionGate::from_config(config);
    let design = DesignHandle::new();

    let outcome = gate.maybe_run(Some(source.as_str()), &mut TerminalConfirm, HostContext::Design(design.clone()));

    if outcome.is_fault() {
        eprintln!("{}", outcome);
    } else {
        println!("{}", outcome);
    }

    let snapshot = design.snapshot();
    if outcome.is_success() {
        println!("{}", snapshot);
    }
    if let Some(path) = design_out {
        write_design(path, &snapshot)?;
    }

    Ok(exit_code(outcome.is_fault()))
}

fn write_design(path: &Path, design: &Design) -> Result<()> {
    let json = serde_json::to_string_pretty(design)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Design written to {}", path.display());
    Ok(())
}

fn run_config(action: ConfigAction, path: Option<&Path>, config: &RelayConfig) -> Result<()> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(config_path)
        .context("No config directory on this platform; pass --config")?;

    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!("Config file already exists: {} (use --force to overwrite)", path.display());
            }
            RelayConfig::default().save_to(&path)?;
            println!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}

fn exit_code(fault: bool) -> ExitCode {
    if fault { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
