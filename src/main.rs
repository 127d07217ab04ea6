//! modhost: module lifecycle orchestrator.
//!
//! # Architecture Overview
//!
//! ```text
//!   config file ──▶ loader ──▶ ConfigNode tree
//!                                   │
//!                                   ▼
//!                        ┌─────────────────────┐
//!                        │ GlobalOptions       │── log / debug ──▶ LogSettings
//!                        │ (global directives) │
//!                        └──────────┬──────────┘
//!                                   │ unmatched blocks
//!                                   ▼
//!   factories ──▶ Registry ──▶ instantiate ──▶ LifecycleContext ──▶ initialize
//!                                                                      │
//!                                                                      ▼
//!                                  signals ──▶ ShutdownCoordinator ──▶ exit
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use modhost::config::loader::load_config;
use modhost::modules::register_builtins;
use modhost::observability::logging::{self, LogSettings};
use modhost::Registry;

#[derive(Parser)]
#[command(name = "modhost")]
#[command(about = "Run the modules declared in a configuration file", long_about = None)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "modhost.toml")]
    config: PathBuf,

    /// Enable debug logging regardless of the `debug` directive.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log = LogSettings::new();
    if cli.debug {
        log.force_debug();
    }
    logging::init(&log);

    tracing::info!(config = %cli.config.display(), "modhost v0.1.0 starting");

    match run(&cli, &log).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, log: &LogSettings) -> Result<(), Box<dyn std::error::Error>> {
    let nodes = load_config(&cli.config)?;

    let mut registry = Registry::new();
    register_builtins(&mut registry)?;

    modhost::start(&nodes, registry, log).await?;
    Ok(())
}
