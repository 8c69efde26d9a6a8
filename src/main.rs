//! Modbuild CLI - Incremental multi-module build orchestrator
//!
//! Entry point for the modbuild command-line application.

use anyhow::Result;
use clap::Parser;

use modbuild::cli::output::display_error;
use modbuild::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(cli.log_level().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.run() {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
