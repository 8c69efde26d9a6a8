//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no build logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use commands::Commands;

/// Modbuild - Incremental multi-module build orchestrator
///
/// Discovers the modules of a source tree and rebuilds only what changed.
#[derive(Parser, Debug)]
#[command(name = "modbuild")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file to use instead of the user configuration
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Default log level selected by `-v` and `-q`
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }

    /// Execute the CLI command
    ///
    /// Returns `false` when the command ran but the build failed.
    pub fn run(self) -> Result<bool> {
        if let Some(cmd) = self.command {
            cmd.run(self.config.as_deref(), self.quiet)
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mode::BuildMode;

    #[test]
    fn test_verbosity_levels() {
        let cli = Cli::parse_from(["modbuild", "-vv", "plan"]);
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
        let cli = Cli::parse_from(["modbuild", "-q", "-v", "plan"]);
        assert_eq!(cli.log_level(), tracing::Level::ERROR);
        let cli = Cli::parse_from(["modbuild", "plan"]);
        assert_eq!(cli.log_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_parse_build_arguments() {
        let cli = Cli::parse_from([
            "modbuild",
            "--config",
            "/etc/modbuild.toml",
            "build",
            "--main",
            "app",
            "--mode",
            "clean",
            "--build-number",
            "7",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/modbuild.toml")));
        match cli.command {
            Some(Commands::Build { tree, build_number, revision }) => {
                assert_eq!(tree.main.as_deref(), Some("app"));
                assert_eq!(tree.mode, Some(BuildMode::Clean));
                assert_eq!(build_number, Some(7));
                assert!(revision.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["modbuild", "build", "--mode", "fast"]).is_err());
    }
}
