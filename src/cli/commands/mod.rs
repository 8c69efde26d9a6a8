//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod clean;
pub mod plan;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use crate::core::config::BuilderConfig;
use crate::core::mode::{BuildIntent, BuildMode};
use crate::core::orchestrator::BuildSettings;
use crate::infra::dirs::ModbuildDirs;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build every module that changed, and everything depending on it
    Build {
        #[command(flatten)]
        tree: TreeArgs,

        /// Source revision recorded in the build details
        #[arg(long)]
        revision: Option<String>,

        /// Build number to use instead of the previous one plus one
        #[arg(long)]
        build_number: Option<u32>,
    },

    /// Show the build order and why each module would be built
    Plan {
        #[command(flatten)]
        tree: TreeArgs,
    },

    /// Remove the output root
    Clean {
        /// Output root to remove
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Where to find and build the modules
#[derive(Args, Debug, Default, Clone)]
pub struct TreeArgs {
    /// Source root scanned for modules (defaults to the current directory)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Output root for all modules
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Module the build starts from
    #[arg(short, long)]
    pub main: Option<String>,

    /// Build mode: clean, update or normal
    #[arg(long)]
    pub mode: Option<BuildMode>,

    /// Branch identifier
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Build intent passed to the modules: normal or test
    #[arg(long)]
    pub intent: Option<BuildIntent>,
}

impl Commands {
    /// Execute the command
    pub fn run(self, config_path: Option<&Path>, quiet: bool) -> Result<bool> {
        let config = load_config(config_path)?;
        match self {
            Self::Build {
                tree,
                revision,
                build_number,
            } => {
                let settings = tree
                    .settings(&config)?
                    .with_revision(revision)
                    .with_build_number(build_number);
                build::execute(settings, config.shell(), quiet)
            }
            Self::Plan { tree } => {
                let settings = tree.settings(&config)?;
                plan::execute(settings, config.shell())
            }
            Self::Clean { output } => {
                let output = output.unwrap_or_else(|| config.output_root());
                clean::execute(&output)
            }
        }
    }
}

impl TreeArgs {
    /// Merge the arguments with the configuration into build settings
    ///
    /// Arguments take precedence over the configuration file.
    pub fn settings(self, config: &BuilderConfig) -> Result<BuildSettings> {
        let source = match self.source {
            Some(source) => source,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let output = self.output.unwrap_or_else(|| config.output_root());
        let Some(main) = self.main.or_else(|| config.build.main_module.clone()) else {
            anyhow::bail!("No main module given. Use --main or set build.main_module in modbuild.toml");
        };

        Ok(BuildSettings::new(source, output, main)
            .with_mode(self.mode.unwrap_or_else(|| config.mode()))
            .with_intent(self.intent.unwrap_or_default())
            .with_branch(self.branch.unwrap_or_else(|| config.branch().to_string()))
            .with_max_depth(config.max_depth()))
    }
}

fn load_config(path: Option<&Path>) -> Result<BuilderConfig> {
    let config = match path {
        Some(path) => {
            anyhow::ensure!(path.exists(), "Config file {} does not exist", path.display());
            BuilderConfig::load_from_path(path)?
        }
        None => BuilderConfig::load(&ModbuildDirs::new())?,
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BuildDefaults;

    #[test]
    fn test_arguments_override_config() {
        let config = BuilderConfig {
            build: BuildDefaults {
                output_root: Some(PathBuf::from("/from/config")),
                main_module: Some("app".into()),
                mode: Some(BuildMode::Update),
                branch: Some("release".into()),
            },
            ..BuilderConfig::default()
        };
        let args = TreeArgs {
            source: Some(PathBuf::from("/src")),
            main: Some("tool".into()),
            mode: Some(BuildMode::Clean),
            intent: Some(BuildIntent::Test),
            ..TreeArgs::default()
        };

        let settings = args.settings(&config).unwrap();
        assert_eq!(settings.source_root, PathBuf::from("/src"));
        assert_eq!(settings.output_root, PathBuf::from("/from/config"));
        assert_eq!(settings.main_module, "tool");
        assert_eq!(settings.mode, BuildMode::Clean);
        assert_eq!(settings.branch, "release");
        assert_eq!(settings.intent, BuildIntent::Test);
    }

    #[test]
    fn test_main_module_is_required() {
        let args = TreeArgs {
            source: Some(PathBuf::from("/src")),
            ..TreeArgs::default()
        };
        let err = args.settings(&BuilderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("--main"));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
