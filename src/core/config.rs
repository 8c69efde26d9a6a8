//! User configuration
//!
//! Reads defaults for build runs from `modbuild.toml` in the config
//! directory. Command-line flags override these values, which override the
//! built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::defaults::{
    DEFAULT_BRANCH, DEFAULT_OUTPUT_ROOT, DEFAULT_SHELL, MAX_DISCOVERY_DEPTH,
};
use crate::core::mode::BuildMode;
use crate::error::ConfigError;
use crate::infra::dirs::ModbuildDirs;
use crate::infra::filesystem;

/// Contents of `modbuild.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Build defaults
    #[serde(default)]
    pub build: BuildDefaults,

    /// Discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Command maker settings
    #[serde(default)]
    pub maker: MakerConfig,
}

/// `[build]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildDefaults {
    /// Output root for all units
    pub output_root: Option<PathBuf>,

    /// Module a run starts from
    pub main_module: Option<String>,

    /// Build mode
    pub mode: Option<BuildMode>,

    /// Branch identifier
    pub branch: Option<String>,
}

/// `[discovery]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Directory levels searched for modules
    pub max_depth: Option<usize>,
}

/// `[maker]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MakerConfig {
    /// Shell running module commands
    pub shell: Option<String>,
}

impl BuilderConfig {
    /// Load the configuration from the config directory
    ///
    /// A missing file yields the defaults.
    pub fn load(dirs: &ModbuildDirs) -> Result<Self, ConfigError> {
        Self::load_from_path(&dirs.config_path())
    }

    /// Load the configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No configuration at {}", path.display());
            return Ok(Self::default());
        }

        let content = filesystem::read_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    #[must_use]
    pub fn output_root(&self) -> PathBuf {
        self.build
            .output_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT))
    }

    #[must_use]
    pub fn mode(&self) -> BuildMode {
        self.build.mode.unwrap_or_default()
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        self.build.branch.as_deref().unwrap_or(DEFAULT_BRANCH)
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.discovery.max_depth.unwrap_or(MAX_DISCOVERY_DEPTH)
    }

    #[must_use]
    pub fn shell(&self) -> &str {
        self.maker.shell.as_deref().unwrap_or(DEFAULT_SHELL)
    }
}
