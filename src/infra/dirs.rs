//! Platform-specific directory management
//!
//! Provides the platform-specific config directory. Follows the XDG Base
//! Directory Specification on Linux and standard locations on macOS.
//!
//! `MODBUILD_CONFIG_DIR` overrides the default location.

use std::env;
use std::path::PathBuf;

use crate::config::defaults::CONFIG_FILE;

/// Environment variable overriding the config directory
pub const ENV_CONFIG_DIR: &str = "MODBUILD_CONFIG_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "modbuild";

/// Platform-specific directory provider for modbuild
#[derive(Debug, Clone)]
pub struct ModbuildDirs {
    config_dir: PathBuf,
}

impl ModbuildDirs {
    /// Create a new `ModbuildDirs` instance
    ///
    /// Checks the environment first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
        }
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/modbuild` or `~/.config/modbuild`
    /// - macOS: `~/Library/Application Support/modbuild`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Get the user config file path
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                // Fallback to home directory
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }
}

impl Default for ModbuildDirs {
    fn default() -> Self {
        Self::new()
    }
}
