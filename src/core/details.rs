//! Build run metadata
//!
//! Stamped into the output root after every successful run and removed when
//! the next run starts. Nothing in the build decisions depends on it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::DetailsError;
use crate::infra::filesystem;

/// Metadata of one build run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDetails {
    /// Monotonic run number
    pub build_number: u32,
    /// Seconds since the Unix epoch at the end of the run
    pub timestamp: u64,
    /// Source revision the run was built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl BuildDetails {
    /// Create metadata stamped with the current time
    pub fn new(build_number: u32, revision: Option<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            build_number,
            timestamp,
            revision,
        }
    }

    /// Load the details of the previous run
    ///
    /// A missing or unreadable file means no previous run is known.
    pub fn load(path: &Path) -> Option<Self> {
        let content = filesystem::read_file(path).ok()?;
        match toml::from_str(&content) {
            Ok(details) => Some(details),
            Err(e) => {
                tracing::warn!("Ignoring unreadable build details {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store the details, replacing the previous run's
    pub fn store(&self, path: &Path) -> Result<(), DetailsError> {
        let content = toml::to_string_pretty(self)?;
        filesystem::write_file(path, &content)?;
        Ok(())
    }

    /// Number for the next run: the override, else previous plus one, else 1
    pub fn next_build_number(path: &Path, requested: Option<u32>) -> u32 {
        if let Some(number) = requested {
            return number;
        }
        Self::load(path).map_or(1, |previous| previous.build_number.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_number_increments() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("build-details.toml");
        assert_eq!(BuildDetails::next_build_number(&file, None), 1);

        BuildDetails::new(41, Some("r1234".into())).store(&file).unwrap();
        assert_eq!(BuildDetails::next_build_number(&file, None), 42);
        assert_eq!(BuildDetails::next_build_number(&file, Some(7)), 7);

        let loaded = BuildDetails::load(&file).unwrap();
        assert_eq!(loaded.revision.as_deref(), Some("r1234"));
        assert!(loaded.timestamp > 0);
    }

    #[test]
    fn test_corrupt_details_are_ignored() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("build-details.toml");
        std::fs::write(&file, "build_number = \"many\"").unwrap();
        assert!(BuildDetails::load(&file).is_none());
        assert_eq!(BuildDetails::next_build_number(&file, None), 1);
    }
}
