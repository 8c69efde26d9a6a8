//! Build mode and build intent

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ConfigError;

/// How aggressively a run rebuilds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Every unit is rebuilt
    Clean,
    /// Makers refresh their inputs; otherwise behaves like `Normal`
    Update,
    /// Only units with changed inputs are rebuilt
    #[default]
    Normal,
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Update => write!(f, "update"),
            Self::Normal => write!(f, "normal"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clean" => Ok(Self::Clean),
            "update" => Ok(Self::Update),
            "normal" => Ok(Self::Normal),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// What the build output is for, passed on to makers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildIntent {
    /// Regular build
    #[default]
    Normal,
    /// Build including test sources
    Test,
}

impl std::fmt::Display for BuildIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Test => write!(f, "test"),
        }
    }
}

impl FromStr for BuildIntent {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "test" => Ok(Self::Test),
            _ => Err(ConfigError::UnknownIntent(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_and_display() {
        assert_eq!("clean".parse::<BuildMode>().unwrap(), BuildMode::Clean);
        assert_eq!(" Update ".parse::<BuildMode>().unwrap(), BuildMode::Update);
        assert_eq!(BuildMode::Normal.to_string(), "normal");
        assert!(matches!(
            "fast".parse::<BuildMode>(),
            Err(ConfigError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_intent_parse_and_display() {
        assert_eq!("test".parse::<BuildIntent>().unwrap(), BuildIntent::Test);
        assert_eq!(BuildIntent::default().to_string(), "normal");
        assert!(matches!(
            "release".parse::<BuildIntent>(),
            Err(ConfigError::UnknownIntent(_))
        ));
    }
}
