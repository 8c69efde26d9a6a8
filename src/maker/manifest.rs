//! Module description (module.toml) parsing and validation
//!
//! A module directory is recognized by its `module.toml`. Every section is
//! optional; an empty file describes a module named after its directory with
//! no dependencies and nothing to build.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::MakeError;

/// The module description (module.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleManifest {
    /// Module identity and inputs
    #[serde(default)]
    pub module: ModuleSection,

    /// Build step
    #[serde(default)]
    pub build: BuildSection,

    /// Products created by the build step
    #[serde(default, rename = "product")]
    pub products: Vec<ProductDecl>,

    /// Products created after a successful build
    #[serde(default, rename = "generate")]
    pub generated: Vec<GenerateDecl>,

    /// Resources used from dependencies
    #[serde(default, rename = "import")]
    pub imports: Vec<ImportDecl>,
}

/// `[module]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleSection {
    /// Module name, defaults to the directory name
    #[serde(default)]
    pub name: Option<String>,

    /// Names of modules this one depends on
    #[serde(default)]
    pub depends: Vec<String>,

    /// Files and directories, relative to the module, whose changes require a rebuild
    #[serde(default)]
    pub sources: Vec<String>,
}

/// `[build]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildSection {
    /// Shell command run in the module directory
    #[serde(default)]
    pub command: Option<String>,
}

/// `[[product]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductDecl {
    /// Name dependents use to reference the product
    pub name: String,

    /// File, relative to the unit's output directory
    pub path: String,

    /// Whether dependents may use it without promotion
    #[serde(default = "default_exported")]
    pub exported: bool,
}

fn default_exported() -> bool {
    true
}

/// `[[generate]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateDecl {
    pub name: String,
    pub path: String,
    pub command: String,
}

/// `[[import]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportDecl {
    /// Module owning the resource; must be a direct dependency
    pub module: String,
    /// Product name within that module
    pub resource: String,
}

impl ModuleManifest {
    /// Parse a module description from TOML
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load and validate the description of the module in `dir`
    pub fn load(dir: &Path, file: &Path) -> Result<Self, MakeError> {
        let config_error = |message: String| MakeError::Config {
            module: dir_name(dir),
            message,
        };
        let content = std::fs::read_to_string(file)
            .map_err(|e| config_error(format!("cannot read {}: {e}", file.display())))?;
        let manifest = Self::from_toml(&content)
            .map_err(|e| config_error(format!("invalid {}: {e}", file.display())))?;
        manifest.validate().map_err(config_error)?;
        Ok(manifest)
    }

    /// Module name, falling back to the directory name
    pub fn module_name(&self, dir: &Path) -> String {
        self.module.name.clone().unwrap_or_else(|| dir_name(dir))
    }

    /// Check the description for inconsistencies
    pub fn validate(&self) -> Result<(), String> {
        if self.module.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err("module name must not be empty".to_string());
        }
        if let Some(source) = self.module.sources.iter().find(|s| s.trim().is_empty()) {
            return Err(format!("illegal empty source path '{source}'"));
        }

        let mut names = HashSet::new();
        let declared = self
            .products
            .iter()
            .map(|p| (&p.name, &p.path))
            .chain(self.generated.iter().map(|g| (&g.name, &g.path)));
        for (name, path) in declared {
            if name.trim().is_empty() || path.trim().is_empty() {
                return Err("products need a name and a path".to_string());
            }
            if !names.insert(name.as_str()) {
                return Err(format!("duplicate product '{name}'"));
            }
        }

        for import in &self.imports {
            if !self.module.depends.contains(&import.module) {
                return Err(format!(
                    "import of '{}' from '{}', which is not a dependency",
                    import.resource, import.module
                ));
            }
        }
        Ok(())
    }
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
