//! Module makers
//!
//! A module maker knows how to read one kind of module description, which
//! modules it depends on, and how to build it. The engine only ever talks to
//! makers through [`ModuleMaker`]; makers are found by the explicit list of
//! [`MakerRecognizer`]s handed to discovery.
//!
//! # Submodules
//!
//! - [`manifest`] - `module.toml` description format
//! - [`command`] - Maker that runs shell commands from `module.toml`

pub mod command;
pub mod manifest;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::core::log::BuildLog;
use crate::core::mode::{BuildIntent, BuildMode};
use crate::error::MakeError;

/// A named build output visible to dependent modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Stable name other modules reference
    pub name: String,
    /// File holding the product
    pub file: PathBuf,
}

impl Product {
    /// Create a product
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }
}

/// A reference from one module to a resource of another module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleFileRef {
    /// Module that owns the resource
    pub module: String,
    /// Resource name within that module
    pub path: String,
}

impl std::fmt::Display for ModuleFileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.module, self.path)
    }
}

/// Read-only view of a unit, handed to product generators
#[derive(Debug, Clone, Copy)]
pub struct UnitInfo<'a> {
    /// Module name
    pub name: &'a str,
    /// The unit's output directory
    pub output_dir: &'a Path,
    /// The module's source root
    pub source_root: &'a Path,
}

/// A product materialized by a post-build step
pub trait GeneratedProduct: std::fmt::Debug {
    /// The product this step creates
    fn product(&self) -> &Product;

    /// Create the product after a successful build
    fn generate(&self, unit: &UnitInfo<'_>, log: &mut BuildLog) -> Result<(), MakeError>;
}

/// The unit as seen by its maker during initialization
#[derive(Debug)]
pub struct UnitSetup<'a> {
    name: &'a str,
    output_dir: &'a Path,
    properties: &'a BTreeMap<String, String>,
    external_references: &'a mut Vec<ModuleFileRef>,
}

impl<'a> UnitSetup<'a> {
    pub(crate) fn new(
        name: &'a str,
        output_dir: &'a Path,
        properties: &'a BTreeMap<String, String>,
        external_references: &'a mut Vec<ModuleFileRef>,
    ) -> Self {
        Self {
            name,
            output_dir,
            properties,
            external_references,
        }
    }

    /// Module name
    pub fn name(&self) -> &str {
        self.name
    }

    /// Directory exclusively owned by this unit for its build output
    pub fn output_dir(&self) -> &Path {
        self.output_dir
    }

    /// Value from the module's optional properties file
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Every entry of the module's properties file
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Record a resource this module needs from another module
    ///
    /// Adding the same reference twice has no effect.
    pub fn add_external_reference(&mut self, module: &str, path: &str) {
        let exists = self
            .external_references
            .iter()
            .any(|r| r.module == module && r.path == path);
        if !exists {
            self.external_references.push(ModuleFileRef {
                module: module.to_string(),
                path: path.to_string(),
            });
        }
    }
}

/// Build capability for one module
pub trait ModuleMaker: std::fmt::Debug {
    /// Stable module name, used as the unit key
    fn module_name(&self) -> &str;

    /// Human readable name of the maker itself
    fn kind(&self) -> &str;

    /// Root directory of the module's sources
    fn source_root(&self) -> &Path;

    /// Relative files and directories whose changes require a rebuild
    ///
    /// Must include every file that steers the build, not only compiled
    /// sources.
    fn build_sources(&self) -> BTreeSet<String>;

    /// Read the module's own description
    fn initialize(
        &mut self,
        unit: &mut UnitSetup<'_>,
        mode: BuildMode,
        intent: BuildIntent,
    ) -> Result<(), MakeError>;

    /// Names of the modules this one depends on directly
    fn direct_dependencies(&self) -> Result<Vec<String>, MakeError>;

    /// A reason to rebuild that the engine cannot see, such as a missing artifact
    ///
    /// Only consulted when the engine has no other reason to build.
    fn must_be_built(&self) -> Option<String>;

    /// Products used by dependents that this build does not generate
    fn exported_products(&self) -> Vec<Product>;

    /// Products created by post-build steps
    fn generated_products(&self) -> Vec<&dyn GeneratedProduct> {
        Vec::new()
    }

    /// Resolve a resource a dependent module needs from this one
    ///
    /// An internal product may be promoted to exported; `Ok(None)` means the
    /// resource is unknown.
    fn resolve_exported_resource(
        &mut self,
        requesting_module: &str,
        resource: &str,
    ) -> Result<Option<Product>, MakeError>;

    /// Receive the concrete product for one of this module's external references
    fn add_resolved_external(
        &mut self,
        reference: &ModuleFileRef,
        product: Product,
    ) -> Result<(), MakeError>;

    /// Build the module, writing diagnostics to `log`
    fn build_module(&mut self, log: &mut BuildLog) -> Result<(), MakeError>;

    /// Discard previous build output
    fn clean(&mut self) -> Result<(), MakeError>;
}

/// Recognizes directories one kind of maker can build
pub trait MakerRecognizer: std::fmt::Debug {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Return a maker if `dir` is a module this recognizer understands
    fn recognize(&self, dir: &Path) -> Result<Option<Box<dyn ModuleMaker>>, MakeError>;
}

/// Ask each recognizer in order for a maker for `dir`
///
/// The first maker returned wins. If no recognizer accepts the directory but
/// one of them failed, the last failure is returned.
pub fn find_maker(
    recognizers: &[Box<dyn MakerRecognizer>],
    dir: &Path,
) -> Result<Option<Box<dyn ModuleMaker>>, MakeError> {
    let mut failure = None;
    for recognizer in recognizers {
        match recognizer.recognize(dir) {
            Ok(Some(maker)) => return Ok(Some(maker)),
            Ok(None) => {}
            Err(e) => {
                tracing::debug!("Recognizer {} failed on {}: {}", recognizer.name(), dir.display(), e);
                failure = Some(e);
            }
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(None),
    }
}

/// The recognizers used by the command-line tool
pub fn default_recognizers(shell: &str) -> Vec<Box<dyn MakerRecognizer>> {
    vec![Box::new(command::CommandRecognizer::new(shell))]
}
