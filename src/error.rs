//! Error types for modbuild
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Content inventory errors
///
/// Any of these aborts discovery: an incomplete inventory would hide changes
/// from later runs.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// A build source entry was empty
    #[error("Illegal empty build source path for '{root}'")]
    EmptySubpath { root: PathBuf },

    /// Walking a source directory failed
    #[error("Failed to scan '{path}': {error}")]
    Walk { path: PathBuf, error: String },

    /// Reading file metadata or content failed
    #[error("Failed to read '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Persisting the inventory failed
    #[error("Failed to save inventory '{path}': {error}")]
    Save { path: PathBuf, error: String },
}

/// Errors reported by a module maker
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MakeError {
    /// The module's own description is invalid
    #[error("Configuration error in module '{module}': {message}")]
    Config { module: String, message: String },

    /// The build step failed
    #[error("Build of module '{module}' failed: {message}")]
    BuildFailed { module: String, message: String },

    /// IO error while making
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Discovery and configuration errors
///
/// All of these are fatal to the whole run: no build order can be trusted.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The source root cannot be scanned
    #[error("Source root '{path}' cannot be scanned: {error}")]
    SourceRoot { path: PathBuf, error: String },

    /// The main module is not present in the source tree
    #[error("The main module '{name}' of branch '{branch}' cannot be found")]
    MissingMainModule { name: String, branch: String },

    /// A recognizer failed on a directory no other recognizer accepted
    #[error("Cannot recognize module in '{path}': {source}")]
    Recognizer { path: PathBuf, source: MakeError },

    /// One or more makers failed to configure their module
    ///
    /// Each failure reads `<unit>: <reason>`.
    #[error("Unable to build because of errors in the build method: {}", failures.join("; "))]
    MakerConfig { failures: Vec<String> },

    /// One or more external references could not be resolved
    #[error("Unable to build {} because files they depend on are missing", failures.join(", "))]
    UnresolvedExternals { failures: Vec<String> },

    /// A unit's output directory overlaps the sources of a module
    #[error(
        "Output directory '{output_dir}' of module '{module}' overlaps the sources of module '{owner}' in '{source_root}'"
    )]
    OutputOverlap {
        module: String,
        output_dir: PathBuf,
        owner: String,
        source_root: PathBuf,
    },

    /// The work queue did not drain
    #[error("Internal: module queue does not become empty after {limit} iterations")]
    QueueOverflow { limit: usize },

    /// Change detection failed
    #[error("Change detection failed for module '{module}': {source}")]
    Inventory {
        module: String,
        source: InventoryError,
    },

    /// Filesystem error
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Dependency resolution errors
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Circular dependency detected
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// A unit was asked for its dependencies before resolution
    #[error("Dependencies of module '{module}' have not been resolved")]
    Unresolved { module: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to remove file
    #[error("Failed to remove file '{path}': {error}")]
    RemoveFile { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Unknown build mode name
    #[error("Unknown build mode '{0}' (expected clean, update or normal)")]
    UnknownMode(String),

    /// Unknown build intent name
    #[error("Unknown build intent '{0}' (expected normal or test)")]
    UnknownIntent(String),
}

/// Build run metadata errors
#[derive(Error, Debug)]
pub enum DetailsError {
    /// Serialization failed
    #[error("Failed to serialize build details: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Filesystem error
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Top-level modbuild error type
#[derive(Error, Debug)]
pub enum ModbuildError {
    /// Discovery error
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Resolver error
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Inventory persistence error
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Build details error
    #[error("Build details error: {0}")]
    Details(#[from] DetailsError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
