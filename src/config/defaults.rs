//! Default configuration values

/// Directory levels below the source root searched for modules
pub const MAX_DISCOVERY_DEPTH: usize = 4;

/// Upper bound on work queue iterations during discovery
pub const MAX_QUEUE_ITERATIONS: usize = 1000;

/// Per-unit content inventory file, stored in the unit's output directory
pub const INVENTORY_FILE: &str = ".sources.inventory.json";

/// Build run metadata file, stored in the output root
pub const BUILD_DETAILS_FILE: &str = "build-details.toml";

/// Optional per-module properties file, read from the module's source root
pub const MODULE_PROPERTIES_FILE: &str = "module.properties.toml";

/// Module description file recognized by the command maker
pub const MODULE_MANIFEST_FILE: &str = "module.toml";

/// User configuration file name
pub const CONFIG_FILE: &str = "modbuild.toml";

/// Default output root, relative to the working directory
pub const DEFAULT_OUTPUT_ROOT: &str = "build-output";

/// Default branch identifier
pub const DEFAULT_BRANCH: &str = "default";

/// Default shell used to run module commands
pub const DEFAULT_SHELL: &str = "sh";

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
