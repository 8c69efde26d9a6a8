//! Build units
//!
//! A [`BuildUnit`] is the per-run state of one module: its maker, its
//! dependency edges and the decisions taken about it. Units live in a
//! [`UnitTable`] arena and refer to each other by [`UnitId`]; only forward
//! (dependency) edges are stored.

use std::collections::{BTreeMap, HashMap};
use std::ops::{Index, IndexMut};
use std::path::{Path, PathBuf};

use crate::core::inventory::ContentInventory;
use crate::core::mode::{BuildIntent, BuildMode};
use crate::core::unit_list::UnitList;
use crate::error::{ConfigError, MakeError};
use crate::maker::{ModuleFileRef, ModuleMaker, UnitInfo, UnitSetup};

/// Standard build reasons
pub mod reason {
    /// The unit has no stored inventory
    pub const NO_PRIOR_STATE: &str = "no prior state known";
    /// The unit's inventory shows changes
    pub const SOURCES_CHANGED: &str = "sources have changed";
    /// The run was started in clean mode
    pub const CLEAN_REQUESTED: &str = "clean build requested";
    /// A transitive dependency will be rebuilt
    pub const DEPENDENCY_REBUILT: &str = "a dependency will be rebuilt";
}

/// Index of a unit in its [`UnitTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

/// Why a unit will be rebuilt; once set it never changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReason(Option<String>);

impl BuildReason {
    /// Set the reason if none is set yet
    ///
    /// Returns `true` if this call set it.
    pub fn set(&mut self, reason: impl Into<String>) -> bool {
        if self.0.is_some() {
            return false;
        }
        self.0 = Some(reason.into());
        true
    }

    /// The reason, if any
    pub fn get(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Whether a reason is set
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

/// Build status of a unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnitStatus {
    /// Not built (yet)
    #[default]
    None,
    /// Built successfully
    Okay,
    /// Build failed
    Error,
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Okay => write!(f, "ok"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Per-run state of one module
#[derive(Debug)]
pub struct BuildUnit {
    id: UnitId,
    branch: String,
    name: String,
    maker: Box<dyn ModuleMaker>,
    output_dir: PathBuf,
    properties: BTreeMap<String, String>,
    direct_dependencies: Vec<UnitId>,
    full_dependencies: Option<UnitList>,
    external_references: Vec<ModuleFileRef>,
    inventory: Option<ContentInventory>,
    build_reason: BuildReason,
    dirty: bool,
    status: UnitStatus,
    build_error: Option<String>,
    maker_config_error: Option<String>,
    build_log: Vec<String>,
}

impl BuildUnit {
    fn new(id: UnitId, branch: &str, maker: Box<dyn ModuleMaker>, output_dir: PathBuf) -> Self {
        Self {
            id,
            branch: branch.to_string(),
            name: maker.module_name().to_string(),
            maker,
            output_dir,
            properties: BTreeMap::new(),
            direct_dependencies: Vec::new(),
            full_dependencies: None,
            external_references: Vec::new(),
            inventory: None,
            build_reason: BuildReason::default(),
            dirty: false,
            status: UnitStatus::None,
            build_error: None,
            maker_config_error: None,
            build_log: Vec::new(),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn maker(&self) -> &dyn ModuleMaker {
        self.maker.as_ref()
    }

    pub fn maker_mut(&mut self) -> &mut dyn ModuleMaker {
        self.maker.as_mut()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn source_root(&self) -> &Path {
        self.maker.source_root()
    }

    /// Read-only view handed to product generators
    pub fn info(&self) -> UnitInfo<'_> {
        UnitInfo {
            name: &self.name,
            output_dir: &self.output_dir,
            source_root: self.maker.source_root(),
        }
    }

    /// Load the optional per-module properties file
    pub fn load_properties(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let table: toml::Table = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                other => other.to_string(),
            };
            self.properties.insert(key, value);
        }
        Ok(())
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Let the maker read its module description
    pub(crate) fn initialize_maker(
        &mut self,
        mode: BuildMode,
        intent: BuildIntent,
    ) -> Result<(), MakeError> {
        let Self {
            name,
            maker,
            output_dir,
            properties,
            external_references,
            ..
        } = self;
        let mut setup = UnitSetup::new(name, output_dir, properties, external_references);
        maker.initialize(&mut setup, mode, intent)
    }

    pub fn direct_dependencies(&self) -> &[UnitId] {
        &self.direct_dependencies
    }

    /// Link a direct dependency; linking the same unit twice has no effect
    ///
    /// Edges are frozen once the full dependency list is computed.
    pub fn add_direct_dependency(&mut self, id: UnitId) -> bool {
        if self.full_dependencies.is_some() {
            debug_assert!(false, "dependency added to resolved unit '{}'", self.name);
            return false;
        }
        if self.direct_dependencies.contains(&id) {
            return false;
        }
        self.direct_dependencies.push(id);
        true
    }

    /// Transitive dependencies in build order, once resolved
    pub fn full_dependencies(&self) -> Option<&UnitList> {
        self.full_dependencies.as_ref()
    }

    pub(crate) fn set_full_dependencies(&mut self, list: UnitList) {
        debug_assert!(self.full_dependencies.is_none());
        self.full_dependencies = Some(list);
    }

    pub fn external_references(&self) -> &[ModuleFileRef] {
        &self.external_references
    }

    pub fn build_reason(&self) -> Option<&str> {
        self.build_reason.get()
    }

    /// Mark the unit for rebuild; the first reason wins
    pub fn set_build_reason(&mut self, reason: impl Into<String>) -> bool {
        self.dirty = true;
        self.build_reason.set(reason)
    }

    /// Whether anything implying a rebuild has happened to this unit
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    pub fn set_status(&mut self, status: UnitStatus) {
        self.status = status;
    }

    pub fn build_error(&self) -> Option<&str> {
        self.build_error.as_deref()
    }

    pub fn set_build_error(&mut self, error: impl Into<String>) {
        self.build_error = Some(error.into());
        self.dirty = true;
    }

    pub fn maker_config_error(&self) -> Option<&str> {
        self.maker_config_error.as_deref()
    }

    pub fn set_maker_config_error(&mut self, error: impl Into<String>) {
        self.maker_config_error = Some(error.into());
        self.dirty = true;
    }

    /// Inventory computed during discovery, pending persistence
    pub fn inventory(&self) -> Option<&ContentInventory> {
        self.inventory.as_ref()
    }

    pub(crate) fn set_inventory(&mut self, inventory: ContentInventory) {
        self.inventory = Some(inventory);
    }

    /// Output captured while building this unit
    pub fn build_log(&self) -> &[String] {
        &self.build_log
    }

    pub(crate) fn set_build_log(&mut self, lines: Vec<String>) {
        self.build_log = lines;
    }
}

impl std::fmt::Display for BuildUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.branch)
    }
}

/// Arena of all units of one build run
#[derive(Debug, Default)]
pub struct UnitTable {
    units: Vec<BuildUnit>,
    by_name: HashMap<String, UnitId>,
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a unit for `maker`, keyed by its module name
    pub fn insert(&mut self, branch: &str, maker: Box<dyn ModuleMaker>, output_dir: PathBuf) -> UnitId {
        let id = UnitId(self.units.len());
        let unit = BuildUnit::new(id, branch, maker, output_dir);
        self.by_name.insert(unit.name.clone(), id);
        self.units.push(unit);
        id
    }

    pub fn id_of(&self, name: &str) -> Option<UnitId> {
        self.by_name.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&BuildUnit> {
        self.id_of(name).map(|id| &self[id])
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units in creation order
    pub fn iter(&self) -> impl Iterator<Item = &BuildUnit> {
        self.units.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = UnitId> {
        (0..self.units.len()).map(UnitId)
    }

    /// Module names of the units in `list`, in order
    pub fn names(&self, list: &UnitList) -> Vec<String> {
        list.iter().map(|id| self[id].name.clone()).collect()
    }

    /// Number of units in `list` that have a build reason
    pub fn compilation_count(&self, list: &UnitList) -> usize {
        list.iter()
            .filter(|&id| self[id].build_reason().is_some())
            .count()
    }

    /// First transitive dependency of `id` that carries a build error
    pub fn first_failed_dependency(&self, id: UnitId) -> Option<UnitId> {
        self[id]
            .full_dependencies()?
            .iter()
            .find(|&dep| self[dep].build_error().is_some())
    }

    /// Give every dirty unit without an error the run's fatal error
    pub fn fail_dirty_units(&mut self, why: &str) {
        for unit in &mut self.units {
            if unit.is_dirty() && unit.build_error.is_none() {
                unit.set_build_error(why);
            }
        }
    }
}

impl Index<UnitId> for UnitTable {
    type Output = BuildUnit;

    fn index(&self, id: UnitId) -> &BuildUnit {
        &self.units[id.0]
    }
}

impl IndexMut<UnitId> for UnitTable {
    fn index_mut(&mut self, id: UnitId) -> &mut BuildUnit {
        &mut self.units[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fakes::FakeMaker;
    use tempfile::TempDir;

    fn table_with(names: &[&str]) -> UnitTable {
        let mut table = UnitTable::new();
        for name in names {
            table.insert("main", Box::new(FakeMaker::new(name)), PathBuf::from("/out").join(name));
        }
        table
    }

    #[test]
    fn test_first_build_reason_wins() {
        let mut reason = BuildReason::default();
        assert!(!reason.is_set());
        assert!(reason.set("sources have changed"));
        assert!(!reason.set("clean build requested"));
        assert_eq!(reason.get(), Some("sources have changed"));
    }

    #[test]
    fn test_set_build_reason_marks_dirty() {
        let mut table = table_with(&["core"]);
        let unit = &mut table[UnitId(0)];
        assert!(!unit.is_dirty());
        unit.set_build_reason(reason::NO_PRIOR_STATE);
        unit.set_build_reason(reason::DEPENDENCY_REBUILT);
        assert!(unit.is_dirty());
        assert_eq!(unit.build_reason(), Some(reason::NO_PRIOR_STATE));
    }

    #[test]
    fn test_build_error_implies_dirty() {
        let mut table = table_with(&["core"]);
        let unit = &mut table[UnitId(0)];
        unit.set_build_error("boom");
        assert!(unit.is_dirty());
        assert_eq!(unit.build_error(), Some("boom"));
    }

    #[test]
    fn test_direct_dependencies_are_a_set() {
        let mut table = table_with(&["app", "lib"]);
        let lib = table.id_of("lib").unwrap();
        let app = &mut table[UnitId(0)];
        assert!(app.add_direct_dependency(lib));
        assert!(!app.add_direct_dependency(lib));
        assert_eq!(app.direct_dependencies(), &[lib]);
    }

    #[test]
    fn test_display_includes_branch() {
        let table = table_with(&["core"]);
        assert_eq!(table[UnitId(0)].to_string(), "core@main");
        assert_eq!(table.by_name("core").unwrap().id(), UnitId(0));
    }

    #[test]
    fn test_compilation_count_and_failed_dependency() {
        let mut table = table_with(&["core", "lib", "app"]);
        let (core, lib, app) = (UnitId(0), UnitId(1), UnitId(2));
        table[lib].set_full_dependencies(UnitList::new());
        let mut deps = UnitList::new();
        deps.add_all([core, lib]);
        table[app].set_full_dependencies(deps);
        table[core].set_full_dependencies(UnitList::new());

        let mut order = UnitList::new();
        order.add_all([core, lib, app]);
        assert_eq!(table.compilation_count(&order), 0);
        table[lib].set_build_reason(reason::SOURCES_CHANGED);
        assert_eq!(table.compilation_count(&order), 1);

        assert_eq!(table.first_failed_dependency(app), None);
        table[lib].set_build_error("failed");
        assert_eq!(table.first_failed_dependency(app), Some(lib));
        assert_eq!(table.first_failed_dependency(core), None);
        assert_eq!(table.names(&order), vec!["core", "lib", "app"]);
    }

    #[test]
    fn test_fail_dirty_units_only_touches_dirty() {
        let mut table = table_with(&["core", "lib"]);
        table[UnitId(0)].set_build_reason(reason::NO_PRIOR_STATE);
        table.fail_dirty_units("discovery failed");
        assert_eq!(table[UnitId(0)].build_error(), Some("discovery failed"));
        assert_eq!(table[UnitId(1)].build_error(), None);
    }

    #[test]
    fn test_load_properties() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("module.properties.toml");
        std::fs::write(&file, "encoding = \"utf-8\"\nlevel = 3\n").unwrap();

        let mut table = table_with(&["core"]);
        let unit = &mut table[UnitId(0)];
        unit.load_properties(&file).unwrap();
        assert_eq!(unit.property("encoding"), Some("utf-8"));
        assert_eq!(unit.property("level"), Some("3"));
        assert_eq!(unit.property("missing"), None);

        std::fs::write(&file, "not = [valid").unwrap();
        assert!(matches!(unit.load_properties(&file), Err(ConfigError::Parse { .. })));
    }
}
