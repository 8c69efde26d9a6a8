//! Module discovery
//!
//! Discovery runs in two steps. [`ModuleCatalogue::scan`] walks the source
//! tree once and asks the recognizers which directories are modules. Then
//! [`Discovery::run`] starts at the main module and materializes a unit for
//! every module it transitively depends on, linking direct dependencies and
//! checking each unit's sources against its stored inventory.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use walkdir::WalkDir;

use crate::config::defaults::{INVENTORY_FILE, MAX_QUEUE_ITERATIONS, MODULE_PROPERTIES_FILE};
use crate::core::inventory::ContentInventory;
use crate::core::mode::BuildMode;
use crate::core::orchestrator::BuildSettings;
use crate::core::unit::{reason, UnitId, UnitTable};
use crate::error::DiscoveryError;
use crate::infra::filesystem;
use crate::maker::{find_maker, MakerRecognizer, ModuleMaker};

/// Makers for every module found in the source tree, keyed by module name
#[derive(Debug, Default)]
pub struct ModuleCatalogue {
    makers: BTreeMap<String, Box<dyn ModuleMaker>>,
}

impl ModuleCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find all modules below `root`, up to `max_depth` directory levels deep
    ///
    /// A recognized module directory is not searched any further. Hidden
    /// directories and `skip` (usually the output root) are ignored.
    pub fn scan(
        root: &Path,
        recognizers: &[Box<dyn MakerRecognizer>],
        max_depth: usize,
        skip: Option<&Path>,
    ) -> Result<Self, DiscoveryError> {
        let root = root.canonicalize().map_err(|e| DiscoveryError::SourceRoot {
            path: root.to_path_buf(),
            error: e.to_string(),
        })?;
        let skip = skip.and_then(|p| p.canonicalize().ok());

        let mut catalogue = Self::new();
        let mut walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| DiscoveryError::SourceRoot {
                path: e.path().unwrap_or(&root).to_path_buf(),
                error: e.to_string(),
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden || skip.as_deref() == Some(entry.path()) {
                walker.skip_current_dir();
                continue;
            }
            match find_maker(recognizers, entry.path()) {
                Ok(Some(maker)) => {
                    tracing::debug!(
                        "Found {} module {} in {}",
                        maker.kind(),
                        maker.module_name(),
                        entry.path().display()
                    );
                    catalogue.insert(maker);
                    walker.skip_current_dir();
                }
                Ok(None) => {}
                Err(source) => {
                    return Err(DiscoveryError::Recognizer {
                        path: entry.path().to_path_buf(),
                        source,
                    })
                }
            }
        }
        Ok(catalogue)
    }

    /// Add a maker; the first maker for a module name wins
    pub fn insert(&mut self, maker: Box<dyn ModuleMaker>) -> bool {
        let name = maker.module_name().to_string();
        if let Some(existing) = self.makers.get(&name) {
            tracing::warn!(
                "Ignoring duplicate module {} in {}, already found in {}",
                name,
                maker.source_root().display(),
                existing.source_root().display()
            );
            return false;
        }
        self.makers.insert(name, maker);
        true
    }

    /// Remove and return the maker for a module
    pub fn take(&mut self, name: &str) -> Option<Box<dyn ModuleMaker>> {
        self.makers.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.makers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.makers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.makers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.makers.is_empty()
    }
}

/// Worklist traversal from the main module
#[derive(Debug)]
pub struct Discovery<'a> {
    settings: &'a BuildSettings,
    recognizers: &'a [Box<dyn MakerRecognizer>],
    catalogue: ModuleCatalogue,
    units: UnitTable,
    queue: Vec<UnitId>,
}

impl<'a> Discovery<'a> {
    pub fn new(settings: &'a BuildSettings, recognizers: &'a [Box<dyn MakerRecognizer>]) -> Self {
        Self {
            settings,
            recognizers,
            catalogue: ModuleCatalogue::new(),
            units: UnitTable::new(),
            queue: Vec::new(),
        }
    }

    /// Discover every unit the main module needs
    ///
    /// On error the units created so far stay available through
    /// [`Discovery::into_units`].
    pub fn run(&mut self) -> Result<(), DiscoveryError> {
        let start = Instant::now();
        self.catalogue = ModuleCatalogue::scan(
            &self.settings.source_root,
            self.recognizers,
            self.settings.max_depth,
            Some(&self.settings.output_root),
        )?;
        tracing::info!(
            "Discovered {} buildable modules in branch {} in {:.2?}",
            self.catalogue.len(),
            self.settings.branch,
            start.elapsed()
        );
        self.process_queue()
    }

    /// Run the worklist against an already filled catalogue
    pub fn run_with(&mut self, catalogue: ModuleCatalogue) -> Result<(), DiscoveryError> {
        self.catalogue = catalogue;
        self.process_queue()
    }

    /// The units created so far
    pub fn into_units(self) -> UnitTable {
        self.units
    }

    fn process_queue(&mut self) -> Result<(), DiscoveryError> {
        self.check_output_layout()?;
        let main = &self.settings.main_module;
        if self.queue_source(main)?.is_none() {
            return Err(DiscoveryError::MissingMainModule {
                name: main.clone(),
                branch: self.settings.branch.clone(),
            });
        }

        let mut done = HashSet::new();
        let mut iterations = 0;
        while let Some(id) = self.queue.pop() {
            if !done.insert(id) {
                continue;
            }
            iterations += 1;
            if iterations > MAX_QUEUE_ITERATIONS {
                return Err(DiscoveryError::QueueOverflow {
                    limit: MAX_QUEUE_ITERATIONS,
                });
            }
            self.handle_unit(id)?;
        }

        let failures: Vec<String> = self
            .units
            .iter()
            .filter_map(|u| u.maker_config_error().map(|e| format!("{u}: {e}")))
            .collect();
        if !failures.is_empty() {
            return Err(DiscoveryError::MakerConfig { failures });
        }
        tracing::debug!("Discovery materialized {} units", self.units.len());
        Ok(())
    }

    /// Make sure no unit output directory overlaps the sources of a module
    ///
    /// Output directories are emptied before every build.
    fn check_output_layout(&self) -> Result<(), DiscoveryError> {
        filesystem::create_dir_all(&self.settings.output_root)?;
        let output_root = canonical(&self.settings.output_root);
        let source_roots: Vec<(&str, PathBuf)> = self
            .catalogue
            .makers
            .values()
            .map(|m| (m.module_name(), canonical(m.source_root())))
            .collect();

        for name in self.catalogue.names() {
            let output_dir = output_root.join(name);
            for (owner, source_root) in &source_roots {
                if output_dir.starts_with(source_root) || source_root.starts_with(&output_dir) {
                    tracing::error!(
                        "Output directory {} of {} overlaps the sources of {}",
                        output_dir.display(),
                        name,
                        owner
                    );
                    return Err(DiscoveryError::OutputOverlap {
                        module: name.to_string(),
                        output_dir,
                        owner: (*owner).to_string(),
                        source_root: source_root.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Get the unit for a module, creating and queueing it on first use
    ///
    /// Returns `None` when no module of that name exists.
    fn queue_source(&mut self, name: &str) -> Result<Option<UnitId>, DiscoveryError> {
        if let Some(id) = self.units.id_of(name) {
            return Ok(Some(id));
        }
        let Some(maker) = self.catalogue.take(name) else {
            return Ok(None);
        };

        let output_dir = self.settings.output_root.join(name);
        filesystem::create_dir_all(&output_dir)?;
        let id = self.units.insert(&self.settings.branch, maker, output_dir);
        let unit = &mut self.units[id];

        let properties = unit.source_root().join(MODULE_PROPERTIES_FILE);
        if properties.is_file() {
            if let Err(e) = unit.load_properties(&properties) {
                tracing::error!("{}: {}", unit, e);
                unit.set_maker_config_error(e.to_string());
            }
        }
        if unit.maker_config_error().is_none() {
            if let Err(e) = unit.initialize_maker(self.settings.mode, self.settings.intent) {
                tracing::error!("{}: {}", unit, e);
                unit.set_maker_config_error(e.to_string());
            }
        }
        self.queue.push(id);
        Ok(Some(id))
    }

    fn handle_unit(&mut self, id: UnitId) -> Result<(), DiscoveryError> {
        if self.units[id].maker_config_error().is_some() {
            tracing::debug!("Not following dependencies of misconfigured {}", self.units[id]);
            return Ok(());
        }
        let deps = match self.units[id].maker().direct_dependencies() {
            Ok(deps) => deps,
            Err(e) => {
                tracing::error!("{}: {}", self.units[id], e);
                self.units[id].set_maker_config_error(e.to_string());
                return Ok(());
            }
        };

        for dep in deps {
            match self.queue_source(&dep)? {
                Some(dep_id) => {
                    self.units[id].add_direct_dependency(dep_id);
                }
                None => {
                    let unit = &mut self.units[id];
                    tracing::error!("Missing dependency '{}' for {} not found", dep, unit);
                    unit.set_maker_config_error(format!("missing dependency '{dep}'"));
                    return Ok(());
                }
            }
        }
        self.check_sources(id)
    }

    /// Compare the unit's build sources against its stored inventory
    fn check_sources(&mut self, id: UnitId) -> Result<(), DiscoveryError> {
        let start = Instant::now();
        let unit = &mut self.units[id];
        let root: PathBuf = unit.source_root().to_path_buf();
        let sources = unit.maker().build_sources();
        let module = unit.name().to_string();
        let inventory_error = |source| DiscoveryError::Inventory {
            module: module.clone(),
            source,
        };

        if self.settings.mode == BuildMode::Clean {
            unit.set_build_reason(reason::CLEAN_REQUESTED);
        }

        let inventory_file = unit.output_dir().join(INVENTORY_FILE);
        let inventory = match ContentInventory::load(&inventory_file) {
            None => {
                let inventory =
                    ContentInventory::compute(&root, &sources).map_err(inventory_error)?;
                unit.set_build_reason(reason::NO_PRIOR_STATE);
                inventory
            }
            Some(mut inventory) => {
                let changes = inventory
                    .check_for_changes(&root, &sources)
                    .map_err(inventory_error)?;
                if !changes.is_empty() {
                    for file in changes.iter().take(5) {
                        tracing::debug!("{}: changed {}", unit, file.display());
                    }
                    unit.set_build_reason(reason::SOURCES_CHANGED);
                }
                inventory
            }
        };
        unit.set_inventory(inventory);
        tracing::debug!(
            "Checked {} sources in {:.2?}: {}",
            unit,
            start.elapsed(),
            unit.build_reason().unwrap_or("unchanged")
        );
        Ok(())
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
