//! Build orchestration
//!
//! [`BranchBuilder`] drives one build run over a source tree: discovery,
//! resolution and reason propagation produce the build plan, then every unit
//! that must be built is built in order. A unit whose dependency failed is
//! skipped without asking its maker.

use std::path::PathBuf;
use std::time::Instant;

use crate::config::defaults::{
    BUILD_DETAILS_FILE, DEFAULT_BRANCH, INVENTORY_FILE, MAX_DISCOVERY_DEPTH,
};
use crate::core::details::BuildDetails;
use crate::core::discovery::Discovery;
use crate::core::log::BuildLog;
use crate::core::mode::{BuildIntent, BuildMode};
use crate::core::propagate;
use crate::core::resolver;
use crate::core::unit::{BuildUnit, UnitStatus, UnitTable};
use crate::core::unit_list::UnitList;
use crate::error::{MakeError, ModbuildError};
use crate::infra::filesystem;
use crate::maker::MakerRecognizer;

/// Inputs of one build run
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Root of the source tree scanned for modules
    pub source_root: PathBuf,
    /// Root of all unit output directories
    pub output_root: PathBuf,
    /// Module the run starts from
    pub main_module: String,
    /// Branch or workspace identifier
    pub branch: String,
    pub mode: BuildMode,
    pub intent: BuildIntent,
    /// Source revision stamped into the build details
    pub revision: Option<String>,
    /// Explicit build number
    pub build_number: Option<u32>,
    /// Directory levels searched for modules
    pub max_depth: usize,
}

impl BuildSettings {
    /// Create settings with defaults for everything but the locations
    pub fn new(
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        main_module: impl Into<String>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            main_module: main_module.into(),
            branch: DEFAULT_BRANCH.to_string(),
            mode: BuildMode::default(),
            intent: BuildIntent::default(),
            revision: None,
            build_number: None,
            max_depth: MAX_DISCOVERY_DEPTH,
        }
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_intent(mut self, intent: BuildIntent) -> Self {
        self.intent = intent;
        self
    }

    #[must_use]
    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    #[must_use]
    pub fn with_build_number(mut self, build_number: Option<u32>) -> Self {
        self.build_number = build_number;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Terminal state of a build run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Everything that had to be built was built
    Okay,
    /// Nothing needed building
    Nope,
    /// The plan could not be made or a unit failed to build
    Fail,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Okay => write!(f, "OKAY"),
            Self::Nope => write!(f, "NOPE"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Result of [`BranchBuilder::full_build`]
#[derive(Debug)]
pub struct BuildOutcome {
    pub status: RunStatus,
    /// One line summary
    pub message: String,
    /// Number of units that failed to build
    pub failures: usize,
    /// Number stamped on a successful run
    pub build_number: Option<u32>,
    /// The error that stopped the run before any unit was built
    pub error: Option<ModbuildError>,
}

impl BuildOutcome {
    fn aborted(error: ModbuildError) -> Self {
        Self {
            status: RunStatus::Fail,
            message: error.to_string(),
            failures: 0,
            build_number: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != RunStatus::Fail
    }
}

/// Observer of build progress
pub trait BuildListener {
    /// The plan is made and `to_build` units will be built
    fn build_started(&mut self, _mode: BuildMode, _to_build: usize) {}

    fn unit_started(&mut self, _unit: &BuildUnit) {}

    /// The unit was built, failed or skipped
    fn unit_completed(&mut self, _unit: &BuildUnit) {}

    fn build_completed(&mut self, _outcome: &BuildOutcome) {}
}

/// Driver of one build run
pub struct BranchBuilder<'a> {
    settings: BuildSettings,
    recognizers: Vec<Box<dyn MakerRecognizer>>,
    listener: Option<&'a mut dyn BuildListener>,
    units: UnitTable,
    order: Option<UnitList>,
}

impl std::fmt::Debug for BranchBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchBuilder")
            .field("settings", &self.settings)
            .field("recognizers", &self.recognizers)
            .field("units", &self.units.len())
            .finish_non_exhaustive()
    }
}

impl<'a> BranchBuilder<'a> {
    /// Create a builder using the given recognizers, in order
    pub fn new(settings: BuildSettings, recognizers: Vec<Box<dyn MakerRecognizer>>) -> Self {
        Self {
            settings,
            recognizers,
            listener: None,
            units: UnitTable::new(),
            order: None,
        }
    }

    /// Report progress to `listener`
    #[must_use]
    pub fn with_listener(mut self, listener: &'a mut dyn BuildListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Units of the current run
    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    /// Build order, once planned
    pub fn build_order(&self) -> Option<&UnitList> {
        self.order.as_ref()
    }

    /// Discover, resolve and decide which units must be built
    ///
    /// On failure every dirty unit gets the error as its build error.
    pub fn create_build_plan(&mut self) -> Result<&UnitList, ModbuildError> {
        let mut discovery = Discovery::new(&self.settings, &self.recognizers);
        let discovered = discovery.run();
        self.units = discovery.into_units();

        let planned = match discovered {
            Ok(()) => plan(&mut self.units, self.settings.mode),
            Err(e) => Err(e.into()),
        };
        match planned {
            Ok(order) => {
                tracing::info!("Total modules is {}", order.len());
                let order: &UnitList = self.order.insert(order);
                Ok(order)
            }
            Err(e) => {
                self.units.fail_dirty_units(&e.to_string());
                Err(e)
            }
        }
    }

    /// Run a complete build
    pub fn full_build(&mut self) -> BuildOutcome {
        let start = Instant::now();
        tracing::info!(
            "Building {} of branch {} in {} mode",
            self.settings.main_module,
            self.settings.branch,
            self.settings.mode
        );

        let outcome = self.run();
        tracing::info!("Build finished {} in {:.2?}: {}", outcome.status, start.elapsed(), outcome.message);
        if let Some(listener) = self.listener.as_deref_mut() {
            listener.build_completed(&outcome);
        }
        outcome
    }

    /// Plan and build, replacing the previous run's details
    ///
    /// The old details are removed first, so a failed run leaves none.
    fn run(&mut self) -> BuildOutcome {
        let details_file = self.settings.output_root.join(BUILD_DETAILS_FILE);
        let build_number = BuildDetails::next_build_number(&details_file, self.settings.build_number);
        if let Err(e) = filesystem::remove_file(&details_file) {
            return BuildOutcome::aborted(e.into());
        }

        match self.create_build_plan() {
            Ok(order) => {
                let order = order.clone();
                self.build_planned(&order, build_number)
            }
            Err(e) => {
                tracing::error!("{}", e);
                BuildOutcome::aborted(e)
            }
        }
    }

    fn build_planned(&mut self, order: &UnitList, build_number: u32) -> BuildOutcome {
        let to_build = self.units.compilation_count(order);
        if let Some(listener) = self.listener.as_deref_mut() {
            listener.build_started(self.settings.mode, to_build);
        }

        let failures = if to_build == 0 {
            tracing::info!("All modules are up to date");
            0
        } else {
            self.compile_units(order)
        };

        if let Err(e) = self.persist_inventories(order) {
            return BuildOutcome::aborted(e);
        }
        if failures > 0 {
            return BuildOutcome {
                status: RunStatus::Fail,
                message: format!("{failures} of {to_build} modules failed to build"),
                failures,
                build_number: None,
                error: None,
            };
        }

        let details_file = self.settings.output_root.join(BUILD_DETAILS_FILE);
        let details = BuildDetails::new(build_number, self.settings.revision.clone());
        if let Err(e) = details.store(&details_file) {
            return BuildOutcome::aborted(e.into());
        }

        let (status, message) = if to_build == 0 {
            (RunStatus::Nope, "nothing to build".to_string())
        } else {
            (RunStatus::Okay, format!("built {to_build} modules"))
        };
        BuildOutcome {
            status,
            message,
            failures: 0,
            build_number: Some(build_number),
            error: None,
        }
    }

    /// Build every unit with a build reason, in order
    ///
    /// Returns the number of units whose build failed.
    fn compile_units(&mut self, order: &UnitList) -> usize {
        for id in order {
            if let Some(failed) = self.units.first_failed_dependency(id) {
                let why = format!(
                    "not built because dependency '{}' failed to build",
                    self.units[failed].name()
                );
                let unit = &mut self.units[id];
                tracing::warn!("{}: {}", unit, why);
                unit.set_build_error(why);
                unit.set_status(UnitStatus::None);
                if let Some(listener) = self.listener.as_deref_mut() {
                    listener.unit_completed(unit);
                }
                continue;
            }
            if self.units[id].build_reason().is_none() {
                continue;
            }

            if let Some(listener) = self.listener.as_deref_mut() {
                listener.unit_started(&self.units[id]);
            }
            build_unit(&mut self.units[id]);
            if let Some(listener) = self.listener.as_deref_mut() {
                listener.unit_completed(&self.units[id]);
            }
        }

        order
            .iter()
            .filter(|&id| self.units[id].status() == UnitStatus::Error)
            .count()
    }

    /// Store the inventories of units that are now up to date
    ///
    /// Units that failed or were skipped lose their inventory, so the next
    /// run builds them again.
    fn persist_inventories(&self, order: &UnitList) -> Result<(), ModbuildError> {
        for id in order {
            let unit = &self.units[id];
            let file = unit.output_dir().join(INVENTORY_FILE);
            match unit.inventory() {
                Some(inventory) if unit.build_error().is_none() => inventory.save(&file)?,
                _ => filesystem::remove_file(&file)?,
            }
        }
        Ok(())
    }

    /// Give up the units of this run
    pub fn into_units(self) -> UnitTable {
        self.units
    }
}

fn plan(units: &mut UnitTable, mode: BuildMode) -> Result<UnitList, ModbuildError> {
    propagate::resolve_external_references(units)?;
    let order = resolver::resolve(units)?;
    propagate::determine_units_to_build(units, &order, mode)?;
    Ok(order)
}

fn build_unit(unit: &mut BuildUnit) {
    let start = Instant::now();
    tracing::info!(
        "Building {} ({})",
        unit,
        unit.build_reason().unwrap_or_default()
    );

    let mut log = BuildLog::new(unit.name());
    match run_maker(unit, &mut log) {
        Ok(()) => {
            tracing::info!("Built {} in {:.2?}", unit, start.elapsed());
            unit.set_status(UnitStatus::Okay);
        }
        Err(e) => {
            tracing::error!("{}: {}", unit, e);
            unit.set_build_error(e.to_string());
            unit.set_status(UnitStatus::Error);
        }
    }
    unit.set_build_log(log.finish());
}

fn run_maker(unit: &mut BuildUnit, log: &mut BuildLog) -> Result<(), MakeError> {
    unit.maker_mut().clean()?;
    unit.maker_mut().build_module(log)?;
    generate_products(unit, log)
}

fn generate_products(unit: &BuildUnit, log: &mut BuildLog) -> Result<(), MakeError> {
    let info = unit.info();
    for generated in unit.maker().generated_products() {
        tracing::debug!("{}: generating {}", unit, generated.product().name);
        generated.generate(&info, log)?;
    }
    Ok(())
}
