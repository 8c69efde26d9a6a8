//! Core build engine
//!
//! # Submodules
//!
//! - [`unit`] - Build units, build reasons and the unit table
//! - [`unit_list`] - Ordered, duplicate-free unit lists
//! - [`inventory`] - Content inventories for change detection
//! - [`discovery`] - Module catalogue and discovery queue
//! - [`resolver`] - Dependency resolution and cycle detection
//! - [`propagate`] - External references and build reason propagation
//! - [`orchestrator`] - Full build driver
//! - [`details`] - Build run metadata
//! - [`log`] - Build log line sink
//! - [`mode`] - Build mode and intent
//! - [`config`] - User configuration

pub mod config;
pub mod details;
pub mod discovery;
pub mod inventory;
pub mod log;
pub mod mode;
pub mod orchestrator;
pub mod propagate;
pub mod resolver;
pub mod unit;
pub mod unit_list;
