//! Modbuild - Incremental multi-module build orchestrator
//!
//! This library discovers the modules of a source tree, resolves their
//! dependencies into a build order and rebuilds only the modules whose
//! inputs changed, or that depend on a module being rebuilt.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Build engine: discovery, resolution, propagation, orchestration
//! - [`maker`] - Module maker contract and the command-driven maker
//! - [`infra`] - Infrastructure layer (filesystem, directories, processes)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod maker;

#[cfg(test)]
pub mod test_utils;
