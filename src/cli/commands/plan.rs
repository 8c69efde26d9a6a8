//! Plan command implementation
//!
//! Implements `modbuild plan`: prints the build order and the reason each
//! module would be built, without building anything.

use anyhow::{Context, Result};

use crate::cli::output::status;
use crate::core::orchestrator::{BranchBuilder, BuildSettings};
use crate::maker::default_recognizers;

/// Execute the plan command
pub fn execute(settings: BuildSettings, shell: &str) -> Result<bool> {
    let mode = settings.mode;
    let mut builder = BranchBuilder::new(settings, default_recognizers(shell));
    let order = builder
        .create_build_plan()
        .context("Failed to create build plan")?
        .clone();
    let units = builder.units();

    println!("Build order ({mode} mode):");
    let mut to_build = 0;
    for id in &order {
        let unit = &units[id];
        match unit.build_reason() {
            Some(reason) => {
                to_build += 1;
                println!("  {} {:<24} {}", status::INFO, unit.name(), reason);
            }
            None => println!("  {} {:<24} up to date", status::SUCCESS, unit.name()),
        }
    }
    println!("{} of {} modules would be built", to_build, order.len());
    Ok(true)
}
