//! Build command implementation
//!
//! Implements `modbuild build`: plans the run, builds every module with a
//! build reason and reports the outcome.

use anyhow::Result;

use crate::cli::output::{status, ProgressListener};
use crate::core::orchestrator::{BranchBuilder, BuildOutcome, BuildSettings, RunStatus};
use crate::core::unit::{UnitStatus, UnitTable};
use crate::maker::default_recognizers;

/// Execute the build command
///
/// Returns `false` when the run ends in FAIL.
pub fn execute(settings: BuildSettings, shell: &str, quiet: bool) -> Result<bool> {
    tracing::info!(
        "Building {} from {} into {}",
        settings.main_module,
        settings.source_root.display(),
        settings.output_root.display()
    );

    let mut listener = ProgressListener::new(quiet);
    let mut builder =
        BranchBuilder::new(settings, default_recognizers(shell)).with_listener(&mut listener);
    let outcome = builder.full_build();
    let units = builder.into_units();

    report(&outcome, &units, quiet);
    Ok(outcome.is_success())
}

fn report(outcome: &BuildOutcome, units: &UnitTable, quiet: bool) {
    if outcome.status == RunStatus::Fail {
        for unit in units.iter().filter(|u| u.status() == UnitStatus::Error) {
            eprintln!("{} {} failed: {}", status::ERROR, unit, unit.build_error().unwrap_or_default());
            for line in unit.build_log() {
                eprintln!("    {line}");
            }
        }
        for unit in units.iter().filter(|u| u.status() == UnitStatus::None) {
            if let Some(error) = unit.build_error() {
                eprintln!("{} {}: {}", status::WARNING, unit, error);
            }
        }
        eprintln!("{} {}: {}", status::ERROR, outcome.status, outcome.message);
        return;
    }

    if quiet {
        return;
    }
    match outcome.build_number {
        Some(number) => println!(
            "{} {}: {} (build {})",
            status::SUCCESS,
            outcome.status,
            outcome.message,
            number
        ),
        None => println!("{} {}: {}", status::SUCCESS, outcome.status, outcome.message),
    }
}
