//! Output formatting and progress indicators
//!
//! This module provides the progress bar shown while modules build and
//! helpers for status and error messages.

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::mode::BuildMode;
use crate::core::orchestrator::{BuildListener, BuildOutcome};
use crate::core::unit::{BuildUnit, UnitStatus};

/// Create a progress bar for module builds
pub fn create_build_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} modules ({msg})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░");
    pb.set_style(style);
    pb
}

/// Build listener drawing a progress bar on the terminal
#[derive(Default)]
pub struct ProgressListener {
    quiet: bool,
    bar: Option<ProgressBar>,
}

impl ProgressListener {
    /// Create a listener; a quiet listener draws nothing
    pub fn new(quiet: bool) -> Self {
        Self { quiet, bar: None }
    }
}

impl BuildListener for ProgressListener {
    fn build_started(&mut self, mode: BuildMode, to_build: usize) {
        if self.quiet || to_build == 0 {
            return;
        }
        let bar = create_build_bar(to_build as u64);
        bar.set_message(format!("{mode} build"));
        self.bar = Some(bar);
    }

    fn unit_started(&mut self, unit: &BuildUnit) {
        if let Some(bar) = &self.bar {
            bar.set_message(unit.name().to_string());
        }
    }

    fn unit_completed(&mut self, unit: &BuildUnit) {
        let Some(bar) = &self.bar else {
            return;
        };
        match (unit.status(), unit.build_error()) {
            (UnitStatus::Okay, _) => bar.println(format!("{} {}", status::SUCCESS, unit)),
            (_, Some(error)) => bar.println(format!("{} {}: {}", status::ERROR, unit, error)),
            _ => {}
        }
        bar.inc(1);
    }

    fn build_completed(&mut self, _outcome: &BuildOutcome) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} Error: {}", status::ERROR, error);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}
