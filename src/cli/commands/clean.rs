//! Clean command implementation
//!
//! Implements `modbuild clean`, removing the output root with every unit's
//! output, inventory and the build details.

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::output::status;
use crate::infra::filesystem;

/// Execute the clean command
pub fn execute(output_root: &Path) -> Result<bool> {
    if !output_root.exists() {
        println!("{} Nothing to clean", status::SUCCESS);
        return Ok(true);
    }

    filesystem::remove_dir_all(output_root)
        .with_context(|| format!("Failed to clean {}", output_root.display()))?;
    println!("{} Removed {}", status::SUCCESS, output_root.display());
    Ok(true)
}
