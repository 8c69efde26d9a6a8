//! External process execution

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Run `script` with `shell -c` in `cwd`, capturing its output
///
/// The child's stdin is closed. The call blocks until the process exits;
/// bounding its run time is up to the script.
pub fn run_shell(
    shell: &str,
    script: &str,
    cwd: &Path,
    env: &[(String, OsString)],
) -> std::io::Result<Output> {
    tracing::debug!("Running in {}: {} -c {}", cwd.display(), shell, script);
    let mut command = Command::new(shell);
    command
        .arg("-c")
        .arg(script)
        .current_dir(cwd)
        .stdin(Stdio::null());
    for (key, value) in env {
        command.env(key, value);
    }
    command.output()
}
