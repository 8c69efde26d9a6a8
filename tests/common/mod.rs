//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory holding a source tree under `src/` and
/// the output root under `out/`.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

#[allow(dead_code)]
impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Source root of the project
    pub fn source_root(&self) -> PathBuf {
        self.dir.path().join("src")
    }

    /// Output root of the project
    pub fn output_root(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a module with the given `module.toml` under `src/<name>`
    pub fn module(&self, name: &str, manifest: &str) {
        self.create_file(&format!("src/{name}/module.toml"), manifest);
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run the modbuild binary with the project's source and output roots
    pub fn run(&self, command: &str, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_modbuild"));
        cmd.current_dir(self.path())
            .env("MODBUILD_CONFIG_DIR", self.dir.path().join("config"))
            .env_remove("RUST_LOG")
            .arg(command);
        if command != "clean" {
            cmd.arg("--source").arg(self.source_root());
        }
        cmd.arg("--output").arg(self.output_root());
        cmd.args(args);
        cmd.output().expect("Failed to execute modbuild")
    }

    /// Create the three module chain `app -> lib -> core`
    ///
    /// `core` copies `core.c` into `core.o`, `lib` links it into `lib.a` and
    /// `app` wraps that into `app.bin`.
    pub fn chain(&self) {
        self.create_file("src/core/core.c", "int core;\n");
        self.module("core", CORE_MANIFEST);
        self.module("lib", LIB_MANIFEST);
        self.module("app", APP_MANIFEST);
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Module copying its single source file
#[allow(dead_code)]
pub const CORE_MANIFEST: &str = r#"
[module]
sources = ["core.c"]

[build]
command = "cp core.c $MODBUILD_OUTPUT_DIR/core.o"

[[product]]
name = "core.o"
path = "core.o"
"#;

/// Module consuming `core.o`
#[allow(dead_code)]
pub const LIB_MANIFEST: &str = r#"
[module]
depends = ["core"]

[build]
command = "echo linking lib; cat $MODBUILD_INPUTS > $MODBUILD_OUTPUT_DIR/lib.a"

[[product]]
name = "lib.a"
path = "lib.a"

[[import]]
module = "core"
resource = "core.o"
"#;

/// Module consuming `lib.a`
#[allow(dead_code)]
pub const APP_MANIFEST: &str = r#"
[module]
depends = ["lib"]

[build]
command = "cat $MODBUILD_INPUTS > $MODBUILD_OUTPUT_DIR/app.bin"

[[import]]
module = "lib"
resource = "lib.a"
"#;
