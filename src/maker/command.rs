//! Command module maker
//!
//! Builds modules described by a `module.toml` by running their shell
//! commands. Commands run in the module directory and see these variables:
//!
//! - `MODBUILD_MODULE` - module name
//! - `MODBUILD_OUTPUT_DIR` - the unit's output directory
//! - `MODBUILD_SOURCE_DIR` - the module directory
//! - `MODBUILD_INPUTS` - files of the imported products, joined like `PATH`
//! - `MODBUILD_INTENT` - `normal` or `test`
//! - `MODBUILD_PROP_<KEY>` - one per entry of the module's properties file

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::defaults::{INVENTORY_FILE, MODULE_MANIFEST_FILE, MODULE_PROPERTIES_FILE};
use crate::core::log::BuildLog;
use crate::core::mode::{BuildIntent, BuildMode};
use crate::error::MakeError;
use crate::infra::{filesystem, process};
use crate::maker::manifest::ModuleManifest;
use crate::maker::{
    GeneratedProduct, MakerRecognizer, ModuleFileRef, ModuleMaker, Product, UnitInfo, UnitSetup,
};

/// Recognizes directories holding a `module.toml`
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    shell: String,
}

impl CommandRecognizer {
    /// Create a recognizer whose makers run commands with `shell`
    pub fn new(shell: &str) -> Self {
        Self {
            shell: shell.to_string(),
        }
    }
}

impl MakerRecognizer for CommandRecognizer {
    fn name(&self) -> &str {
        "command"
    }

    fn recognize(&self, dir: &Path) -> Result<Option<Box<dyn ModuleMaker>>, MakeError> {
        let file = dir.join(MODULE_MANIFEST_FILE);
        if !file.is_file() {
            return Ok(None);
        }
        let manifest = ModuleManifest::load(dir, &file)?;
        Ok(Some(Box::new(CommandMaker::new(dir, manifest, &self.shell))))
    }
}

/// Post-build step running a `[[generate]]` command
#[derive(Debug, Clone)]
pub struct CommandGenerated {
    product: Product,
    command: String,
    shell: String,
}

impl GeneratedProduct for CommandGenerated {
    fn product(&self) -> &Product {
        &self.product
    }

    fn generate(&self, unit: &UnitInfo<'_>, log: &mut BuildLog) -> Result<(), MakeError> {
        log.line(format!("Generating {}", self.product.name));
        let env = base_env(unit.name, unit.output_dir, unit.source_root);
        run_step(&self.shell, &self.command, unit.name, unit.source_root, &env, log)?;
        if !self.product.file.exists() {
            return Err(MakeError::BuildFailed {
                module: unit.name.to_string(),
                message: format!(
                    "'{}' did not create {}",
                    self.product.name,
                    self.product.file.display()
                ),
            });
        }
        Ok(())
    }
}

/// Maker for one `module.toml` module
#[derive(Debug)]
pub struct CommandMaker {
    name: String,
    source_root: PathBuf,
    manifest: ModuleManifest,
    shell: String,
    output_dir: PathBuf,
    env: Vec<(String, OsString)>,
    exported: Vec<Product>,
    internal: Vec<Product>,
    generated: Vec<CommandGenerated>,
    inputs: Vec<(ModuleFileRef, Product)>,
}

impl CommandMaker {
    pub fn new(dir: &Path, manifest: ModuleManifest, shell: &str) -> Self {
        Self {
            name: manifest.module_name(dir),
            source_root: dir.to_path_buf(),
            manifest,
            shell: shell.to_string(),
            output_dir: PathBuf::new(),
            env: Vec::new(),
            exported: Vec::new(),
            internal: Vec::new(),
            generated: Vec::new(),
            inputs: Vec::new(),
        }
    }

    fn config_error(&self, message: String) -> MakeError {
        MakeError::Config {
            module: self.name.clone(),
            message,
        }
    }

    /// Environment for the build command
    fn build_env(&self) -> Result<Vec<(String, OsString)>, MakeError> {
        let mut env = self.env.clone();
        let files = self.inputs.iter().map(|(_, product)| product.file.as_os_str());
        let inputs = std::env::join_paths(files).map_err(|e| MakeError::BuildFailed {
            module: self.name.clone(),
            message: format!("cannot pass inputs: {e}"),
        })?;
        env.push(("MODBUILD_INPUTS".to_string(), inputs));
        Ok(env)
    }
}

impl ModuleMaker for CommandMaker {
    fn module_name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "command"
    }

    fn source_root(&self) -> &Path {
        &self.source_root
    }

    fn build_sources(&self) -> BTreeSet<String> {
        let mut sources: BTreeSet<String> = self.manifest.module.sources.iter().cloned().collect();
        sources.insert(MODULE_MANIFEST_FILE.to_string());
        sources.insert(MODULE_PROPERTIES_FILE.to_string());
        sources
    }

    fn initialize(
        &mut self,
        unit: &mut UnitSetup<'_>,
        mode: BuildMode,
        intent: BuildIntent,
    ) -> Result<(), MakeError> {
        if mode == BuildMode::Update {
            // Pick up edits made since the tree was scanned
            let file = self.source_root.join(MODULE_MANIFEST_FILE);
            let manifest = ModuleManifest::load(&self.source_root, &file)?;
            if manifest.module_name(&self.source_root) != self.name {
                return Err(self.config_error("module was renamed during the run".to_string()));
            }
            self.manifest = manifest;
        }

        self.output_dir = unit.output_dir().to_path_buf();
        self.env = base_env(&self.name, &self.output_dir, &self.source_root);
        self.env
            .push(("MODBUILD_INTENT".to_string(), intent.to_string().into()));
        for (key, value) in unit.properties() {
            self.env.push((property_var(key), value.into()));
        }

        self.exported.clear();
        self.internal.clear();
        for decl in &self.manifest.products {
            let product = Product::new(&decl.name, self.output_dir.join(&decl.path));
            if decl.exported {
                self.exported.push(product);
            } else {
                self.internal.push(product);
            }
        }
        self.generated = self
            .manifest
            .generated
            .iter()
            .map(|decl| CommandGenerated {
                product: Product::new(&decl.name, self.output_dir.join(&decl.path)),
                command: decl.command.clone(),
                shell: self.shell.clone(),
            })
            .collect();

        for import in &self.manifest.imports {
            unit.add_external_reference(&import.module, &import.resource);
        }
        Ok(())
    }

    fn direct_dependencies(&self) -> Result<Vec<String>, MakeError> {
        Ok(self.manifest.module.depends.clone())
    }

    fn must_be_built(&self) -> Option<String> {
        let missing: Vec<&str> = self
            .generated
            .iter()
            .filter(|g| !g.product.file.exists())
            .map(|g| g.product.name.as_str())
            .collect();
        if missing.is_empty() {
            None
        } else {
            Some(format!("missing {}", missing.join(", ")))
        }
    }

    fn exported_products(&self) -> Vec<Product> {
        self.exported.clone()
    }

    fn generated_products(&self) -> Vec<&dyn GeneratedProduct> {
        self.generated
            .iter()
            .map(|g| g as &dyn GeneratedProduct)
            .collect()
    }

    fn resolve_exported_resource(
        &mut self,
        requesting_module: &str,
        resource: &str,
    ) -> Result<Option<Product>, MakeError> {
        if let Some(product) = self.exported.iter().find(|p| p.name == resource) {
            return Ok(Some(product.clone()));
        }
        if let Some(generated) = self.generated.iter().find(|g| g.product.name == resource) {
            return Ok(Some(generated.product.clone()));
        }
        if let Some(pos) = self.internal.iter().position(|p| p.name == resource) {
            let product = self.internal.remove(pos);
            tracing::warn!(
                "Module {} uses internal product {} of {}; exporting it",
                requesting_module,
                resource,
                self.name
            );
            self.exported.push(product.clone());
            return Ok(Some(product));
        }
        Ok(None)
    }

    fn add_resolved_external(
        &mut self,
        reference: &ModuleFileRef,
        product: Product,
    ) -> Result<(), MakeError> {
        if !self.inputs.iter().any(|(r, _)| r == reference) {
            self.inputs.push((reference.clone(), product));
        }
        Ok(())
    }

    fn build_module(&mut self, log: &mut BuildLog) -> Result<(), MakeError> {
        let Some(command) = self.manifest.build.command.clone() else {
            log.line(format!("{} has no build command", self.name));
            return Ok(());
        };
        let env = self.build_env()?;
        run_step(&self.shell, &command, &self.name, &self.source_root, &env, log)
    }

    fn clean(&mut self) -> Result<(), MakeError> {
        filesystem::clear_dir_except(&self.output_dir, &[INVENTORY_FILE]).map_err(|e| {
            MakeError::Io {
                path: self.output_dir.clone(),
                error: e.to_string(),
            }
        })
    }
}

fn base_env(name: &str, output_dir: &Path, source_root: &Path) -> Vec<(String, OsString)> {
    vec![
        ("MODBUILD_MODULE".to_string(), name.into()),
        ("MODBUILD_OUTPUT_DIR".to_string(), output_dir.as_os_str().to_owned()),
        ("MODBUILD_SOURCE_DIR".to_string(), source_root.as_os_str().to_owned()),
    ]
}

/// Environment variable name for a module property
fn property_var(key: &str) -> String {
    let key: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("MODBUILD_PROP_{key}")
}

/// Run one command, copying its output into the log
fn run_step(
    shell: &str,
    command: &str,
    module: &str,
    cwd: &Path,
    env: &[(String, OsString)],
    log: &mut BuildLog,
) -> Result<(), MakeError> {
    let output = process::run_shell(shell, command, cwd, env).map_err(|e| MakeError::Io {
        path: cwd.to_path_buf(),
        error: format!("cannot run {shell}: {e}"),
    })?;
    log.append_output(&output.stdout);
    log.append_output(&output.stderr);
    if output.status.success() {
        Ok(())
    } else {
        Err(MakeError::BuildFailed {
            module: module.to_string(),
            message: format!("command failed with {}", output.status),
        })
    }
}
