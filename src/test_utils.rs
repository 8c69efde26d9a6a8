//! Test utilities
//!
//! Scripted makers for engine tests and generators for proptest.

#[cfg(test)]
pub mod fakes {
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use crate::core::log::BuildLog;
    use crate::core::mode::{BuildIntent, BuildMode};
    use crate::error::MakeError;
    use crate::maker::{
        GeneratedProduct, MakerRecognizer, ModuleFileRef, ModuleMaker, Product, UnitInfo,
        UnitSetup,
    };

    /// Something a fake maker was asked to do
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum FakeEvent {
        Built(String),
        Cleaned(String),
        Generated(String),
        Resolved { module: String, reference: String },
    }

    /// Event log shared between clones of fake makers
    #[derive(Debug, Clone, Default)]
    pub struct BuildRecord(Rc<RefCell<Vec<FakeEvent>>>);

    impl BuildRecord {
        pub fn new() -> Self {
            Self::default()
        }

        fn push(&self, event: FakeEvent) {
            self.0.borrow_mut().push(event);
        }

        pub fn events(&self) -> Vec<FakeEvent> {
            self.0.borrow().clone()
        }

        /// Names of built modules in build order
        pub fn built(&self) -> Vec<String> {
            self.0
                .borrow()
                .iter()
                .filter_map(|e| match e {
                    FakeEvent::Built(name) => Some(name.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Names of cleaned modules
        pub fn cleaned(&self) -> Vec<String> {
            self.0
                .borrow()
                .iter()
                .filter_map(|e| match e {
                    FakeEvent::Cleaned(name) => Some(name.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            self.0.borrow_mut().clear();
        }
    }

    /// Generated product that writes a marker file into the output directory
    #[derive(Debug, Clone)]
    pub struct FakeGenerated {
        product: Product,
        record: BuildRecord,
    }

    impl GeneratedProduct for FakeGenerated {
        fn product(&self) -> &Product {
            &self.product
        }

        fn generate(&self, unit: &UnitInfo<'_>, log: &mut BuildLog) -> Result<(), MakeError> {
            let path = unit.output_dir.join(&self.product.file);
            std::fs::write(&path, unit.name).map_err(|e| MakeError::Io {
                path: path.clone(),
                error: e.to_string(),
            })?;
            log.line(format!("generated {}", self.product.name));
            self.record.push(FakeEvent::Generated(self.product.name.clone()));
            Ok(())
        }
    }

    /// Scripted module maker
    #[derive(Debug, Clone)]
    pub struct FakeMaker {
        name: String,
        source_root: PathBuf,
        sources: BTreeSet<String>,
        deps: Vec<String>,
        dep_error: Option<String>,
        init_error: Option<String>,
        build_error: Option<String>,
        must_build: Option<String>,
        exported: Vec<Product>,
        internal: Vec<Product>,
        generated: Vec<FakeGenerated>,
        imports: Vec<(String, String)>,
        resolved: Vec<(ModuleFileRef, Product)>,
        record: BuildRecord,
    }

    impl FakeMaker {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                source_root: PathBuf::from("/src").join(name),
                sources: BTreeSet::new(),
                deps: Vec::new(),
                dep_error: None,
                init_error: None,
                build_error: None,
                must_build: None,
                exported: Vec::new(),
                internal: Vec::new(),
                generated: Vec::new(),
                imports: Vec::new(),
                resolved: Vec::new(),
                record: BuildRecord::default(),
            }
        }

        pub fn at(mut self, root: &Path) -> Self {
            self.source_root = root.to_path_buf();
            self
        }

        pub fn sources(mut self, sources: &[&str]) -> Self {
            self.sources = sources.iter().map(|s| (*s).to_string()).collect();
            self
        }

        pub fn depends_on(mut self, deps: &[&str]) -> Self {
            self.deps = deps.iter().map(|d| (*d).to_string()).collect();
            self
        }

        pub fn failing_dependencies(mut self, message: &str) -> Self {
            self.dep_error = Some(message.to_string());
            self
        }

        pub fn failing_init(mut self, message: &str) -> Self {
            self.init_error = Some(message.to_string());
            self
        }

        pub fn failing_build(mut self, message: &str) -> Self {
            self.build_error = Some(message.to_string());
            self
        }

        pub fn must_build(mut self, reason: &str) -> Self {
            self.must_build = Some(reason.to_string());
            self
        }

        pub fn exporting(mut self, name: &str, file: impl Into<PathBuf>) -> Self {
            self.exported.push(Product::new(name, file));
            self
        }

        pub fn internal(mut self, name: &str, file: impl Into<PathBuf>) -> Self {
            self.internal.push(Product::new(name, file));
            self
        }

        pub fn generating(mut self, name: &str) -> Self {
            self.generated.push(FakeGenerated {
                product: Product::new(name, name),
                record: self.record.clone(),
            });
            self
        }

        pub fn importing(mut self, module: &str, resource: &str) -> Self {
            self.imports.push((module.to_string(), resource.to_string()));
            self
        }

        /// Share an event log with other makers
        pub fn recording(mut self, record: &BuildRecord) -> Self {
            self.record = record.clone();
            for generated in &mut self.generated {
                generated.record = record.clone();
            }
            self
        }
    }

    impl ModuleMaker for FakeMaker {
        fn module_name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> &str {
            "fake"
        }

        fn source_root(&self) -> &Path {
            &self.source_root
        }

        fn build_sources(&self) -> BTreeSet<String> {
            self.sources.clone()
        }

        fn initialize(
            &mut self,
            unit: &mut UnitSetup<'_>,
            _mode: BuildMode,
            _intent: BuildIntent,
        ) -> Result<(), MakeError> {
            if let Some(message) = &self.init_error {
                return Err(MakeError::Config {
                    module: self.name.clone(),
                    message: message.clone(),
                });
            }
            for (module, resource) in &self.imports {
                unit.add_external_reference(module, resource);
            }
            Ok(())
        }

        fn direct_dependencies(&self) -> Result<Vec<String>, MakeError> {
            match &self.dep_error {
                Some(message) => Err(MakeError::Config {
                    module: self.name.clone(),
                    message: message.clone(),
                }),
                None => Ok(self.deps.clone()),
            }
        }

        fn must_be_built(&self) -> Option<String> {
            self.must_build.clone()
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
            if let Some(g) = self.generated.iter().find(|g| g.product.name == resource) {
                return Ok(Some(g.product.clone()));
            }
            if let Some(pos) = self.internal.iter().position(|p| p.name == resource) {
                let product = self.internal.remove(pos);
                tracing::warn!(
                    "Exporting internal product {} of {} for {}",
                    resource,
                    self.name,
                    requesting_module
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
            self.record.push(FakeEvent::Resolved {
                module: self.name.clone(),
                reference: reference.to_string(),
            });
            self.resolved.push((reference.clone(), product));
            Ok(())
        }

        fn build_module(&mut self, log: &mut BuildLog) -> Result<(), MakeError> {
            self.record.push(FakeEvent::Built(self.name.clone()));
            log.line(format!("building {}", self.name));
            match &self.build_error {
                Some(message) => {
                    log.line(format!("error: {message}"));
                    Err(MakeError::BuildFailed {
                        module: self.name.clone(),
                        message: message.clone(),
                    })
                }
                None => Ok(()),
            }
        }

        fn clean(&mut self) -> Result<(), MakeError> {
            self.record.push(FakeEvent::Cleaned(self.name.clone()));
            Ok(())
        }
    }

    #[derive(Debug)]
    enum Script {
        Accept(FakeMaker),
        Reject,
        Fail(String),
        ByDirName(Vec<FakeMaker>),
    }

    /// Scripted recognizer
    #[derive(Debug)]
    pub struct FakeRecognizer(Script);

    impl FakeRecognizer {
        /// Recognize every directory as `maker`
        pub fn accepting(maker: FakeMaker) -> Self {
            Self(Script::Accept(maker))
        }

        pub fn rejecting() -> Self {
            Self(Script::Reject)
        }

        pub fn failing(message: &str) -> Self {
            Self(Script::Fail(message.to_string()))
        }

        /// Recognize directories named after one of `makers`
        ///
        /// The returned maker's source root is the recognized directory.
        pub fn by_dir_name(makers: Vec<FakeMaker>) -> Self {
            Self(Script::ByDirName(makers))
        }
    }

    impl MakerRecognizer for FakeRecognizer {
        fn name(&self) -> &str {
            "fake"
        }

        fn recognize(&self, dir: &Path) -> Result<Option<Box<dyn ModuleMaker>>, MakeError> {
            match &self.0 {
                Script::Accept(maker) => Ok(Some(Box::new(maker.clone()))),
                Script::Reject => Ok(None),
                Script::Fail(message) => Err(MakeError::Config {
                    module: dir.display().to_string(),
                    message: message.clone(),
                }),
                Script::ByDirName(makers) => {
                    let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()) else {
                        return Ok(None);
                    };
                    Ok(makers
                        .iter()
                        .find(|m| m.name == dir_name)
                        .map(|m| Box::new(m.clone().at(dir)) as Box<dyn ModuleMaker>))
                }
            }
        }
    }
}

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid module name
    pub fn module_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,15}"
    }

    /// Generate a random DAG as adjacency lists
    ///
    /// Node `i` only depends on nodes with a smaller index.
    pub fn dag(max_nodes: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
        prop::collection::vec(
            prop::collection::vec(any::<prop::sample::Index>(), 0..4),
            1..max_nodes,
        )
        .prop_map(|raw| {
            raw.iter()
                .enumerate()
                .map(|(i, picks)| {
                    let mut deps: Vec<usize> = Vec::new();
                    if i > 0 {
                        for pick in picks {
                            let dep = pick.index(i);
                            if !deps.contains(&dep) {
                                deps.push(dep);
                            }
                        }
                    }
                    deps
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_module_name_generator(name in module_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().next().is_some_and(|c| c.is_ascii_lowercase()));
        }

        #[test]
        fn test_dag_generator_points_backwards(graph in dag(12)) {
            for (i, deps) in graph.iter().enumerate() {
                for &dep in deps {
                    prop_assert!(dep < i);
                }
            }
        }
    }
}
