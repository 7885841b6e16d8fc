//! Code Generation
//!
//! Compiles registry definitions into Python modules.
//!
//! Architecture:
//! - RegistryIndex: built once per [`Compiler`], read-only afterwards
//! - TypeMapper / resolver: pure functions of (definition, index, config)
//! - Emitters (`python`): turn resolved fields into module text
//!
//! Every definition compiles independently. A batch of one kind can run on a
//! pool of scoped worker threads; results are ordered by definition name
//! before they leave the compiler, so output never depends on scheduling.

pub mod imports;
pub mod names;
pub mod python;
pub mod relations;
pub mod types;
pub mod writer;

use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Mutex;
use std::time::Instant;

use tracing::{debug, info, warn, Level};

use crate::checksum::Checksum;
use crate::config::CompileConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{CompileError, Result};
use crate::registry::{Registry, RegistryIndex};
use crate::schema::DefinitionKind;

use types::TypeMapper;

// =============================================================================
// Generated Output
// =============================================================================

/// One generated Python module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub kind: DefinitionKind,
    /// Definition name
    pub name: String,
    pub content: String,
    pub checksum: Checksum,
    pub diagnostics: Diagnostics,
}

impl GeneratedFile {
    /// Path relative to the package root (`models/contact_info.py`)
    pub fn path(&self) -> String {
        format!("{}/{}.py", self.kind.dir_name(), names::module_name(&self.name))
    }
}

/// Every generated module of one kind, keyed by definition name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledKind {
    pub kind: DefinitionKind,
    pub files: BTreeMap<String, GeneratedFile>,
}

impl CompiledKind {
    /// Contents keyed by definition name, as handed to an [`ArtifactWriter`]
    pub fn contents(&self) -> BTreeMap<String, Vec<u8>> {
        self.files
            .iter()
            .map(|(name, file)| (name.clone(), file.content.clone().into_bytes()))
            .collect()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let mut all = Diagnostics::new();
        for file in self.files.values() {
            all.merge(file.diagnostics.clone());
        }
        all
    }

    pub fn checksum(&self) -> Checksum {
        Checksum::combine(self.files.iter().map(|(name, f)| (name.as_str(), &f.checksum)))
    }
}

/// Output of [`Compiler::compile_all`], one entry per kind in compilation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRegistry {
    pub kinds: Vec<CompiledKind>,
}

impl CompiledRegistry {
    pub fn file(&self, kind: DefinitionKind, name: &str) -> Option<&GeneratedFile> {
        self.kinds
            .iter()
            .find(|k| k.kind == kind)
            .and_then(|k| k.files.get(name))
    }

    pub fn files(&self) -> impl Iterator<Item = &GeneratedFile> {
        self.kinds.iter().flat_map(|k| k.files.values())
    }

    /// Single checksum over every generated file
    pub fn fingerprint(&self) -> Checksum {
        let paths: Vec<(String, &Checksum)> = self.files().map(|f| (f.path(), &f.checksum)).collect();
        Checksum::combine(paths.iter().map(|(path, checksum)| (path.as_str(), *checksum)))
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let mut all = Diagnostics::new();
        for kind in &self.kinds {
            all.merge(kind.diagnostics());
        }
        all
    }

    pub fn len(&self) -> usize {
        self.kinds.iter().map(|k| k.files.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Summary of [`Compiler::compile_into`]
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub files_written: usize,
    pub fingerprint: Checksum,
    pub diagnostics: Diagnostics,
}

// =============================================================================
// Artifact Writers
// =============================================================================

/// Destination for generated modules, one call per kind
pub trait ArtifactWriter {
    fn write_kind(
        &mut self,
        kind: DefinitionKind,
        files: BTreeMap<String, Vec<u8>>,
    ) -> std::result::Result<(), Box<dyn Error + Send + Sync>>;
}

/// Keeps generated modules in memory
#[derive(Debug, Default)]
pub struct MemoryWriter {
    files: BTreeMap<DefinitionKind, BTreeMap<String, Vec<u8>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: DefinitionKind, name: &str) -> Option<&[u8]> {
        self.files.get(&kind)?.get(name).map(Vec::as_slice)
    }

    /// Content as text, if present and valid UTF-8
    pub fn get_str(&self, kind: DefinitionKind, name: &str) -> Option<&str> {
        std::str::from_utf8(self.get(kind, name)?).ok()
    }

    pub fn len(&self) -> usize {
        self.files.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactWriter for MemoryWriter {
    fn write_kind(
        &mut self,
        kind: DefinitionKind,
        files: BTreeMap<String, Vec<u8>>,
    ) -> std::result::Result<(), Box<dyn Error + Send + Sync>> {
        self.files.entry(kind).or_default().extend(files);
        Ok(())
    }
}

// =============================================================================
// Compiler
// =============================================================================

/// Compiles one registry with one configuration
pub struct Compiler<'r> {
    registry: &'r Registry,
    index: RegistryIndex,
    config: CompileConfig,
    workers: usize,
}

impl<'r> Compiler<'r> {
    /// Validate the configuration and index the registry
    pub fn new(registry: &'r Registry, config: CompileConfig) -> Result<Self> {
        config.validate()?;
        let start = Instant::now();
        let index = RegistryIndex::build(registry);
        debug!("Compiler: Indexed {} definitions in {:?}", registry.len(), start.elapsed());
        Ok(Self {
            registry,
            index,
            config,
            workers: 1,
        })
    }

    /// Compile batches on `n` worker threads; `1` compiles sequentially
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n.max(1);
        self
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    pub fn index(&self) -> &RegistryIndex {
        &self.index
    }

    /// Compile a single definition
    pub fn compile_definition(&self, kind: DefinitionKind, name: &str) -> Result<GeneratedFile> {
        let not_found = || CompileError::NotFound {
            kind,
            name: name.to_string(),
        };
        let mapper = TypeMapper::new(self.registry, &self.index, kind);
        let config = &self.config;
        let mut diagnostics = Diagnostics::new();

        let generated = match kind {
            DefinitionKind::Enum => {
                let def = self.registry.enums().get(name).ok_or_else(not_found)?;
                python::generate_enum(def, config, &mut diagnostics)
            }
            DefinitionKind::Structure => {
                let def = self.registry.structures().get(name).ok_or_else(not_found)?;
                python::generate_structure(def, &mapper, config, &mut diagnostics)
            }
            DefinitionKind::Model => {
                let def = self.registry.models().get(name).ok_or_else(not_found)?;
                python::generate_model(def, &mapper, config, &mut diagnostics)
            }
            DefinitionKind::Entity => {
                let def = self.registry.entities().get(name).ok_or_else(not_found)?;
                python::generate_entity(def, &mapper, config, &mut diagnostics)
            }
        };
        let content = generated.map_err(|e| e.in_definition(kind, name))?;

        self.log_diagnostics(&diagnostics);
        debug!(kind = %kind, name, bytes = content.len(), "generated module");

        Ok(GeneratedFile {
            kind,
            name: name.to_string(),
            checksum: Checksum::of_str(&content),
            content,
            diagnostics,
        })
    }

    /// Compile every definition of a kind.
    ///
    /// Fails with the first failing definition in name order.
    pub fn compile_kind(&self, kind: DefinitionKind) -> Result<CompiledKind> {
        let start = Instant::now();
        let names = self.registry.names(kind);
        let workers = self.workers.min(names.len()).max(1);
        info!(kind = %kind, definitions = names.len(), workers, "compiling");

        let mut results = if workers > 1 {
            self.compile_parallel(kind, names, workers)?
        } else {
            names
                .into_iter()
                .map(|name| (name.to_string(), self.compile_definition(kind, name)))
                .collect()
        };
        results.sort_by(|a, b| a.0.cmp(&b.0));

        let mut files = BTreeMap::new();
        for (name, result) in results {
            files.insert(name, result?);
        }
        debug!("Compiler: Compiled {} {} definitions in {:?}", files.len(), kind, start.elapsed());
        Ok(CompiledKind { kind, files })
    }

    /// Workers pull names from a shared queue until it is empty
    fn compile_parallel(
        &self,
        kind: DefinitionKind,
        names: Vec<&str>,
        workers: usize,
    ) -> Result<Vec<(String, Result<GeneratedFile>)>> {
        let queue = Mutex::new(names.into_iter());

        let joined: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let next = match queue.lock() {
                                Ok(mut queue) => queue.next(),
                                Err(_) => None,
                            };
                            let Some(name) = next else {
                                break;
                            };
                            done.push((name.to_string(), self.compile_definition(kind, name)));
                        }
                        done
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut results = Vec::new();
        for worker in joined {
            let done = worker.map_err(|_| CompileError::WorkerPanicked { kind })?;
            results.extend(done);
        }
        Ok(results)
    }

    /// Compile every kind: enums, structures, models, entities
    pub fn compile_all(&self) -> Result<CompiledRegistry> {
        let kinds = DefinitionKind::ALL
            .into_iter()
            .map(|kind| self.compile_kind(kind))
            .collect::<Result<Vec<_>>>()?;
        Ok(CompiledRegistry { kinds })
    }

    /// Compile every kind and hand each batch to `writer`
    pub fn compile_into(&self, writer: &mut dyn ArtifactWriter) -> Result<CompileReport> {
        let mut files_written = 0;
        let mut diagnostics = Diagnostics::new();
        let mut compiled = Vec::with_capacity(DefinitionKind::ALL.len());

        for kind in DefinitionKind::ALL {
            let batch = self.compile_kind(kind)?;
            writer
                .write_kind(kind, batch.contents())
                .map_err(|source| CompileError::Write { kind, source })?;
            files_written += batch.files.len();
            diagnostics.merge(batch.diagnostics());
            compiled.push(batch);
        }

        let fingerprint = CompiledRegistry { kinds: compiled }.fingerprint();
        info!(files = files_written, warnings = diagnostics.warning_count(), "compilation finished");
        Ok(CompileReport {
            files_written,
            fingerprint,
            diagnostics,
        })
    }

    /// Level soft degradations are logged at
    pub fn diagnostic_level(&self) -> Level {
        if self.config.verbose {
            Level::WARN
        } else {
            Level::DEBUG
        }
    }

    fn log_diagnostics(&self, diagnostics: &Diagnostics) {
        let level = self.diagnostic_level();
        for item in diagnostics {
            if level == Level::WARN {
                warn!(code = %item.code, definition = %item.definition, "{}", item.message);
            } else {
                debug!(code = %item.code, definition = %item.definition, "{}", item.message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumDef, EnumValueType, Model, Relation, RelationKind};
    use std::sync::Arc;
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context as LayerContext, Layer, SubscriberExt};

    fn registry() -> Registry {
        Registry::new()
            .with_enum(EnumDef::new("Status", EnumValueType::String).entry("Active", "active"))
            .with_model(Model::new("Person").field("Name", "String"))
            .with_model(
                Model::new("Company")
                    .field("Status", "Status")
                    .related("Person", Relation::new(RelationKind::HasMany)),
            )
            .with_model(Model::new("Tag").field("Label", "String"))
    }

    struct FailingWriter;

    impl ArtifactWriter for FailingWriter {
        fn write_kind(
            &mut self,
            _kind: DefinitionKind,
            _files: BTreeMap<String, Vec<u8>>,
        ) -> std::result::Result<(), Box<dyn Error + Send + Sync>> {
            Err("disk full".into())
        }
    }

    #[test]
    fn test_compile_definition_not_found() {
        let registry = registry();
        let compiler = Compiler::new(&registry, CompileConfig::default()).unwrap();
        let err = compiler.compile_definition(DefinitionKind::Model, "Ghost").unwrap_err();
        assert!(matches!(err, CompileError::NotFound { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let registry = registry();
        let config = CompileConfig {
            indent_size: 0,
            ..CompileConfig::default()
        };
        assert!(matches!(
            Compiler::new(&registry, config),
            Err(CompileError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let registry = registry();
        let sequential = Compiler::new(&registry, CompileConfig::default())
            .unwrap()
            .compile_all()
            .unwrap();
        let parallel = Compiler::new(&registry, CompileConfig::default())
            .unwrap()
            .workers(4)
            .compile_all()
            .unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.fingerprint(), parallel.fingerprint());
        assert_eq!(sequential.len(), 4);
    }

    #[test]
    fn test_compile_into_memory_writer() {
        let registry = registry();
        let compiler = Compiler::new(&registry, CompileConfig::default()).unwrap();
        let mut writer = MemoryWriter::new();
        let report = compiler.compile_into(&mut writer).unwrap();
        assert_eq!(report.files_written, 4);
        assert_eq!(writer.len(), 4);
        assert_eq!(report.fingerprint, compiler.compile_all().unwrap().fingerprint());
        let company = writer.get_str(DefinitionKind::Model, "Company").unwrap();
        assert!(company.contains("from ..enums.status import Status"));
    }

    #[test]
    fn test_writer_failure_is_wrapped() {
        let registry = registry();
        let compiler = Compiler::new(&registry, CompileConfig::default()).unwrap();
        let err = compiler.compile_into(&mut FailingWriter).unwrap_err();
        assert!(matches!(err, CompileError::Write { kind: DefinitionKind::Enum, .. }));
    }

    /// Records the level of every diagnostic event
    #[derive(Clone, Default)]
    struct DiagnosticLevels(Arc<Mutex<Vec<Level>>>);

    impl<S: Subscriber> Layer<S> for DiagnosticLevels {
        fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
            if event.metadata().fields().field("code").is_some() {
                self.0.lock().unwrap().push(*event.metadata().level());
            }
        }
    }

    fn logged_levels(verbose: bool) -> Vec<Level> {
        let registry = Registry::new().with_model(Model::new("Order").field("Extra", "Blob"));
        let config = CompileConfig {
            verbose,
            ..CompileConfig::default()
        };
        let compiler = Compiler::new(&registry, config).unwrap();
        assert_eq!(compiler.diagnostic_level(), if verbose { Level::WARN } else { Level::DEBUG });

        let levels = DiagnosticLevels::default();
        let subscriber = tracing_subscriber::registry().with(levels.clone());
        let file = tracing::subscriber::with_default(subscriber, || {
            compiler.compile_definition(DefinitionKind::Model, "Order").unwrap()
        });
        assert_eq!(file.diagnostics.len(), 1);
        let recorded = levels.0.lock().unwrap().clone();
        recorded
    }

    #[test]
    fn test_verbose_logs_diagnostics_as_warnings() {
        assert_eq!(logged_levels(true), vec![Level::WARN]);
        assert_eq!(logged_levels(false), vec![Level::DEBUG]);
    }

    #[test]
    fn test_file_paths() {
        let registry = Registry::new().with_model(Model::new("ContactInfo"));
        let compiled = Compiler::new(&registry, CompileConfig::default())
            .unwrap()
            .compile_all()
            .unwrap();
        let file = compiled.file(DefinitionKind::Model, "ContactInfo").unwrap();
        assert_eq!(file.path(), "models/contact_info.py");
    }
}
