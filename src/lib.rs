//! Morphe to Pydantic compiler
//!
//! Compiles a registry of Morphe definitions (enums, structures, models,
//! entities) into Python modules declaring Pydantic classes.
//!
//! ## Features
//!
//! - **Relation expansion**: foreign keys, polymorphic discriminators and
//!   typed navigation fields derived from the eight relation kinds
//! - **Deterministic output**: the same registry and configuration always
//!   produce byte-identical files, verified with SHA256 checksums
//! - **Parallel batches**: definitions of one kind compile on a worker pool
//!   with output identical to a sequential run
//! - **Soft degradation**: unknown types and unresolvable `through` targets
//!   fall back to `Any` and are reported as diagnostics
//!
//! ## Layout
//!
//! ```text
//! enums/status.py
//! structures/address.py
//! models/contact_info.py
//! entities/person.py
//! ```
//!
//! ## Example
//!
//! ```
//! use morphe_pydantic::{CompileConfig, Compiler, DefinitionKind, Registry};
//! use morphe_pydantic::schema::{Model, Relation, RelationKind};
//!
//! let registry = Registry::new()
//!     .with_model(Model::new("Person").field("Name", "String"))
//!     .with_model(
//!         Model::new("Company")
//!             .field("Name", "String")
//!             .related("Person", Relation::new(RelationKind::HasMany)),
//!     );
//!
//! let compiler = Compiler::new(&registry, CompileConfig::default())?;
//! let company = compiler.compile_definition(DefinitionKind::Model, "Company")?;
//! assert!(company.content.contains("persons: Optional[List['Person']] = None"));
//! # Ok::<(), morphe_pydantic::CompileError>(())
//! ```

pub mod checksum;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod registry;
pub mod schema;

pub use checksum::Checksum;
pub use codegen::{
    ArtifactWriter, CompileReport, CompiledKind, CompiledRegistry, Compiler, GeneratedFile,
    MemoryWriter,
};
pub use config::{CompileConfig, LazyLoadingStyle, PythonVersion, StructureStyle};
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use error::{CompileError, DefinitionError, Result};
pub use registry::{Registry, RegistryIndex};
pub use schema::DefinitionKind;
