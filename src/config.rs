//! Compilation configuration
//!
//! Every option is optional. An empty document (`{}`) yields the defaults:
//!
//! ```json
//! {
//!   "pythonVersion": "3.8",
//!   "pydanticV2": true,
//!   "addTypeHints": true,
//!   "indentSize": 4,
//!   "verbose": false,
//!   "enums": { "generateStrMethod": false },
//!   "models": { "useField": false },
//!   "structures": { "style": "validated" },
//!   "entities": { "lazyLoadingStyle": "eager" }
//! }
//! ```
//!
//! Populating this from files or plugin arguments is the caller's job.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CompileError, Result};

/// Main configuration consumed by the content generators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileConfig {
    /// Target Python version
    #[serde(default)]
    pub python_version: PythonVersion,

    /// Emit Pydantic v2 syntax (`model_config`) instead of v1 (`class Config`)
    #[serde(default = "default_true", rename = "pydanticV2")]
    pub pydantic_v2: bool,

    /// Emit type hints; when off every field renders as `name = None`
    #[serde(default = "default_true")]
    pub add_type_hints: bool,

    /// Spaces per indentation level
    #[serde(default = "default_indent_size")]
    pub indent_size: usize,

    /// Log soft degradations at warn level instead of debug
    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub enums: EnumConfig,

    #[serde(default)]
    pub models: ModelConfig,

    #[serde(default)]
    pub structures: StructureConfig,

    #[serde(default)]
    pub entities: EntityConfig,
}

/// Enum generation options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumConfig {
    /// Generate `__str__` returning the member value
    #[serde(default)]
    pub generate_str_method: bool,
}

/// Model generation options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Wrap every field default in `Field(...)`
    #[serde(default)]
    pub use_field: bool,
}

/// Structure generation options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureConfig {
    #[serde(default)]
    pub style: StructureStyle,
}

/// How structures are emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureStyle {
    /// Pydantic `BaseModel` with validation
    #[default]
    Validated,
    /// Plain `@dataclass` record
    Plain,
}

/// Entity generation options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityConfig {
    #[serde(default)]
    pub lazy_loading_style: LazyLoadingStyle,
}

/// How entity navigation members are emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LazyLoadingStyle {
    /// Optional fields, like models
    #[default]
    Eager,
    /// `@property` stubs
    Property,
    /// `load_<name>()` method stubs
    Method,
}

fn default_true() -> bool {
    true
}

fn default_indent_size() -> usize {
    4
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            python_version: PythonVersion::default(),
            pydantic_v2: true,
            add_type_hints: true,
            indent_size: default_indent_size(),
            verbose: false,
            enums: EnumConfig::default(),
            models: ModelConfig::default(),
            structures: StructureConfig::default(),
            entities: EntityConfig::default(),
        }
    }
}

impl CompileConfig {
    /// Parse a configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check option ranges
    pub fn validate(&self) -> Result<()> {
        if self.python_version < PythonVersion::MINIMUM {
            return Err(CompileError::InvalidConfig(format!(
                "python version {} is not supported, minimum is {}",
                self.python_version,
                PythonVersion::MINIMUM
            )));
        }
        if !(1..=16).contains(&self.indent_size) {
            return Err(CompileError::InvalidConfig(format!(
                "indent size must be between 1 and 16, got {}",
                self.indent_size
            )));
        }
        Ok(())
    }

    /// Indentation unit
    pub fn indent(&self) -> String {
        " ".repeat(self.indent_size)
    }
}

// =============================================================================
// Python Version
// =============================================================================

/// A `major.minor` Python version tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
}

impl PythonVersion {
    /// Oldest version with `typing.Literal`
    pub const MINIMUM: PythonVersion = PythonVersion::new(3, 8);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// PEP 585: builtin collections are subscriptable
    pub fn has_builtin_generics(&self) -> bool {
        *self >= PythonVersion::new(3, 9)
    }
}

impl Default for PythonVersion {
    fn default() -> Self {
        Self::MINIMUM
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PythonVersion {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CompileError::InvalidConfig(format!("invalid python version '{}'", s));
        let mut parts = s.trim().split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        // A patch component is accepted and ignored
        if let Some(patch) = parts.next() {
            patch.parse::<u32>().map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self { major, minor })
    }
}

impl Serialize for PythonVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PythonVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
