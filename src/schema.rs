//! Schema definition types
//!
//! The object model produced by the registry loader. Definitions are
//! immutable during compilation; every map is ordered by key so that
//! iteration order never depends on hashing.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of schema definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Enum,
    Structure,
    Model,
    Entity,
}

impl DefinitionKind {
    /// Every kind, in compilation order
    pub const ALL: [DefinitionKind; 4] = [
        DefinitionKind::Enum,
        DefinitionKind::Structure,
        DefinitionKind::Model,
        DefinitionKind::Entity,
    ];

    /// Get the package directory generated files of this kind live in
    pub fn dir_name(&self) -> &'static str {
        match self {
            DefinitionKind::Enum => "enums",
            DefinitionKind::Structure => "structures",
            DefinitionKind::Model => "models",
            DefinitionKind::Entity => "entities",
        }
    }

    /// Noun used in the generated docstring
    pub fn noun(&self) -> &'static str {
        match self {
            DefinitionKind::Enum => "enum",
            DefinitionKind::Structure => "data transfer object",
            DefinitionKind::Model => "model",
            DefinitionKind::Entity => "entity",
        }
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DefinitionKind::Enum => "enum",
            DefinitionKind::Structure => "structure",
            DefinitionKind::Model => "model",
            DefinitionKind::Entity => "entity",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Fields
// =============================================================================

/// A declared field. The type is kept as authored and parsed during compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: String,
}

impl Field {
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
        }
    }
}

// =============================================================================
// Relations
// =============================================================================

/// The eight relation kinds: {For, Has} x {One, Many} x {plain, Poly}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    ForOne,
    ForMany,
    HasOne,
    HasMany,
    ForOnePoly,
    ForManyPoly,
    HasOnePoly,
    HasManyPoly,
}

impl RelationKind {
    pub fn is_for(&self) -> bool {
        matches!(
            self,
            Self::ForOne | Self::ForMany | Self::ForOnePoly | Self::ForManyPoly
        )
    }

    pub fn is_has(&self) -> bool {
        !self.is_for()
    }

    pub fn is_one(&self) -> bool {
        matches!(
            self,
            Self::ForOne | Self::HasOne | Self::ForOnePoly | Self::HasOnePoly
        )
    }

    pub fn is_many(&self) -> bool {
        !self.is_one()
    }

    pub fn is_poly(&self) -> bool {
        matches!(
            self,
            Self::ForOnePoly | Self::ForManyPoly | Self::HasOnePoly | Self::HasManyPoly
        )
    }
}

/// A relation declaration on a model or entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub kind: RelationKind,

    /// Overrides the target name used for navigation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliased: Option<String>,

    /// Explicit target kinds (polymorphic only)
    #[serde(default, rename = "for", skip_serializing_if = "Vec::is_empty")]
    pub for_kinds: Vec<String>,

    /// Relation on another definition that resolves the target (polymorphic only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
}

impl Relation {
    pub fn new(kind: RelationKind) -> Self {
        Self {
            kind,
            aliased: None,
            for_kinds: Vec::new(),
            through: None,
        }
    }

    pub fn aliased(mut self, target: impl Into<String>) -> Self {
        self.aliased = Some(target.into());
        self
    }

    pub fn for_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.for_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn through(mut self, relation: impl Into<String>) -> Self {
        self.through = Some(relation.into());
        self
    }

    /// Name of the navigation target: the alias if present, else the relation name
    pub fn target_name<'a>(&'a self, relation_name: &'a str) -> &'a str {
        self.aliased.as_deref().unwrap_or(relation_name)
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// A persisted model with fields and relations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Field>,
    #[serde(default)]
    pub related: BTreeMap<String, Relation>,
}

/// A plain data structure; structures carry no relations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Field>,
}

/// An entity; field types may point at model fields (`Person.Name`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Field>,
    #[serde(default)]
    pub related: BTreeMap<String, Relation>,
}

/// Underlying value type of an enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnumValueType {
    String,
    Integer,
    Float,
}

/// An enumeration of named values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: EnumValueType,
    #[serde(default)]
    pub entries: BTreeMap<String, serde_json::Value>,
}

macro_rules! field_builders {
    ($ty:ident) => {
        impl $ty {
            pub fn field(mut self, name: impl Into<String>, field_type: impl Into<String>) -> Self {
                self.fields.insert(name.into(), Field::new(field_type));
                self
            }
        }
    };
}

field_builders!(Model);
field_builders!(Structure);
field_builders!(Entity);

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
            related: BTreeMap::new(),
        }
    }

    pub fn related(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.related.insert(name.into(), relation);
        self
    }
}

impl Structure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
            related: BTreeMap::new(),
        }
    }

    pub fn related(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.related.insert(name.into(), relation);
        self
    }
}

impl EnumDef {
    pub fn new(name: impl Into<String>, value_type: EnumValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            entries: BTreeMap::new(),
        }
    }

    pub fn entry(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }
}
