//! Python / Pydantic emitter
//!
//! One function per definition kind. Each returns the complete text of one
//! Python module and never touches shared state, so definitions can be
//! generated in any order or in parallel.

use serde_json::Value;

use crate::config::{CompileConfig, LazyLoadingStyle, StructureStyle};
use crate::diagnostics::Diagnostics;
use crate::error::DefinitionError;
use crate::schema::{DefinitionKind, Entity, EnumDef, EnumValueType, Model, Structure};

use super::imports::ImportTracker;
use super::names::{self, IdentScope};
use super::relations::{resolve_fields, FieldRole, NavField, ResolvedFields};
use super::types::{quoted, TypeExpr, TypeMapper};
use super::writer::CodeWriter;

/// Generate a model module
pub fn generate_model(
    model: &Model,
    mapper: &TypeMapper<'_>,
    config: &CompileConfig,
    diagnostics: &mut Diagnostics,
) -> Result<String, DefinitionError> {
    let fields = resolve_fields(&model.name, &model.fields, &model.related, mapper, diagnostics)?;
    Ok(ClassRenderer::new(&model.name, DefinitionKind::Model, ClassBase::BaseModel, config)
        .render(&fields, LazyLoadingStyle::Eager))
}

/// Generate an entity module; navigation follows the configured lazy-loading style
pub fn generate_entity(
    entity: &Entity,
    mapper: &TypeMapper<'_>,
    config: &CompileConfig,
    diagnostics: &mut Diagnostics,
) -> Result<String, DefinitionError> {
    let fields = resolve_fields(&entity.name, &entity.fields, &entity.related, mapper, diagnostics)?;
    Ok(ClassRenderer::new(&entity.name, DefinitionKind::Entity, ClassBase::BaseModel, config)
        .render(&fields, config.entities.lazy_loading_style))
}

/// Generate a structure module
pub fn generate_structure(
    structure: &Structure,
    mapper: &TypeMapper<'_>,
    config: &CompileConfig,
    diagnostics: &mut Diagnostics,
) -> Result<String, DefinitionError> {
    let no_relations = Default::default();
    let fields = resolve_fields(&structure.name, &structure.fields, &no_relations, mapper, diagnostics)?;
    let base = match config.structures.style {
        StructureStyle::Validated => ClassBase::BaseModel,
        StructureStyle::Plain => ClassBase::Dataclass,
    };
    Ok(ClassRenderer::new(&structure.name, DefinitionKind::Structure, base, config)
        .render(&fields, LazyLoadingStyle::Eager))
}

// =============================================================================
// Classes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassBase {
    BaseModel,
    Dataclass,
}

/// How a navigation member without a field is emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stub {
    Property,
    Method,
}

struct ClassRenderer<'a> {
    name: &'a str,
    kind: DefinitionKind,
    base: ClassBase,
    config: &'a CompileConfig,
    imports: ImportTracker,
}

impl<'a> ClassRenderer<'a> {
    fn new(name: &'a str, kind: DefinitionKind, base: ClassBase, config: &'a CompileConfig) -> Self {
        let mut imports = ImportTracker::new(name, kind, config.python_version);
        match base {
            ClassBase::BaseModel => imports.add_base("pydantic", "BaseModel"),
            ClassBase::Dataclass => imports.add_base("dataclasses", "dataclass"),
        }
        Self {
            name,
            kind,
            base,
            config,
            imports,
        }
    }

    fn use_field(&self) -> bool {
        self.config.models.use_field && self.base == ClassBase::BaseModel
    }

    /// One attribute declaration. Optional attributes default to `None`.
    fn field_line(&mut self, ident: &str, ty: &TypeExpr, required: bool) -> String {
        if !self.config.add_type_hints {
            return format!("{} = None", ident);
        }
        self.imports.track(ty);
        let hint = ty.render(self.config.python_version);
        let default = match (required, self.use_field()) {
            (true, false) => return format!("{}: {}", ident, hint),
            (true, true) => "Field(...)",
            (false, true) => "Field(default=None)",
            (false, false) => "None",
        };
        if self.use_field() {
            self.imports.add_base("pydantic", "Field");
        }
        format!("{}: {} = {}", ident, hint, default)
    }

    fn stub_style(nav: &NavField, style: LazyLoadingStyle) -> Option<Stub> {
        match style {
            LazyLoadingStyle::Eager => nav.has_discriminator().then_some(Stub::Property),
            LazyLoadingStyle::Property => Some(Stub::Property),
            LazyLoadingStyle::Method => Some(Stub::Method),
        }
    }

    fn render(mut self, fields: &ResolvedFields, style: LazyLoadingStyle) -> String {
        let mut body = Vec::with_capacity(fields.data.len() + fields.navigation.len());
        for field in &fields.data {
            let line = match field.role {
                FieldRole::Declared => self.field_line(&field.ident, &field.ty, true),
                FieldRole::ForeignKey { .. } | FieldRole::Discriminator { .. } => {
                    self.field_line(&field.ident, &TypeExpr::optional(field.ty.clone()), false)
                }
            };
            body.push(line);
        }

        let mut stubs = Vec::new();
        for nav in &fields.navigation {
            let ty = TypeExpr::optional(nav.ty.clone());
            match Self::stub_style(nav, style) {
                None => body.push(self.field_line(&nav.ident, &ty, false)),
                Some(stub) => {
                    let returns = if self.config.add_type_hints {
                        self.imports.track(&ty);
                        format!(" -> {}", ty.render(self.config.python_version))
                    } else {
                        String::new()
                    };
                    stubs.push((stub, nav, returns));
                }
            }
        }

        let config_block = self.base == ClassBase::BaseModel && fields.has_enum_field();

        let mut out = CodeWriter::new(self.config.indent());
        self.imports.render(&mut out);
        out.blank();
        out.blank();

        match self.base {
            ClassBase::BaseModel => out.line(format!("class {}(BaseModel):", self.name)),
            ClassBase::Dataclass => {
                out.line("@dataclass");
                out.line(format!("class {}:", self.name));
            }
        }
        out.indent();
        out.line(format!("\"\"\"{} {}.\"\"\"", self.name, self.kind.noun()));

        if fields.is_empty() {
            out.line("pass");
        }
        for line in &body {
            out.line(line);
        }

        if config_block {
            out.blank();
            write_config_block(&mut out, self.config.pydantic_v2);
        }

        for (stub, nav, returns) in stubs {
            out.blank();
            match stub {
                Stub::Property => {
                    out.line("@property");
                    out.line(format!("def {}(self){}:", nav.ident, returns));
                }
                Stub::Method => out.line(format!("def load_{}(self){}:", nav.ident, returns)),
            }
            out.indent();
            let message = format!("{} is resolved lazily", nav.relation);
            out.line(format!("raise NotImplementedError({})", quoted(&message, '"')));
            out.dedent();
        }

        out.dedent();
        out.build()
    }
}

fn write_config_block(out: &mut CodeWriter, pydantic_v2: bool) {
    if pydantic_v2 {
        out.line("model_config = {");
        out.indent();
        out.line("\"validate_assignment\": True,");
        out.line("\"use_enum_values\": True,");
        out.dedent();
        out.line("}");
    } else {
        out.line("class Config:");
        out.indent();
        out.line("validate_assignment = True");
        out.line("use_enum_values = True");
        out.dedent();
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Generate an enum module
pub fn generate_enum(
    enum_def: &EnumDef,
    config: &CompileConfig,
    diagnostics: &mut Diagnostics,
) -> Result<String, DefinitionError> {
    let mixin = match enum_def.value_type {
        EnumValueType::String => "str",
        EnumValueType::Integer => "int",
        EnumValueType::Float => "float",
    };

    let mut scope = IdentScope::new();
    let mut members = Vec::with_capacity(enum_def.entries.len());
    for (entry, value) in &enum_def.entries {
        let literal = enum_literal(entry, value, enum_def.value_type)?;
        let ident = names::member_ident(entry);
        if ident.reserved {
            diagnostics.reserved_identifier(&enum_def.name, entry, &ident.name);
        }
        let (member, changed) = scope.claim(&ident.name);
        if changed {
            diagnostics.identifier_collision(&enum_def.name, &ident.name, &member);
        }
        members.push(format!("{} = {}", member, literal));
    }

    let mut out = CodeWriter::new(config.indent());
    out.line("from enum import Enum");
    out.blank();
    out.blank();
    out.line(format!("class {}({}, Enum):", enum_def.name, mixin));
    out.indent();
    out.line(format!("\"\"\"{} enum.\"\"\"", enum_def.name));
    if members.is_empty() && !config.enums.generate_str_method {
        out.line("pass");
    }
    for member in &members {
        out.line(member);
    }
    if config.enums.generate_str_method {
        out.blank();
        if config.add_type_hints {
            out.line("def __str__(self) -> str:");
        } else {
            out.line("def __str__(self):");
        }
        out.indent();
        out.line("return str(self.value)");
        out.dedent();
    }
    out.dedent();
    Ok(out.build())
}

/// Python literal for an entry value, checked against the enum's value type
fn enum_literal(entry: &str, value: &Value, value_type: EnumValueType) -> Result<String, DefinitionError> {
    let mismatch = |expected: &str| DefinitionError::EnumValueMismatch {
        entry: entry.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    };
    match value_type {
        EnumValueType::String => match value {
            // JSON string escapes are valid Python string escapes
            Value::String(_) => Ok(value.to_string()),
            _ => Err(mismatch("string")),
        },
        EnumValueType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
            _ => Err(mismatch("integer")),
        },
        EnumValueType::Float => match value.as_f64() {
            Some(f) if f.is_finite() => Ok(format!("{:?}", f)),
            _ => Err(mismatch("float")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PythonVersion;
    use crate::registry::{Registry, RegistryIndex};
    use crate::schema::{Relation, RelationKind};
    use pretty_assertions::assert_eq;

    fn model(registry: &Registry, name: &str, config: &CompileConfig) -> String {
        let index = RegistryIndex::build(registry);
        let mapper = TypeMapper::new(registry, &index, DefinitionKind::Model);
        let mut diagnostics = Diagnostics::new();
        generate_model(registry.model(name).unwrap(), &mapper, config, &mut diagnostics).unwrap()
    }

    #[test]
    fn test_empty_model_has_pass() {
        let registry = Registry::new().with_model(Model::new("Marker"));
        let expected = "\
from pydantic import BaseModel


class Marker(BaseModel):
    \"\"\"Marker model.\"\"\"
    pass
";
        assert_eq!(model(&registry, "Marker", &CompileConfig::default()), expected);
    }

    #[test]
    fn test_poly_navigation_is_a_property_stub() {
        let registry = Registry::new()
            .with_model(Model::new("Post"))
            .with_model(Model::new("Video"))
            .with_model(Model::new("Comment").field("Body", "String").related(
                "Commentable",
                Relation::new(RelationKind::ForOnePoly).for_kinds(["Post", "Video"]),
            ));
        let expected = "\
from pydantic import BaseModel
from typing import Literal, Optional, TYPE_CHECKING, Union

if TYPE_CHECKING:
    from .post import Post
    from .video import Video


class Comment(BaseModel):
    \"\"\"Comment model.\"\"\"
    body: str
    commentable_type: Optional[Literal[\"Post\", \"Video\"]] = None
    commentable_id: Optional[str] = None

    @property
    def commentable(self) -> Optional[Union['Post', 'Video']]:
        raise NotImplementedError(\"Commentable is resolved lazily\")
";
        assert_eq!(model(&registry, "Comment", &CompileConfig::default()), expected);
    }

    #[test]
    fn test_use_field_and_builtin_generics() {
        let registry = Registry::new().with_model(
            Model::new("Tag")
                .field("Labels", "[]String")
                .related("Owner", Relation::new(RelationKind::ForOne).aliased("Tag")),
        );
        let mut config = CompileConfig {
            python_version: PythonVersion::new(3, 10),
            ..CompileConfig::default()
        };
        config.models.use_field = true;
        let expected = "\
from pydantic import BaseModel, Field
from typing import Optional


class Tag(BaseModel):
    \"\"\"Tag model.\"\"\"
    labels: list[str] = Field(...)
    owner_id: Optional[str] = Field(default=None)
    owner: Optional['Tag'] = Field(default=None)
";
        assert_eq!(model(&registry, "Tag", &config), expected);
    }

    #[test]
    fn test_entity_method_style() {
        let registry = Registry::new()
            .with_entity(Entity::new("Person").field("Name", "String"))
            .with_entity(
                Entity::new("Company")
                    .field("Name", "String")
                    .related("Person", Relation::new(RelationKind::HasMany)),
            );
        let index = RegistryIndex::build(&registry);
        let mapper = TypeMapper::new(&registry, &index, DefinitionKind::Entity);
        let mut config = CompileConfig::default();
        config.entities.lazy_loading_style = LazyLoadingStyle::Method;
        let mut diagnostics = Diagnostics::new();
        let entity = &registry.entities()["Company"];
        let content = generate_entity(entity, &mapper, &config, &mut diagnostics).unwrap();
        let expected = "\
from pydantic import BaseModel
from typing import List, Optional, TYPE_CHECKING

if TYPE_CHECKING:
    from .person import Person


class Company(BaseModel):
    \"\"\"Company entity.\"\"\"
    name: str

    def load_persons(self) -> Optional[List['Person']]:
        raise NotImplementedError(\"Person is resolved lazily\")
";
        assert_eq!(content, expected);
    }

    #[test]
    fn test_plain_structure() {
        let registry = Registry::new()
            .with_structure(Structure::new("Address").field("Street", "String").field("Zip", "Integer"));
        let index = RegistryIndex::build(&registry);
        let mapper = TypeMapper::new(&registry, &index, DefinitionKind::Structure);
        let mut config = CompileConfig::default();
        config.structures.style = StructureStyle::Plain;
        config.models.use_field = true;
        let mut diagnostics = Diagnostics::new();
        let structure = &registry.structures()["Address"];
        let content = generate_structure(structure, &mapper, &config, &mut diagnostics).unwrap();
        let expected = "\
from dataclasses import dataclass


@dataclass
class Address:
    \"\"\"Address data transfer object.\"\"\"
    street: str
    zip: int
";
        assert_eq!(content, expected);
    }

    #[test]
    fn test_enum_with_str_method() {
        let enum_def = EnumDef::new("Status", EnumValueType::String)
            .entry("Active", "active")
            .entry("OnHold", "on \"hold\"");
        let mut config = CompileConfig::default();
        config.enums.generate_str_method = true;
        let content = generate_enum(&enum_def, &config, &mut Diagnostics::new()).unwrap();
        let expected = "\
from enum import Enum


class Status(str, Enum):
    \"\"\"Status enum.\"\"\"
    ACTIVE = \"active\"
    ON_HOLD = \"on \\\"hold\\\"\"

    def __str__(self) -> str:
        return str(self.value)
";
        assert_eq!(content, expected);
    }

    #[test]
    fn test_numeric_enums() {
        let ints = EnumDef::new("Priority", EnumValueType::Integer)
            .entry("Low", 1)
            .entry("High", 3);
        let content = generate_enum(&ints, &CompileConfig::default(), &mut Diagnostics::new()).unwrap();
        assert!(content.contains("class Priority(int, Enum):"));
        assert!(content.contains("    HIGH = 3\n    LOW = 1\n"));

        let floats = EnumDef::new("Ratio", EnumValueType::Float).entry("Half", 0.5).entry("One", 1);
        let content = generate_enum(&floats, &CompileConfig::default(), &mut Diagnostics::new()).unwrap();
        assert!(content.contains("    HALF = 0.5\n    ONE = 1.0\n"));
    }

    #[test]
    fn test_enum_value_mismatch() {
        let enum_def = EnumDef::new("Priority", EnumValueType::Integer).entry("Low", "low");
        let err = generate_enum(&enum_def, &CompileConfig::default(), &mut Diagnostics::new()).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::EnumValueMismatch {
                entry: "Low".to_string(),
                value: "\"low\"".to_string(),
                expected: "integer".to_string(),
            }
        );
    }
}
