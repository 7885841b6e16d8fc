//! Type Mapping
//!
//! Turns declared schema field types into [`TypeExpr`] values and renders
//! those as Python type hints.
//!
//! Declared types are parsed first ([`FieldType::parse`]); parsing is the only
//! step that can fail. Mapping a parsed type is total: names the registry
//! does not know fall back to `Any`.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::PythonVersion;
use crate::error::DefinitionError;
use crate::registry::{Registry, RegistryIndex};
use crate::schema::DefinitionKind;

// =============================================================================
// Field Types
// =============================================================================

/// A parsed declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Scalar or definition name (`String`, `Status`, `Address`)
    Named(String),
    /// `[]Elem`
    Array(Box<FieldType>),
    /// `Model.Field`, entities only
    ModelField { model: String, field: String },
}

fn type_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("static regex")
    })
}

impl FieldType {
    /// Parse a declared type. `field` is only used for error messages.
    pub fn parse(field: &str, raw: &str) -> Result<Self, DefinitionError> {
        Self::parse_inner(raw.trim()).ok_or_else(|| DefinitionError::MalformedType {
            field: field.to_string(),
            raw: raw.to_string(),
        })
    }

    fn parse_inner(text: &str) -> Option<Self> {
        if let Some(elem) = text.strip_prefix("[]") {
            return Some(FieldType::Array(Box::new(Self::parse_inner(elem)?)));
        }
        if !type_name_pattern().is_match(text) {
            return None;
        }
        match text.split_once('.') {
            Some((model, field)) => Some(FieldType::ModelField {
                model: model.to_string(),
                field: field.to_string(),
            }),
            None => Some(FieldType::Named(text.to_string())),
        }
    }
}

// =============================================================================
// Type Expressions
// =============================================================================

/// Python scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Str,
    Int,
    Float,
    Bool,
    DateTime,
    Date,
    Any,
}

impl Scalar {
    pub fn python_name(&self) -> &'static str {
        match self {
            Scalar::Str => "str",
            Scalar::Int => "int",
            Scalar::Float => "float",
            Scalar::Bool => "bool",
            Scalar::DateTime => "datetime",
            Scalar::Date => "date",
            Scalar::Any => "Any",
        }
    }
}

/// Reference to a definition; `kind` is `None` when the registry lacks the name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub name: String,
    pub kind: Option<DefinitionKind>,
}

impl TypeRef {
    pub fn new(name: impl Into<String>, kind: Option<DefinitionKind>) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn is_enum(&self) -> bool {
        self.kind == Some(DefinitionKind::Enum)
    }

    /// Enums are imported at module scope and used bare; everything else is
    /// imported under `TYPE_CHECKING` and must be a quoted forward reference.
    pub fn render(&self) -> String {
        if self.is_enum() {
            self.name.clone()
        } else {
            quoted(&self.name, '\'')
        }
    }
}

/// Python string literal delimited by `quote`
pub fn quoted(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// A target-language type expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Scalar(Scalar),
    Optional(Box<TypeExpr>),
    Array(Box<TypeExpr>),
    /// `Dict[str, V]`
    Map(Box<TypeExpr>),
    Union(Vec<TypeRef>),
    Reference(TypeRef),
    /// Closed set of string values
    Literal(Vec<String>),
}

impl TypeExpr {
    pub fn any() -> Self {
        TypeExpr::Scalar(Scalar::Any)
    }

    pub fn string() -> Self {
        TypeExpr::Scalar(Scalar::Str)
    }

    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Optional(Box::new(inner))
    }

    pub fn array(inner: TypeExpr) -> Self {
        TypeExpr::Array(Box::new(inner))
    }

    /// Union members, if this is a union
    pub fn union_members(&self) -> Option<&[TypeRef]> {
        match self {
            TypeExpr::Union(members) => Some(members),
            _ => None,
        }
    }

    /// Visit this expression and every nested expression, outermost first
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a TypeExpr)) {
        f(self);
        match self {
            TypeExpr::Optional(inner) | TypeExpr::Array(inner) | TypeExpr::Map(inner) => {
                inner.walk(f)
            }
            TypeExpr::Scalar(_)
            | TypeExpr::Union(_)
            | TypeExpr::Reference(_)
            | TypeExpr::Literal(_) => {}
        }
    }

    /// Every definition reference inside this expression
    pub fn references(&self) -> Vec<&TypeRef> {
        let mut refs = Vec::new();
        self.walk(&mut |expr| match expr {
            TypeExpr::Reference(r) => refs.push(r),
            TypeExpr::Union(members) => refs.extend(members.iter()),
            _ => {}
        });
        refs
    }

    /// Whether any reference inside resolves to an enum
    pub fn references_enum(&self) -> bool {
        self.references().iter().any(|r| r.is_enum())
    }

    /// Render as a Python type hint
    pub fn render(&self, version: PythonVersion) -> String {
        match self {
            TypeExpr::Scalar(scalar) => scalar.python_name().to_string(),
            TypeExpr::Optional(inner) => format!("Optional[{}]", inner.render(version)),
            TypeExpr::Array(inner) => {
                let list = if version.has_builtin_generics() { "list" } else { "List" };
                format!("{}[{}]", list, inner.render(version))
            }
            TypeExpr::Map(inner) => {
                let dict = if version.has_builtin_generics() { "dict" } else { "Dict" };
                format!("{}[str, {}]", dict, inner.render(version))
            }
            TypeExpr::Union(members) => {
                let members: Vec<String> = members.iter().map(TypeRef::render).collect();
                format!("Union[{}]", members.join(", "))
            }
            TypeExpr::Reference(r) => r.render(),
            TypeExpr::Literal(values) => {
                let values: Vec<String> = values.iter().map(|v| quoted(v, '"')).collect();
                format!("Literal[{}]", values.join(", "))
            }
        }
    }
}

// =============================================================================
// Type Mapper
// =============================================================================

/// Scalar schema type names
fn scalar_type(name: &str) -> Option<TypeExpr> {
    let scalar = match name {
        "String" | "Protected" | "Sealed" | "UUID" => Scalar::Str,
        "Integer" | "AutoIncrement" => Scalar::Int,
        "Float" => Scalar::Float,
        "Boolean" => Scalar::Bool,
        "Time" => Scalar::DateTime,
        "Date" => Scalar::Date,
        "Json" | "Map" => return Some(TypeExpr::Map(Box::new(TypeExpr::any()))),
        _ => return None,
    };
    Some(TypeExpr::Scalar(scalar))
}

/// Maps declared types for definitions of one kind
pub struct TypeMapper<'a> {
    registry: &'a Registry,
    index: &'a RegistryIndex,
    context: DefinitionKind,
}

impl<'a> TypeMapper<'a> {
    pub fn new(registry: &'a Registry, index: &'a RegistryIndex, context: DefinitionKind) -> Self {
        Self {
            registry,
            index,
            context,
        }
    }

    /// Parse a declared type and expand `Model.Field` paths.
    ///
    /// Paths are only meaningful on entities; elsewhere they are malformed.
    pub fn field_type(&self, field: &str, raw: &str) -> Result<FieldType, DefinitionError> {
        let parsed = FieldType::parse(field, raw)?;
        self.expand(field, raw, parsed)
    }

    fn expand(&self, field: &str, raw: &str, ty: FieldType) -> Result<FieldType, DefinitionError> {
        match ty {
            FieldType::Named(_) => Ok(ty),
            FieldType::Array(elem) => Ok(FieldType::Array(Box::new(self.expand(field, raw, *elem)?))),
            FieldType::ModelField { model, field: model_field } => {
                if self.context != DefinitionKind::Entity {
                    return Err(DefinitionError::MalformedType {
                        field: field.to_string(),
                        raw: raw.to_string(),
                    });
                }
                let target = self
                    .registry
                    .model(&model)
                    .and_then(|m| m.fields.get(&model_field))
                    .ok_or_else(|| DefinitionError::UnknownModelField {
                        field: field.to_string(),
                        path: format!("{}.{}", model, model_field),
                    })?;
                match FieldType::parse(field, &target.field_type)? {
                    FieldType::ModelField { .. } => Err(DefinitionError::MalformedType {
                        field: field.to_string(),
                        raw: target.field_type.clone(),
                    }),
                    resolved => Ok(resolved),
                }
            }
        }
    }

    /// Map a parsed type. Unknown names become `Any`.
    pub fn map(&self, ty: &FieldType) -> TypeExpr {
        match ty {
            FieldType::Named(name) => {
                if let Some(expr) = scalar_type(name) {
                    return expr;
                }
                match self.index.resolve_type(name, self.context) {
                    Some(kind) => TypeExpr::Reference(TypeRef::new(name.as_str(), Some(kind))),
                    None => TypeExpr::any(),
                }
            }
            FieldType::Array(elem) => TypeExpr::array(self.map(elem)),
            // Paths are expanded by field_type before mapping
            FieldType::ModelField { .. } => TypeExpr::any(),
        }
    }

    /// Names inside `ty` that map to the `Any` fallback
    pub fn unknown_names<'t>(&self, ty: &'t FieldType) -> Vec<&'t str> {
        match ty {
            FieldType::Named(name) => {
                if scalar_type(name).is_none() && self.index.resolve_type(name, self.context).is_none() {
                    vec![name.as_str()]
                } else {
                    Vec::new()
                }
            }
            FieldType::Array(elem) => self.unknown_names(elem),
            FieldType::ModelField { .. } => Vec::new(),
        }
    }

    /// Reference to a relation target, resolved with the context kind preferred
    pub fn target_ref(&self, name: &str) -> TypeRef {
        TypeRef::new(name, self.index.resolve_target(name, self.context))
    }

    /// Reference to the definition owning the polymorphic relation `through`
    pub fn through_ref(&self, through: &str) -> Option<TypeRef> {
        self.index
            .through_owner(through, self.context)
            .map(|(kind, owner)| TypeRef::new(owner, Some(kind)))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumDef, EnumValueType, Model, Structure};
    use rstest::rstest;

    fn registry() -> Registry {
        Registry::new()
            .with_enum(EnumDef::new("Status", EnumValueType::String))
            .with_structure(Structure::new("Address"))
            .with_model(Model::new("Person").field("Name", "String").field("Nick", "Person.Name"))
    }

    const V38: PythonVersion = PythonVersion::new(3, 8);

    #[rstest]
    #[case("String", "str")]
    #[case("Protected", "str")]
    #[case("UUID", "str")]
    #[case("Integer", "int")]
    #[case("AutoIncrement", "int")]
    #[case("Float", "float")]
    #[case("Boolean", "bool")]
    #[case("Time", "datetime")]
    #[case("Date", "date")]
    #[case("Json", "Dict[str, Any]")]
    #[case("Status", "Status")]
    #[case("Address", "'Address'")]
    #[case("[]String", "List[str]")]
    #[case("[][]Integer", "List[List[int]]")]
    #[case("[]Status", "List[Status]")]
    #[case("Gibberish", "Any")]
    fn test_map_declared_type(#[case] raw: &str, #[case] expected: &str) {
        let registry = registry();
        let index = RegistryIndex::build(&registry);
        let mapper = TypeMapper::new(&registry, &index, DefinitionKind::Model);
        let ty = mapper.field_type("Field", raw).unwrap();
        assert_eq!(mapper.map(&ty).render(V38), expected);
    }

    #[rstest]
    #[case("")]
    #[case("[]")]
    #[case("Two Words")]
    #[case("List<String>")]
    #[case("a.b.c")]
    fn test_malformed_types(#[case] raw: &str) {
        let err = FieldType::parse("Broken", raw).unwrap_err();
        assert!(matches!(err, DefinitionError::MalformedType { .. }));
    }

    #[test]
    fn test_unknown_names_reported() {
        let registry = registry();
        let index = RegistryIndex::build(&registry);
        let mapper = TypeMapper::new(&registry, &index, DefinitionKind::Model);
        let ty = mapper.field_type("Field", "[]Gibberish").unwrap();
        assert_eq!(mapper.unknown_names(&ty), vec!["Gibberish"]);
        let ty = mapper.field_type("Field", "String").unwrap();
        assert!(mapper.unknown_names(&ty).is_empty());
    }

    #[test]
    fn test_model_field_paths() {
        let registry = registry();
        let index = RegistryIndex::build(&registry);

        let entity = TypeMapper::new(&registry, &index, DefinitionKind::Entity);
        let ty = entity.field_type("Name", "Person.Name").unwrap();
        assert_eq!(ty, FieldType::Named("String".to_string()));

        let err = entity.field_type("Age", "Person.Age").unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownModelField { .. }));

        // A model field that is itself a path cannot be followed
        let err = entity.field_type("Nick", "Person.Nick").unwrap_err();
        assert!(matches!(err, DefinitionError::MalformedType { .. }));

        let model = TypeMapper::new(&registry, &index, DefinitionKind::Model);
        assert!(model.field_type("Name", "Person.Name").is_err());
    }

    #[test]
    fn test_builtin_generics() {
        let expr = TypeExpr::optional(TypeExpr::array(TypeExpr::Map(Box::new(TypeExpr::any()))));
        assert_eq!(expr.render(V38), "Optional[List[Dict[str, Any]]]");
        assert_eq!(expr.render(PythonVersion::new(3, 10)), "Optional[list[dict[str, Any]]]");
    }

    #[test]
    fn test_union_and_literal_render() {
        let union = TypeExpr::Union(vec![
            TypeRef::new("Post", Some(DefinitionKind::Model)),
            TypeRef::new("Video", None),
        ]);
        assert_eq!(union.render(V38), "Union['Post', 'Video']");
        let literal = TypeExpr::Literal(vec!["Post".into(), "Video".into()]);
        assert_eq!(literal.render(V38), r#"Literal["Post", "Video"]"#);
    }

    #[test]
    fn test_quotes_and_backslashes_are_escaped() {
        assert_eq!(quoted("Post", '\''), "'Post'");
        assert_eq!(quoted(r#"O'Brien"#, '\''), r#"'O\'Brien'"#);
        assert_eq!(quoted(r#"say "hi""#, '"'), r#""say \"hi\"""#);
        assert_eq!(quoted(r"a\b", '"'), r#""a\\b""#);

        let union = TypeExpr::Union(vec![TypeRef::new(r"Odd'\Name", None)]);
        assert_eq!(union.render(V38), r"Union['Odd\'\\Name']");
        let literal = TypeExpr::Literal(vec![r#"Say"Hi"#.into(), "It's".into()]);
        assert_eq!(literal.render(V38), r#"Literal["Say\"Hi", "It's"]"#);
    }

    #[test]
    fn test_references_enum() {
        let expr = TypeExpr::array(TypeExpr::Reference(TypeRef::new("Status", Some(DefinitionKind::Enum))));
        assert!(expr.references_enum());
        assert!(!TypeExpr::string().references_enum());
    }
}
