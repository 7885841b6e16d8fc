//! Relationship Resolver
//!
//! Expands a definition's declared fields and relations into the two lists a
//! generator renders:
//!
//! - data fields: declared fields in name order, then the foreign keys each
//!   `ForOne` / `ForOnePoly` relation contributes
//! - navigation fields: one per relation, typed by its target
//!
//! Identifiers are claimed in that order, so a foreign key never displaces a
//! declared field of the same name.

use std::collections::BTreeMap;

use crate::diagnostics::Diagnostics;
use crate::error::DefinitionError;
use crate::schema::{Field, Relation, RelationKind};

use super::names::{self, Ident, IdentScope};
use super::types::{TypeExpr, TypeMapper, TypeRef};

/// Why a data field exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRole {
    Declared,
    /// `<relation>_id`
    ForeignKey { relation: String },
    /// `<relation>_type` of a polymorphic relation
    Discriminator { relation: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataField {
    /// Python attribute name
    pub ident: String,
    /// Schema name the field came from
    pub source: String,
    pub ty: TypeExpr,
    pub role: FieldRole,
}

impl DataField {
    pub fn is_declared(&self) -> bool {
        self.role == FieldRole::Declared
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavField {
    pub ident: String,
    pub relation: String,
    pub kind: RelationKind,
    pub ty: TypeExpr,
}

impl NavField {
    /// Navigation paired with a `_type` discriminator field
    pub fn has_discriminator(&self) -> bool {
        self.kind == RelationKind::ForOnePoly
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFields {
    pub data: Vec<DataField>,
    pub navigation: Vec<NavField>,
}

impl ResolvedFields {
    /// Whether any data field's type mentions an enum
    pub fn has_enum_field(&self) -> bool {
        self.data.iter().any(|f| f.ty.references_enum())
    }

    /// No attributes and no navigation members
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.navigation.is_empty()
    }
}

/// Claims identifiers for one class body and records renames
struct Claims<'a> {
    definition: &'a str,
    scope: IdentScope,
    diagnostics: &'a mut Diagnostics,
}

impl Claims<'_> {
    fn claim(&mut self, source: &str, ident: Ident) -> String {
        if ident.reserved {
            self.diagnostics
                .reserved_identifier(self.definition, source, &ident.name);
        }
        let (name, changed) = self.scope.claim(&ident.name);
        if changed {
            self.diagnostics
                .identifier_collision(self.definition, &ident.name, &name);
        }
        name
    }
}

/// Resolve the data and navigation fields of one definition
pub fn resolve_fields(
    definition: &str,
    fields: &BTreeMap<String, Field>,
    related: &BTreeMap<String, Relation>,
    mapper: &TypeMapper<'_>,
    diagnostics: &mut Diagnostics,
) -> Result<ResolvedFields, DefinitionError> {
    let mut resolved = ResolvedFields::default();

    // Types first: unknown-type diagnostics come before identifier ones
    let mut declared = Vec::with_capacity(fields.len());
    for (name, field) in fields {
        let parsed = mapper.field_type(name, &field.field_type)?;
        for unknown in mapper.unknown_names(&parsed) {
            diagnostics.unknown_type(definition, name, unknown);
        }
        declared.push((name, mapper.map(&parsed)));
    }

    let navigation: Vec<(&String, &Relation, TypeExpr)> = related
        .iter()
        .map(|(name, relation)| {
            let ty = navigation_type(definition, name, relation, mapper, diagnostics);
            (name, relation, ty)
        })
        .collect();

    let mut claims = Claims {
        definition,
        scope: IdentScope::new(),
        diagnostics,
    };

    for (name, ty) in declared {
        resolved.data.push(DataField {
            ident: claims.claim(name, names::field_ident(name)),
            source: name.clone(),
            ty,
            role: FieldRole::Declared,
        });
    }

    for (name, relation, nav_ty) in &navigation {
        match relation.kind {
            RelationKind::ForOne => {
                resolved.data.push(foreign_key(&mut claims, name));
            }
            RelationKind::ForOnePoly => {
                let source = format!("{}_type", name);
                let ty = match nav_ty.union_members() {
                    Some(members) => {
                        TypeExpr::Literal(members.iter().map(|m| m.name.clone()).collect())
                    }
                    None => TypeExpr::string(),
                };
                resolved.data.push(DataField {
                    ident: claims.claim(&source, names::field_ident(&source)),
                    source,
                    ty,
                    role: FieldRole::Discriminator {
                        relation: name.to_string(),
                    },
                });
                resolved.data.push(foreign_key(&mut claims, name));
            }
            _ => {}
        }
    }

    for (name, relation, ty) in navigation {
        let ident = if relation.kind.is_many() {
            names::plural_field_ident(name)
        } else {
            names::field_ident(name)
        };
        resolved.navigation.push(NavField {
            ident: claims.claim(name, ident),
            relation: name.clone(),
            kind: relation.kind,
            ty,
        });
    }

    Ok(resolved)
}

fn foreign_key(claims: &mut Claims<'_>, relation: &str) -> DataField {
    let source = format!("{}_id", relation);
    DataField {
        ident: claims.claim(&source, names::field_ident(&source)),
        source,
        ty: TypeExpr::string(),
        role: FieldRole::ForeignKey {
            relation: relation.to_string(),
        },
    }
}

fn target_ref(
    definition: &str,
    relation: &str,
    target: &str,
    mapper: &TypeMapper<'_>,
    diagnostics: &mut Diagnostics,
) -> TypeRef {
    let r = mapper.target_ref(target);
    if r.kind.is_none() {
        diagnostics.unresolved_reference(definition, relation, target);
    }
    r
}

/// Target type of a relation, before any `Optional` wrapping
fn navigation_type(
    definition: &str,
    name: &str,
    relation: &Relation,
    mapper: &TypeMapper<'_>,
    diagnostics: &mut Diagnostics,
) -> TypeExpr {
    let target = if !relation.kind.is_poly() {
        let target = relation.target_name(name);
        TypeExpr::Reference(target_ref(definition, name, target, mapper, diagnostics))
    } else if !relation.for_kinds.is_empty() {
        let mut members: Vec<TypeRef> = Vec::with_capacity(relation.for_kinds.len());
        for kind in &relation.for_kinds {
            if !members.iter().any(|m| &m.name == kind) {
                members.push(target_ref(definition, name, kind, mapper, diagnostics));
            }
        }
        TypeExpr::Union(members)
    } else if let Some(through) = &relation.through {
        match mapper.through_ref(through) {
            Some(owner) => TypeExpr::Reference(owner),
            None => {
                diagnostics.unresolved_through(definition, name, through);
                TypeExpr::any()
            }
        }
    } else {
        TypeExpr::any()
    };

    if relation.kind.is_many() {
        TypeExpr::array(target)
    } else {
        target
    }
}
