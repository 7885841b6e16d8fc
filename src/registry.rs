//! Schema Registry
//!
//! Read-only view of every definition handed to the compiler, plus the
//! [`RegistryIndex`] built once per compilation run for cross-kind lookups.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, Result};
use crate::schema::{DefinitionKind, Entity, EnumDef, Model, Relation, Structure};

/// All definitions of a schema, keyed by name within each kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RegistryDocument", into = "RegistryDocument")]
pub struct Registry {
    models: BTreeMap<String, Model>,
    structures: BTreeMap<String, Structure>,
    entities: BTreeMap<String, Entity>,
    enums: BTreeMap<String, EnumDef>,
}

/// Serialized form: one list per kind
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    models: Vec<Model>,
    #[serde(default)]
    structures: Vec<Structure>,
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    enums: Vec<EnumDef>,
}

impl TryFrom<RegistryDocument> for Registry {
    type Error = CompileError;

    fn try_from(doc: RegistryDocument) -> Result<Self> {
        let mut registry = Registry::new();
        for model in doc.models {
            registry.insert_model(model)?;
        }
        for structure in doc.structures {
            registry.insert_structure(structure)?;
        }
        for entity in doc.entities {
            registry.insert_entity(entity)?;
        }
        for enum_def in doc.enums {
            registry.insert_enum(enum_def)?;
        }
        Ok(registry)
    }
}

impl From<Registry> for RegistryDocument {
    fn from(registry: Registry) -> Self {
        Self {
            models: registry.models.into_values().collect(),
            structures: registry.structures.into_values().collect(),
            entities: registry.entities.into_values().collect(),
            enums: registry.enums.into_values().collect(),
        }
    }
}

fn insert_unique<T>(
    map: &mut BTreeMap<String, T>,
    kind: DefinitionKind,
    name: &str,
    value: T,
) -> Result<()> {
    if map.contains_key(name) {
        return Err(CompileError::DuplicateDefinition {
            kind,
            name: name.to_string(),
        });
    }
    map.insert(name.to_string(), value);
    Ok(())
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a registry from its JSON document form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert_model(&mut self, model: Model) -> Result<()> {
        let name = model.name.clone();
        insert_unique(&mut self.models, DefinitionKind::Model, &name, model)
    }

    pub fn insert_structure(&mut self, structure: Structure) -> Result<()> {
        let name = structure.name.clone();
        insert_unique(&mut self.structures, DefinitionKind::Structure, &name, structure)
    }

    pub fn insert_entity(&mut self, entity: Entity) -> Result<()> {
        let name = entity.name.clone();
        insert_unique(&mut self.entities, DefinitionKind::Entity, &name, entity)
    }

    pub fn insert_enum(&mut self, enum_def: EnumDef) -> Result<()> {
        let name = enum_def.name.clone();
        insert_unique(&mut self.enums, DefinitionKind::Enum, &name, enum_def)
    }

    /// Builder form of [`Registry::insert_model`]; later duplicates replace earlier ones
    pub fn with_model(mut self, model: Model) -> Self {
        self.models.insert(model.name.clone(), model);
        self
    }

    pub fn with_structure(mut self, structure: Structure) -> Self {
        self.structures.insert(structure.name.clone(), structure);
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    pub fn with_enum(mut self, enum_def: EnumDef) -> Self {
        self.enums.insert(enum_def.name.clone(), enum_def);
        self
    }

    pub fn models(&self) -> &BTreeMap<String, Model> {
        &self.models
    }

    pub fn structures(&self) -> &BTreeMap<String, Structure> {
        &self.structures
    }

    pub fn entities(&self) -> &BTreeMap<String, Entity> {
        &self.entities
    }

    pub fn enums(&self) -> &BTreeMap<String, EnumDef> {
        &self.enums
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Names of every definition of a kind, sorted
    pub fn names(&self, kind: DefinitionKind) -> Vec<&str> {
        match kind {
            DefinitionKind::Model => self.models.keys().map(String::as_str).collect(),
            DefinitionKind::Structure => self.structures.keys().map(String::as_str).collect(),
            DefinitionKind::Entity => self.entities.keys().map(String::as_str).collect(),
            DefinitionKind::Enum => self.enums.keys().map(String::as_str).collect(),
        }
    }

    pub fn contains(&self, kind: DefinitionKind, name: &str) -> bool {
        match kind {
            DefinitionKind::Model => self.models.contains_key(name),
            DefinitionKind::Structure => self.structures.contains_key(name),
            DefinitionKind::Entity => self.entities.contains_key(name),
            DefinitionKind::Enum => self.enums.contains_key(name),
        }
    }

    /// Relation maps of every definition that can carry relations
    fn relation_owners(&self) -> impl Iterator<Item = (DefinitionKind, &str, &BTreeMap<String, Relation>)> {
        let models = self
            .models
            .values()
            .map(|m| (DefinitionKind::Model, m.name.as_str(), &m.related));
        let entities = self
            .entities
            .values()
            .map(|e| (DefinitionKind::Entity, e.name.as_str(), &e.related));
        models.chain(entities)
    }

    pub fn len(&self) -> usize {
        self.models.len() + self.structures.len() + self.entities.len() + self.enums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Registry Index
// =============================================================================

/// Fallback order when the context kind does not hold a name
const LOOKUP_ORDER: [DefinitionKind; 4] = [
    DefinitionKind::Enum,
    DefinitionKind::Structure,
    DefinitionKind::Model,
    DefinitionKind::Entity,
];

/// Read-only lookup tables built once per compilation run.
///
/// Replaces repeated full registry scans with two hash lookups:
/// name -> kinds declaring it, and polymorphic relation name -> owners.
#[derive(Debug, Clone, Default)]
pub struct RegistryIndex {
    /// Kinds declaring each name, in LOOKUP_ORDER
    kinds: HashMap<String, Vec<DefinitionKind>>,

    /// Polymorphic relation name -> (owner kind, owner name), sorted
    poly_owners: HashMap<String, Vec<(DefinitionKind, String)>>,
}

impl RegistryIndex {
    pub fn build(registry: &Registry) -> Self {
        let mut kinds: HashMap<String, Vec<DefinitionKind>> = HashMap::with_capacity(registry.len());
        for kind in LOOKUP_ORDER {
            for name in registry.names(kind) {
                kinds.entry(name.to_string()).or_default().push(kind);
            }
        }

        let mut poly_owners: HashMap<String, Vec<(DefinitionKind, String)>> = HashMap::new();
        for (kind, owner, related) in registry.relation_owners() {
            for (relation_name, relation) in related {
                if relation.kind.is_poly() {
                    poly_owners
                        .entry(relation_name.clone())
                        .or_default()
                        .push((kind, owner.to_string()));
                }
            }
        }
        for owners in poly_owners.values_mut() {
            owners.sort();
        }

        Self { kinds, poly_owners }
    }

    /// Kinds declaring a name
    pub fn kinds_of(&self, name: &str) -> &[DefinitionKind] {
        self.kinds.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve a name used as a field type.
    ///
    /// Enums win, then structures, then the context kind, then the rest.
    pub fn resolve_type(&self, name: &str, context: DefinitionKind) -> Option<DefinitionKind> {
        let kinds = self.kinds_of(name);
        [DefinitionKind::Enum, DefinitionKind::Structure, context]
            .into_iter()
            .chain(LOOKUP_ORDER)
            .find(|k| kinds.contains(k))
    }

    /// Resolve a name used as a relation target; the context kind wins.
    pub fn resolve_target(&self, name: &str, context: DefinitionKind) -> Option<DefinitionKind> {
        let kinds = self.kinds_of(name);
        std::iter::once(context)
            .chain(LOOKUP_ORDER)
            .find(|k| kinds.contains(k))
    }

    /// Find the definition owning a polymorphic relation named `through`.
    ///
    /// Owners of the context kind are preferred; ties go to the smallest name.
    pub fn through_owner(&self, through: &str, context: DefinitionKind) -> Option<(DefinitionKind, &str)> {
        let owners = self.poly_owners.get(through)?;
        owners
            .iter()
            .find(|(kind, _)| *kind == context)
            .or_else(|| owners.first())
            .map(|(kind, name)| (*kind, name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumValueType, RelationKind};

    fn sample() -> Registry {
        Registry::new()
            .with_enum(EnumDef::new("Status", EnumValueType::String))
            .with_structure(Structure::new("Address"))
            .with_model(Model::new("Person"))
            .with_entity(Entity::new("Person"))
            .with_model(
                Model::new("Comment").related(
                    "Commentable",
                    Relation::new(RelationKind::ForOnePoly).for_kinds(["Post", "Video"]),
                ),
            )
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let mut registry = Registry::new();
        registry.insert_model(Model::new("Person")).unwrap();
        let err = registry.insert_model(Model::new("Person")).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateDefinition { .. }));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "models": [{"name": "Person", "fields": {"ID": {"type": "AutoIncrement"}}}],
            "enums": [{"name": "Status", "type": "String", "entries": {"Active": "active"}}]
        }"#;
        let registry = Registry::from_json(json).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(DefinitionKind::Model, "Person"));
        assert!(registry.contains(DefinitionKind::Enum, "Status"));
    }

    #[test]
    fn test_from_json_duplicate() {
        let json = r#"{"models": [{"name": "A"}, {"name": "A"}]}"#;
        assert!(Registry::from_json(json).is_err());
    }

    #[test]
    fn test_resolve_type_prefers_enum_then_context() {
        let index = RegistryIndex::build(&sample());
        assert_eq!(index.resolve_type("Status", DefinitionKind::Model), Some(DefinitionKind::Enum));
        assert_eq!(index.resolve_type("Person", DefinitionKind::Entity), Some(DefinitionKind::Entity));
        assert_eq!(index.resolve_type("Person", DefinitionKind::Model), Some(DefinitionKind::Model));
        assert_eq!(index.resolve_type("Person", DefinitionKind::Structure), Some(DefinitionKind::Model));
        assert_eq!(index.resolve_type("Missing", DefinitionKind::Model), None);
    }

    #[test]
    fn test_through_owner() {
        let index = RegistryIndex::build(&sample());
        assert_eq!(
            index.through_owner("Commentable", DefinitionKind::Model),
            Some((DefinitionKind::Model, "Comment"))
        );
        assert_eq!(
            index.through_owner("Commentable", DefinitionKind::Entity),
            Some((DefinitionKind::Model, "Comment"))
        );
        assert_eq!(index.through_owner("Taggable", DefinitionKind::Model), None);
    }
}
