//! Relation resolution: which relations of each entity are materialized in a
//! scope, and the fields they contribute.

use std::collections::BTreeSet;

use tracing::debug;

use crate::ast::{Entity, Relation, Schema};
use crate::scope::{GenerationScope, ScopeKind};
use crate::tsdef::{TsField, TsType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The declaring entity holds the key (`For*`).
    Forward,
    /// The key lives on the target (`Has*`).
    Inverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    One,
    Many,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedRelation {
    pub name: String,
    pub direction: Direction,
    pub multiplicity: Multiplicity,
    pub nullable: bool,
    /// One entry, or several for a polymorphic `For*` relation.
    pub targets: Vec<String>,
    pub polymorphic: bool,
    /// Identifier fields, always present (`companyID`, or `xID` + `xType`).
    pub key_fields: Vec<TsField>,
    /// Nested object field, present only when the scope reaches it.
    pub nested: Option<TsField>,
}

impl MaterializedRelation {
    pub fn is_expanded(&self) -> bool {
        self.nested.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    pub name: String,
    pub fields: Vec<TsField>,
    pub relations: Vec<MaterializedRelation>,
}

impl ResolvedEntity {
    /// Scalar fields followed by each relation's key and nested fields, in
    /// declaration order.
    pub fn all_fields(&self) -> Vec<TsField> {
        let mut fields = self.fields.clone();
        for relation in &self.relations {
            fields.extend(relation.key_fields.iter().cloned());
            fields.extend(relation.nested.iter().cloned());
        }
        fields
    }
}

/// Decides whether a relation is reachable at a given distance from the root
/// being generated. Pure over its inputs; safe to share between threads.
#[derive(Debug, Clone)]
pub struct ReachPolicy {
    kind: ScopeKind,
    max_depth: u32,
    allowed: BTreeSet<(String, String)>,
}

impl ReachPolicy {
    pub fn new(schema: &Schema, scope: &GenerationScope) -> Self {
        let allowed = match scope.kind {
            ScopeKind::Minimal => allowed_relations(schema, scope),
            ScopeKind::Full => BTreeSet::new(),
        };
        Self {
            kind: scope.kind,
            max_depth: scope.depth(),
            allowed,
        }
    }

    /// `distance` counts hops from the root; a root's own relations are at 1.
    pub fn reachable(&self, entity: &str, relation: &str, distance: u32) -> bool {
        match self.kind {
            ScopeKind::Minimal => self
                .allowed
                .contains(&(entity.to_string(), relation.to_string())),
            ScopeKind::Full => distance <= self.max_depth,
        }
    }
}

/// Resolve the allow-list to concrete `(entity, relation)` pairs, closed under
/// declared inverses in both directions.
fn allowed_relations(schema: &Schema, scope: &GenerationScope) -> BTreeSet<(String, String)> {
    let mut allowed: BTreeSet<(String, String)> = schema
        .entities
        .iter()
        .flat_map(|e| e.relations.iter().map(move |r| (e, r)))
        .filter(|(e, r)| scope.allows(&e.name, &r.name))
        .map(|(e, r)| (e.name.clone(), r.name.clone()))
        .collect();

    loop {
        let mut added = Vec::new();
        for entity in &schema.entities {
            for relation in &entity.relations {
                let Some(inverse) = &relation.inverse else {
                    continue;
                };
                let this = (entity.name.clone(), relation.name.clone());
                for target in relation.target.names() {
                    let other = (target.to_string(), inverse.clone());
                    if allowed.contains(&this) && !allowed.contains(&other) {
                        added.push(other);
                    } else if allowed.contains(&other) && !allowed.contains(&this) {
                        added.push(this.clone());
                    }
                }
            }
        }
        if added.is_empty() {
            break;
        }
        allowed.extend(added);
    }

    allowed
}

/// Resolution of every entity in a schema for one scope.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub entities: Vec<ResolvedEntity>,
    pub policy: ReachPolicy,
}

impl Resolution {
    pub fn entity(&self, name: &str) -> Option<&ResolvedEntity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Nested edges out of `entity`: `(relation, target)` for every target of
    /// every relation whose nested field is materialized.
    pub fn nested_edges<'a>(&'a self, entity: &str) -> Vec<(&'a str, &'a str)> {
        self.entity(entity)
            .map(|e| {
                e.relations
                    .iter()
                    .filter(|r| r.is_expanded())
                    .flat_map(|r| r.targets.iter().map(move |t| (r.name.as_str(), t.as_str())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Resolve every entity of a validated schema against `scope`.
pub fn resolve(schema: &Schema, scope: &GenerationScope) -> Resolution {
    let policy = ReachPolicy::new(schema, scope);
    let entities = schema
        .entities
        .iter()
        .map(|entity| resolve_entity(schema, &policy, entity))
        .collect();
    Resolution { entities, policy }
}

fn resolve_entity(schema: &Schema, policy: &ReachPolicy, entity: &Entity) -> ResolvedEntity {
    let fields = entity
        .fields
        .iter()
        .map(|f| TsField {
            name: f.name.clone(),
            typ: TsType::for_field(&f.typ),
            optional: f.nullable,
        })
        .collect();

    let relations: Vec<MaterializedRelation> = entity
        .relations
        .iter()
        .map(|relation| {
            let reachable = policy.reachable(&entity.name, &relation.name, 1);
            materialize(schema, relation, reachable)
        })
        .collect();

    debug!(
        entity = %entity.name,
        relations = relations.len(),
        expanded = relations.iter().filter(|r| r.is_expanded()).count(),
        "resolved entity"
    );

    ResolvedEntity {
        name: entity.name.clone(),
        fields,
        relations,
    }
}

/// `companyID` / `personIDs`.
fn key_field_name(relation: &str, many: bool) -> String {
    if many {
        format!("{relation}IDs")
    } else {
        format!("{relation}ID")
    }
}

/// `company` / `persons`.
fn nested_field_name(relation: &str, many: bool) -> String {
    if many {
        format!("{relation}s")
    } else {
        relation.to_string()
    }
}

fn type_field_name(relation: &str) -> String {
    format!("{relation}Type")
}

/// Every field name a relation can contribute to its entity, nested field
/// included.
pub fn relation_field_names(relation: &Relation) -> Vec<String> {
    let many = relation.kind.is_many();
    let mut names = vec![key_field_name(&relation.name, many)];
    if relation.kind.is_polymorphic_for() {
        names.push(type_field_name(&relation.name));
    }
    names.push(nested_field_name(&relation.name, many));
    names
}

fn materialize(schema: &Schema, relation: &Relation, reachable: bool) -> MaterializedRelation {
    let many = relation.kind.is_many();
    let targets: Vec<String> = relation
        .target
        .names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let name = relation.name.as_str();

    let (key_fields, nested_type) = if relation.kind.is_polymorphic_for() {
        let union = TsType::Union(targets.iter().map(|t| TsType::entity_ref(t)).collect());
        let id_type = if many {
            TsType::array(TsType::String)
        } else {
            TsType::String
        };
        let id = TsField::optional(key_field_name(name, many), id_type);
        let discriminator = TsField::optional(type_field_name(name), TsType::String);
        (vec![id, discriminator], union)
    } else {
        let target = targets.first().map(String::as_str).unwrap_or_default();
        let key_type = primary_key_type(schema, target);
        let id = if many {
            TsField::optional(key_field_name(name, many), TsType::array(key_type))
        } else {
            TsField {
                name: key_field_name(name, many),
                typ: key_type,
                optional: relation.nullable,
            }
        };
        (vec![id], TsType::entity_ref(target))
    };

    let nested = reachable.then(|| {
        let typ = if many {
            TsType::array(nested_type)
        } else {
            nested_type
        };
        TsField::optional(nested_field_name(name, many), typ)
    });

    MaterializedRelation {
        name: relation.name.clone(),
        direction: if relation.kind.is_forward() {
            Direction::Forward
        } else {
            Direction::Inverse
        },
        multiplicity: if many {
            Multiplicity::Many
        } else {
            Multiplicity::One
        },
        nullable: relation.nullable,
        polymorphic: relation.kind.is_polymorphic_for(),
        targets,
        key_fields,
        nested,
    }
}

/// Type of the target's primary identifier. Composite keys are carried as
/// opaque strings.
fn primary_key_type(schema: &Schema, target: &str) -> TsType {
    let Some(entity) = schema.entity(target) else {
        return TsType::String;
    };
    match entity.primary_key().as_deref() {
        Some([field]) => entity
            .field(field)
            .map(|f| TsType::for_field(&f.typ))
            .unwrap_or(TsType::String),
        _ => TsType::String,
    }
}
