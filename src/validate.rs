//! Referential integrity checks over a parsed schema.
//!
//! Checks run in declaration order and stop at the first problem, so the
//! reported error is stable for a given schema.

use std::collections::{HashMap, HashSet};

use crate::ast::{EnumType, EnumValue, Field, FieldType, Relation, RelationTarget, Schema};
use crate::error::SchemaIntegrityError;
use crate::resolve::relation_field_names;
use crate::tsdef::file_stem;
use crate::view::view_type_name;

pub fn validate_schema(schema: &Schema) -> Result<(), SchemaIntegrityError> {
    check_type_names(schema)?;
    check_file_stems(schema.enums.iter().map(|e| e.name.as_str()))?;
    check_file_stems(schema.structures.iter().map(|s| s.name.as_str()))?;
    check_file_stems(schema.entities.iter().map(|e| e.name.as_str()))?;
    check_enums(schema)?;

    for structure in &schema.structures {
        check_fields(schema, &structure.name, &structure.fields)?;
    }

    for entity in &schema.entities {
        check_fields(schema, &entity.name, &entity.fields)?;

        let mut labels = HashSet::new();
        for key in &entity.keys {
            if !labels.insert(key.label.as_str()) {
                return Err(SchemaIntegrityError::DuplicateKey {
                    entity: entity.name.clone(),
                    key: key.label.clone(),
                });
            }
            if key.fields.is_empty() {
                return Err(SchemaIntegrityError::EmptyKey {
                    entity: entity.name.clone(),
                    key: key.label.clone(),
                });
            }
            if let Some(field) = key.fields.iter().find(|f| entity.field(f).is_none()) {
                return Err(SchemaIntegrityError::UnknownKeyField {
                    entity: entity.name.clone(),
                    key: key.label.clone(),
                    field: field.clone(),
                });
            }
        }

        if entity.primary_key().is_none() {
            return Err(SchemaIntegrityError::MissingPrimaryKey {
                entity: entity.name.clone(),
            });
        }

        let mut relations = HashSet::new();
        let mut emitted: HashSet<String> = entity.fields.iter().map(|f| f.name.clone()).collect();
        for relation in &entity.relations {
            if !relations.insert(relation.name.as_str()) {
                return Err(SchemaIntegrityError::DuplicateRelation {
                    entity: entity.name.clone(),
                    relation: relation.name.clone(),
                });
            }
            check_relation(schema, &entity.name, relation)?;

            for field in relation_field_names(relation) {
                if !emitted.insert(field.clone()) {
                    return Err(SchemaIntegrityError::FieldCollision {
                        entity: entity.name.clone(),
                        relation: relation.name.clone(),
                        field,
                    });
                }
            }
        }
    }

    Ok(())
}

fn check_fields(schema: &Schema, owner: &str, fields: &[Field]) -> Result<(), SchemaIntegrityError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaIntegrityError::DuplicateField {
                entity: owner.to_string(),
                field: field.name.clone(),
            });
        }
        if let FieldType::Enum(name) = &field.typ {
            if schema.enum_def(name).is_none() {
                return Err(SchemaIntegrityError::UnknownFieldType {
                    entity: owner.to_string(),
                    field: field.name.clone(),
                    typ: name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Entity, enum, structure and identifier-view names share one namespace.
fn check_type_names(schema: &Schema) -> Result<(), SchemaIntegrityError> {
    let mut seen = HashSet::new();

    for enum_def in &schema.enums {
        if !seen.insert(enum_def.name.clone()) {
            return Err(SchemaIntegrityError::DuplicateEnum(enum_def.name.clone()));
        }
    }
    for structure in &schema.structures {
        if !seen.insert(structure.name.clone()) {
            return Err(SchemaIntegrityError::DuplicateTypeName(structure.name.clone()));
        }
    }
    for entity in &schema.entities {
        if schema.entities.iter().filter(|e| e.name == entity.name).count() > 1 {
            return Err(SchemaIntegrityError::DuplicateEntity(entity.name.clone()));
        }
        if !seen.insert(entity.name.clone()) {
            return Err(SchemaIntegrityError::DuplicateTypeName(entity.name.clone()));
        }
    }
    for entity in &schema.entities {
        let labels = std::iter::once("primary").chain(
            entity
                .keys
                .iter()
                .filter(|k| !k.is_primary())
                .map(|k| k.label.as_str()),
        );
        for label in labels {
            let name = view_type_name(&entity.name, label);
            if !seen.insert(name.clone()) {
                return Err(SchemaIntegrityError::DuplicateTypeName(name));
            }
        }
    }

    Ok(())
}

/// Names written into one directory must not share a file stem.
fn check_file_stems<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), SchemaIntegrityError> {
    let mut stems: HashMap<String, &str> = HashMap::new();
    for name in names {
        let stem = file_stem(name);
        if let Some(first) = stems.get(&stem) {
            if *first != name {
                return Err(SchemaIntegrityError::FileStemCollision {
                    first: first.to_string(),
                    second: name.to_string(),
                    stem,
                });
            }
        }
        stems.insert(stem, name);
    }
    Ok(())
}

fn check_enums(schema: &Schema) -> Result<(), SchemaIntegrityError> {
    for enum_def in &schema.enums {
        for entry in &enum_def.entries {
            let matches = matches!(
                (enum_def.typ, &entry.value),
                (EnumType::String, EnumValue::Str(_))
                    | (EnumType::Integer, EnumValue::Int(_))
                    | (EnumType::Float, EnumValue::Float(_))
                    | (EnumType::Float, EnumValue::Int(_))
            );
            if !matches {
                return Err(SchemaIntegrityError::EnumValueMismatch {
                    name: enum_def.name.clone(),
                    entry: entry.name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn check_relation(
    schema: &Schema,
    source: &str,
    relation: &Relation,
) -> Result<(), SchemaIntegrityError> {
    let targets = relation.target.names();
    if targets.is_empty() {
        return Err(SchemaIntegrityError::EmptyPolymorphicTarget {
            entity: source.to_string(),
            relation: relation.name.clone(),
        });
    }

    for target in targets {
        let Some(target_entity) = schema.entity(target) else {
            return Err(SchemaIntegrityError::DanglingTarget {
                entity: source.to_string(),
                relation: relation.name.clone(),
                target: target.to_string(),
            });
        };

        let Some(inverse) = &relation.inverse else {
            continue;
        };
        let Some(back) = target_entity.relation(inverse) else {
            return Err(SchemaIntegrityError::MissingInverse {
                entity: source.to_string(),
                relation: relation.name.clone(),
                target: target.to_string(),
                inverse: inverse.clone(),
            });
        };

        let points_back = match &back.target {
            RelationTarget::Entity(name) => name == source,
            RelationTarget::Union(names) => names.iter().any(|n| n == source),
        };
        // A poly `Has*` must be answered by a poly `For*`, and vice versa.
        let poly_consistent = !relation.kind.is_polymorphic_has() || back.kind.is_polymorphic_for();
        if !points_back || !poly_consistent {
            return Err(SchemaIntegrityError::AsymmetricInverse {
                entity: source.to_string(),
                relation: relation.name.clone(),
                target: target.to_string(),
                inverse: inverse.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema;

    fn check(input: &str) -> Result<(), SchemaIntegrityError> {
        validate_schema(&parse_schema(input).unwrap())
    }

    #[test]
    fn test_valid_cyclic_schema() {
        let input = r#"
            entity Person {
                id autoincrement
                rel company ForOne Company inverse person
                rel parent ForOne Person
            }
            entity Company {
                id autoincrement
                rel person HasMany Person inverse company
            }
        "#;
        assert_eq!(check(input), Ok(()));
    }

    #[test]
    fn test_dangling_target() {
        let input = "entity Person { id autoincrement rel company ForOne Company }";
        assert_eq!(
            check(input),
            Err(SchemaIntegrityError::DanglingTarget {
                entity: "Person".into(),
                relation: "company".into(),
                target: "Company".into(),
            })
        );
    }

    #[test]
    fn test_missing_inverse() {
        let input = r#"
            entity Person { id autoincrement rel company ForOne Company inverse staff }
            entity Company { id autoincrement }
        "#;
        assert!(matches!(
            check(input),
            Err(SchemaIntegrityError::MissingInverse { inverse, .. }) if inverse == "staff"
        ));
    }

    #[test]
    fn test_asymmetric_inverse() {
        let input = r#"
            entity Person { id autoincrement rel company ForOne Company inverse office }
            entity Company { id autoincrement rel office HasOne Office }
            entity Office { id autoincrement }
        "#;
        assert!(matches!(
            check(input),
            Err(SchemaIntegrityError::AsymmetricInverse { relation, target, .. })
                if relation == "company" && target == "Company"
        ));
    }

    #[test]
    fn test_poly_inverse_must_point_back() {
        let input = r#"
            entity Comment { id autoincrement rel commentable ForOnePoly(Person) }
            entity Company { id autoincrement rel note HasManyPoly Comment inverse commentable }
            entity Person { id autoincrement }
        "#;
        assert!(matches!(
            check(input),
            Err(SchemaIntegrityError::AsymmetricInverse { entity, .. }) if entity == "Company"
        ));
    }

    #[test]
    fn test_unknown_key_field() {
        let input = "entity Person { id autoincrement key name(firstName) }";
        assert_eq!(
            check(input),
            Err(SchemaIntegrityError::UnknownKeyField {
                entity: "Person".into(),
                key: "name".into(),
                field: "firstName".into(),
            })
        );
    }

    #[test]
    fn test_missing_primary_key() {
        let input = "entity Tag { label string }";
        assert!(matches!(
            check(input),
            Err(SchemaIntegrityError::MissingPrimaryKey { .. })
        ));
        assert_eq!(check("entity Tag { label string key primary(label) }"), Ok(()));
    }

    #[test]
    fn test_unknown_field_type() {
        let input = "entity Person { id autoincrement nationality Nationality }";
        assert!(matches!(
            check(input),
            Err(SchemaIntegrityError::UnknownFieldType { typ, .. }) if typ == "Nationality"
        ));
    }

    #[test]
    fn test_view_name_collision() {
        let input = r#"
            entity Person { id autoincrement }
            entity PersonIDPrimary { id autoincrement }
        "#;
        assert_eq!(
            check(input),
            Err(SchemaIntegrityError::DuplicateTypeName("PersonIDPrimary".into()))
        );
    }

    #[test]
    fn test_enum_value_mismatch() {
        let input = r#"enum Level integer { Low = "low" }"#;
        assert!(matches!(
            check(input),
            Err(SchemaIntegrityError::EnumValueMismatch { entry, .. }) if entry == "Low"
        ));
    }

    #[test]
    fn test_duplicate_field() {
        let input = "entity Person { id autoincrement id uuid }";
        assert!(matches!(
            check(input),
            Err(SchemaIntegrityError::DuplicateField { field, .. }) if field == "id"
        ));
    }

    #[test]
    fn test_derived_key_field_collides_with_scalar() {
        let input = r#"
            entity Person {
                id autoincrement
                companyID integer
                rel company ForOne Company
            }
            entity Company { id autoincrement }
        "#;
        assert_eq!(
            check(input),
            Err(SchemaIntegrityError::FieldCollision {
                entity: "Person".into(),
                relation: "company".into(),
                field: "companyID".into(),
            })
        );
    }

    #[test]
    fn test_derived_nested_field_collides_with_relation() {
        let input = r#"
            entity Company {
                id autoincrement
                rel person HasMany Person
                rel persons HasOne Person
            }
            entity Person { id autoincrement }
        "#;
        assert!(matches!(
            check(input),
            Err(SchemaIntegrityError::FieldCollision { relation, field, .. })
                if relation == "persons" && field == "persons"
        ));
    }

    #[test]
    fn test_poly_type_field_collides_with_scalar() {
        let input = r#"
            entity Comment {
                id autoincrement
                commentableType string
                rel commentable ForOnePoly(Person)
            }
            entity Person { id autoincrement }
        "#;
        assert!(matches!(
            check(input),
            Err(SchemaIntegrityError::FieldCollision { field, .. }) if field == "commentableType"
        ));
    }

    #[test]
    fn test_entity_file_stem_collision() {
        let input = r#"
            entity ContactInfo { id autoincrement }
            entity Contact_Info { id autoincrement }
        "#;
        assert_eq!(
            check(input),
            Err(SchemaIntegrityError::FileStemCollision {
                first: "ContactInfo".into(),
                second: "Contact_Info".into(),
                stem: "contact-info".into(),
            })
        );
    }

    #[test]
    fn test_stems_only_collide_within_one_directory() {
        let input = r#"
            enum Status string { Active = "active" }
            structure STATUS { code string }
        "#;
        assert_eq!(check(input), Ok(()));
    }

    #[test]
    fn test_structure_fields() {
        assert!(matches!(
            check("structure Address { street string street string }"),
            Err(SchemaIntegrityError::DuplicateField { entity, .. }) if entity == "Address"
        ));
        assert!(matches!(
            check("structure Address { country Country }"),
            Err(SchemaIntegrityError::UnknownFieldType { typ, .. }) if typ == "Country"
        ));
        assert_eq!(
            check("structure Person { name string } entity Person { id autoincrement }"),
            Err(SchemaIntegrityError::DuplicateTypeName("Person".into()))
        );
    }
}
