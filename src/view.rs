//! Identifier views: one reduced type per unique key of an entity.

use convert_case::{Case, Casing};

use crate::ast::Entity;
use crate::resolve::ResolvedEntity;
use crate::tsdef::{TsField, TsObject};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionKind {
    Primary,
    /// An alternate unique key, by its declared label.
    Alternate(String),
}

impl ProjectionKind {
    pub fn label(&self) -> &str {
        match self {
            Self::Primary => "primary",
            Self::Alternate(label) => label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierView {
    pub entity: String,
    pub kind: ProjectionKind,
    pub object: TsObject,
}

/// `PersonIDPrimary`, `ContactInfoIDEmail`.
pub fn view_type_name(entity: &str, label: &str) -> String {
    format!("{}ID{}", entity, label.to_case(Case::Pascal))
}

/// Project the views of one entity: Primary first, then alternates in
/// declaration order. Fields are copied from the resolved scalar fields only.
///
/// Assumes a validated schema; unknown key fields are skipped.
pub fn project_views(entity: &Entity, resolved: &ResolvedEntity) -> Vec<IdentifierView> {
    let mut keys: Vec<(ProjectionKind, Vec<&str>)> = Vec::new();

    if let Some(primary) = entity.primary_key() {
        keys.push((ProjectionKind::Primary, primary));
    }
    for key in entity.keys.iter().filter(|k| !k.is_primary()) {
        keys.push((
            ProjectionKind::Alternate(key.label.clone()),
            key.fields.iter().map(String::as_str).collect(),
        ));
    }

    keys.into_iter()
        .map(|(kind, field_names)| {
            let fields: Vec<TsField> = field_names
                .iter()
                .filter_map(|name| resolved.fields.iter().find(|f| f.name == *name))
                .cloned()
                .collect();
            IdentifierView {
                entity: entity.name.clone(),
                object: TsObject {
                    name: view_type_name(&entity.name, kind.label()),
                    fields,
                },
                kind,
            }
        })
        .collect()
}
