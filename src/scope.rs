//! Generation scope configuration.

use std::collections::BTreeSet;

use crate::ast::Schema;
use crate::error::ScopeConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Expand only allow-listed relations (closed under inverses).
    Minimal,
    /// Expand every relation within `max_depth` hops of the root.
    Full,
}

impl ScopeKind {
    pub fn from_str(s: &str) -> Result<Self, ScopeConfigurationError> {
        match s {
            "minimal" => Ok(Self::Minimal),
            "full" => Ok(Self::Full),
            _ => Err(ScopeConfigurationError::UnknownScope(s.to_string())),
        }
    }
}

/// One generation run's policy. `name` doubles as the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationScope {
    pub name: String,
    pub kind: ScopeKind,
    pub max_depth: Option<u32>,
    pub allow_list: BTreeSet<String>,
}

pub const DEFAULT_MAX_DEPTH: u32 = 2;

impl GenerationScope {
    /// The `entities` preset: a minimal closure over `allow`.
    pub fn entities<I, S>(allow: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "entities".to_string(),
            kind: ScopeKind::Minimal,
            max_depth: None,
            allow_list: allow.into_iter().map(Into::into).collect(),
        }
    }

    /// The `models` preset: a full closure bounded by `max_depth`.
    pub fn models(max_depth: u32) -> Self {
        Self {
            name: "models".to_string(),
            kind: ScopeKind::Full,
            max_depth: Some(max_depth),
            allow_list: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn depth(&self) -> u32 {
        self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    /// Whether `entity.relation` is named by the allow-list, either qualified
    /// or as a bare relation name.
    pub fn allows(&self, entity: &str, relation: &str) -> bool {
        self.allow_list.contains(relation) || self.allow_list.contains(&format!("{entity}.{relation}"))
    }

    /// Reject configurations that do not fit the scope kind or name relations
    /// the schema does not have.
    pub fn validate(&self, schema: &Schema) -> Result<(), ScopeConfigurationError> {
        match self.kind {
            ScopeKind::Minimal if self.max_depth.is_some() => {
                return Err(ScopeConfigurationError::DepthOnMinimal(self.name.clone()));
            }
            ScopeKind::Full if !self.allow_list.is_empty() => {
                return Err(ScopeConfigurationError::AllowListOnFull(self.name.clone()));
            }
            _ => {}
        }

        for entry in &self.allow_list {
            let exists = match entry.split_once('.') {
                Some((entity, relation)) => schema
                    .entity(entity)
                    .is_some_and(|e| e.relation(relation).is_some()),
                None => schema
                    .entities
                    .iter()
                    .any(|e| e.relation(entry).is_some()),
            };
            if !exists {
                return Err(ScopeConfigurationError::UnknownRelation {
                    scope: self.name.clone(),
                    relation: entry.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Reject scope sets that would write into the same directory.
pub fn validate_scopes(scopes: &[GenerationScope]) -> Result<(), ScopeConfigurationError> {
    let mut seen = BTreeSet::new();
    for scope in scopes {
        if !seen.insert(scope.name.as_str()) {
            return Err(ScopeConfigurationError::DuplicateScope(scope.name.clone()));
        }
    }
    Ok(())
}
