//! Error taxonomy for a generation run.

use crate::parser::ParseError;
use thiserror::Error;

/// Referential problems in the schema itself. Fatal for the whole run.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaIntegrityError {
    #[error("duplicate entity '{0}'")]
    DuplicateEntity(String),

    #[error("duplicate enum '{0}'")]
    DuplicateEnum(String),

    #[error("'{entity}' declares field '{field}' more than once")]
    DuplicateField { entity: String, field: String },

    #[error("entity '{entity}' declares relation '{relation}' more than once")]
    DuplicateRelation { entity: String, relation: String },

    #[error("entity '{entity}' declares key '{key}' more than once")]
    DuplicateKey { entity: String, key: String },

    #[error("entity '{entity}' has no primary identifier (declare an 'id' field or key primary(..))")]
    MissingPrimaryKey { entity: String },

    #[error("entity '{entity}' key '{key}' references unknown field '{field}'")]
    UnknownKeyField {
        entity: String,
        key: String,
        field: String,
    },

    #[error("entity '{entity}' key '{key}' has no fields")]
    EmptyKey { entity: String, key: String },

    #[error("'{entity}' field '{field}' has unknown type '{typ}'")]
    UnknownFieldType {
        entity: String,
        field: String,
        typ: String,
    },

    #[error("entity '{entity}' relation '{relation}' targets unknown entity '{target}'")]
    DanglingTarget {
        entity: String,
        relation: String,
        target: String,
    },

    #[error("entity '{entity}' relation '{relation}' declares inverse '{inverse}' missing on '{target}'")]
    MissingInverse {
        entity: String,
        relation: String,
        target: String,
        inverse: String,
    },

    #[error(
        "entity '{entity}' relation '{relation}' declares inverse '{target}.{inverse}' which does not point back at '{entity}'"
    )]
    AsymmetricInverse {
        entity: String,
        relation: String,
        target: String,
        inverse: String,
    },

    #[error("entity '{entity}' relation '{relation}' has an empty polymorphic target list")]
    EmptyPolymorphicTarget { entity: String, relation: String },

    #[error("type name '{0}' is declared more than once")]
    DuplicateTypeName(String),

    #[error("enum '{name}' entry '{entry}' does not match the enum value type")]
    EnumValueMismatch { name: String, entry: String },

    #[error("entity '{entity}' relation '{relation}' derives field '{field}' which is already declared")]
    FieldCollision {
        entity: String,
        relation: String,
        field: String,
    },

    #[error("'{first}' and '{second}' would both be written to '{stem}.d.ts'")]
    FileStemCollision {
        first: String,
        second: String,
        stem: String,
    },
}

/// Problems in the scope configuration. Raised before any emission.
#[derive(Debug, Error, PartialEq)]
pub enum ScopeConfigurationError {
    #[error("unknown scope kind '{0}' (expected 'minimal' or 'full')")]
    UnknownScope(String),

    #[error("scope '{scope}' allow-list references unknown relation '{relation}'")]
    UnknownRelation { scope: String, relation: String },

    #[error("scope '{0}' is minimal and cannot take a max depth")]
    DepthOnMinimal(String),

    #[error("scope '{0}' is full and cannot take an allow-list")]
    AllowListOnFull(String),

    #[error("scope directory '{0}' is used by more than one scope")]
    DuplicateScope(String),
}

/// Any failure of a generation run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaIntegrityError),

    #[error("Scope error: {0}")]
    Scope(#[from] ScopeConfigurationError),

    #[error("Hook failed for {target}: {source}")]
    Hook { target: String, source: HookError },
}

/// Raised by a compile hook to abort the run.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
