//! TypeScript type expressions and declaration shapes.

use convert_case::{Case, Casing};

use crate::ast::{FieldType, ScalarType};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TsType {
    String,
    Number,
    Boolean,
    Date,
    /// A declared type, referenced by name and imported from `module`.
    Named { name: String, module: String },
    Array(Box<TsType>),
    Union(Vec<TsType>),
}

impl TsType {
    pub fn for_field(typ: &FieldType) -> Self {
        match typ {
            FieldType::Scalar(scalar) => Self::for_scalar(*scalar),
            FieldType::Enum(name) => Self::enum_ref(name),
        }
    }

    pub fn for_scalar(scalar: ScalarType) -> Self {
        match scalar {
            ScalarType::Uuid | ScalarType::String | ScalarType::Protected | ScalarType::Sealed => {
                Self::String
            }
            ScalarType::AutoIncrement | ScalarType::Integer | ScalarType::Float => Self::Number,
            ScalarType::Boolean => Self::Boolean,
            ScalarType::Time | ScalarType::Date => Self::Date,
        }
    }

    /// Entity types live next to each other in the scope directory.
    pub fn entity_ref(name: &str) -> Self {
        Self::Named {
            name: name.to_string(),
            module: format!("./{}", file_stem(name)),
        }
    }

    /// Enums live in a sibling `enums` directory.
    pub fn enum_ref(name: &str) -> Self {
        Self::Named {
            name: name.to_string(),
            module: format!("../enums/{}", file_stem(name)),
        }
    }

    pub fn array(inner: TsType) -> Self {
        Self::Array(Box::new(inner))
    }

    pub fn syntax(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Number => "number".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Date => "Date".to_string(),
            Self::Named { name, .. } => name.clone(),
            Self::Array(inner) => match inner.as_ref() {
                Self::Union(_) => format!("({})[]", inner.syntax()),
                _ => format!("{}[]", inner.syntax()),
            },
            Self::Union(types) => types
                .iter()
                .map(|t| t.syntax())
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    /// Append every named type used by this expression, in order of appearance.
    pub fn collect_refs(&self, out: &mut Vec<TypeRef>) {
        match self {
            Self::Named { name, module } => out.push(TypeRef {
                name: name.clone(),
                module: module.clone(),
            }),
            Self::Array(inner) => inner.collect_refs(out),
            Self::Union(types) => types.iter().for_each(|t| t.collect_refs(out)),
            _ => {}
        }
    }
}

/// A type another unit must import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef {
    pub name: String,
    pub module: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsField {
    pub name: String,
    pub typ: TsType,
    pub optional: bool,
}

impl TsField {
    pub fn required(name: impl Into<String>, typ: TsType) -> Self {
        Self {
            name: name.into(),
            typ,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, typ: TsType) -> Self {
        Self {
            name: name.into(),
            typ,
            optional: true,
        }
    }
}

/// `export type Name = { ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsObject {
    pub name: String,
    pub fields: Vec<TsField>,
}

impl TsObject {
    /// Distinct named types used by the fields, excluding the object itself,
    /// sorted by module path.
    pub fn references(&self) -> Vec<TypeRef> {
        let mut refs = Vec::new();
        for field in &self.fields {
            field.typ.collect_refs(&mut refs);
        }
        refs.retain(|r| r.name != self.name);
        refs.sort_by(|a, b| a.module.cmp(&b.module).then_with(|| a.name.cmp(&b.name)));
        refs.dedup();
        refs
    }
}

/// `export enum Name { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct TsEnum {
    pub name: String,
    pub entries: Vec<(String, TsLiteral)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TsLiteral {
    Str(String),
    Int(i64),
    Float(f64),
}

impl TsLiteral {
    pub fn syntax(&self) -> String {
        match self {
            Self::Str(s) => quote(s),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}

/// Single-quoted string literal. Control characters and line separators are
/// escaped so the literal stays on one line.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' | '\u{2029}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// File stem for a declared type: `ContactInfo` -> `contact-info`.
pub fn file_stem(name: &str) -> String {
    name.to_case(Case::Kebab)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_mapping() {
        assert_eq!(TsType::for_scalar(ScalarType::Uuid), TsType::String);
        assert_eq!(TsType::for_scalar(ScalarType::AutoIncrement), TsType::Number);
        assert_eq!(TsType::for_scalar(ScalarType::Sealed), TsType::String);
        assert_eq!(TsType::for_scalar(ScalarType::Time), TsType::Date);
        assert_eq!(TsType::for_scalar(ScalarType::Boolean), TsType::Boolean);
    }

    #[test]
    fn test_syntax() {
        let union = TsType::Union(vec![TsType::entity_ref("Person"), TsType::entity_ref("Company")]);
        assert_eq!(union.syntax(), "Person | Company");
        assert_eq!(TsType::array(union).syntax(), "(Person | Company)[]");
        assert_eq!(TsType::array(TsType::Number).syntax(), "number[]");
    }

    #[test]
    fn test_module_paths() {
        assert_eq!(
            TsType::entity_ref("ContactInfo"),
            TsType::Named {
                name: "ContactInfo".into(),
                module: "./contact-info".into()
            }
        );
        assert_eq!(
            TsType::enum_ref("Nationality"),
            TsType::Named {
                name: "Nationality".into(),
                module: "../enums/nationality".into()
            }
        );
    }

    #[test]
    fn test_references_dedup_and_skip_self() {
        let object = TsObject {
            name: "Person".into(),
            fields: vec![
                TsField::optional("company", TsType::entity_ref("Company")),
                TsField::optional("employer", TsType::entity_ref("Company")),
                TsField::optional("parent", TsType::entity_ref("Person")),
                TsField::required("nationality", TsType::enum_ref("Nationality")),
            ],
        };
        let refs = object.references();
        let names: Vec<&str> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Nationality", "Company"]);
    }

    #[test]
    fn test_literal_syntax() {
        assert_eq!(TsLiteral::Str("German".into()).syntax(), "'German'");
        assert_eq!(TsLiteral::Str("it's".into()).syntax(), "'it\\'s'");
        assert_eq!(TsLiteral::Int(3).syntax(), "3");
    }

    #[test]
    fn test_literal_escapes_control_characters() {
        assert_eq!(TsLiteral::Str("x\ny".into()).syntax(), "'x\\ny'");
        assert_eq!(TsLiteral::Str("a\tb\rc".into()).syntax(), "'a\\tb\\rc'");
        assert_eq!(TsLiteral::Str("nul\0".into()).syntax(), "'nul\\u0000'");
        assert_eq!(TsLiteral::Str("ls\u{2028}".into()).syntax(), "'ls\\u2028'");
        assert!(!TsLiteral::Str("line\nbreak".into()).syntax().contains('\n'));
    }
}
