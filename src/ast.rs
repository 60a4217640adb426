#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub enums: Vec<Enum>,
    pub structures: Vec<Structure>,
    pub entities: Vec<Entity>,
}

impl Schema {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&Enum> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn structure(&self, name: &str) -> Option<&Structure> {
        self.structures.iter().find(|s| s.name == name)
    }
}

/// A plain value shape: fields only, no identity and no relations.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub fields: Vec<Field>,
    pub relations: Vec<Relation>,
    pub keys: Vec<UniqueKey>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            relations: Vec::new(),
            keys: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Field names of the primary identifier: the declared `primary` key,
    /// falling back to a field literally named `id`.
    pub fn primary_key(&self) -> Option<Vec<&str>> {
        if let Some(key) = self.keys.iter().find(|k| k.is_primary()) {
            return Some(key.fields.iter().map(|f| f.as_str()).collect());
        }
        self.field("id").map(|f| vec![f.name.as_str()])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub typ: FieldType,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Scalar(ScalarType),
    Enum(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Uuid,
    AutoIncrement,
    String,
    Integer,
    Float,
    Boolean,
    Time,
    Date,
    Protected,
    Sealed,
}

impl ScalarType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "uuid" => Some(Self::Uuid),
            "autoincrement" => Some(Self::AutoIncrement),
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "boolean" => Some(Self::Boolean),
            "time" => Some(Self::Time),
            "date" => Some(Self::Date),
            "protected" => Some(Self::Protected),
            "sealed" => Some(Self::Sealed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub target: RelationTarget,
    pub nullable: bool,
    pub inverse: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    ForOne,
    ForMany,
    HasOne,
    HasMany,
    ForOnePoly,
    ForManyPoly,
    HasOnePoly,
    HasManyPoly,
}

impl RelationKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ForOne" => Some(Self::ForOne),
            "ForMany" => Some(Self::ForMany),
            "HasOne" => Some(Self::HasOne),
            "HasMany" => Some(Self::HasMany),
            "ForOnePoly" => Some(Self::ForOnePoly),
            "ForManyPoly" => Some(Self::ForManyPoly),
            "HasOnePoly" => Some(Self::HasOnePoly),
            "HasManyPoly" => Some(Self::HasManyPoly),
            _ => None,
        }
    }

    pub fn is_many(self) -> bool {
        matches!(
            self,
            Self::ForMany | Self::HasMany | Self::ForManyPoly | Self::HasManyPoly
        )
    }

    /// `For*` relations hold the key on the declaring entity.
    pub fn is_forward(self) -> bool {
        matches!(
            self,
            Self::ForOne | Self::ForMany | Self::ForOnePoly | Self::ForManyPoly
        )
    }

    /// Only `For*Poly` relations carry a union of targets.
    pub fn is_polymorphic_for(self) -> bool {
        matches!(self, Self::ForOnePoly | Self::ForManyPoly)
    }

    pub fn is_polymorphic_has(self) -> bool {
        matches!(self, Self::HasOnePoly | Self::HasManyPoly)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationTarget {
    Entity(String),
    Union(Vec<String>),
}

impl RelationTarget {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Entity(name) => vec![name.as_str()],
            Self::Union(names) => names.iter().map(|n| n.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniqueKey {
    pub label: String,
    pub fields: Vec<String>,
}

impl UniqueKey {
    pub fn is_primary(&self) -> bool {
        self.label == "primary"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
    pub name: String,
    pub typ: EnumType,
    pub entries: Vec<EnumEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumType {
    String,
    Integer,
    Float,
}

impl EnumType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumEntry {
    pub name: String,
    pub value: EnumValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnumValue {
    Str(String),
    Int(i64),
    Float(f64),
}
