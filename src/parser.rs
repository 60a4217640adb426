use crate::ast::*;
use crate::lexer::{LexError, Lexer, Token};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error("Unexpected token: {0:?}, expected {1}")]
    Unexpected(Token, &'static str),
    #[error("Unknown relation kind: {0}")]
    UnknownRelationKind(String),
    #[error("Unknown enum type: {0}")]
    UnknownEnumType(String),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &Token {
        let tok = self.tokens.get(self.pos).unwrap_or(&Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.advance().clone() {
            Token::Ident(s) => Ok(s),
            tok => Err(ParseError::Unexpected(tok, "identifier")),
        }
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> Result<(), ParseError> {
        let tok = self.advance().clone();
        if tok == expected {
            Ok(())
        } else {
            Err(ParseError::Unexpected(tok, what))
        }
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s == name)
    }

    pub fn parse(&mut self) -> Result<Schema, ParseError> {
        let mut schema = Schema::default();

        while *self.peek() != Token::Eof {
            if self.check_ident("entity") {
                self.advance();
                schema.entities.push(self.parse_entity()?);
            } else if self.check_ident("enum") {
                self.advance();
                schema.enums.push(self.parse_enum()?);
            } else if self.check_ident("structure") {
                self.advance();
                schema.structures.push(self.parse_structure()?);
            } else {
                return Err(ParseError::Unexpected(
                    self.peek().clone(),
                    "entity, enum or structure",
                ));
            }
        }

        Ok(schema)
    }

    fn parse_enum(&mut self) -> Result<Enum, ParseError> {
        let name = self.expect_ident()?;
        let type_name = self.expect_ident()?;
        let typ = EnumType::from_str(&type_name).ok_or(ParseError::UnknownEnumType(type_name))?;
        self.expect(Token::LBrace, "'{'")?;

        let mut entries = Vec::new();
        while *self.peek() != Token::RBrace {
            let entry_name = self.expect_ident()?;
            self.expect(Token::Eq, "'='")?;
            let value = match self.advance().clone() {
                Token::Str(s) => EnumValue::Str(s),
                Token::Num(n) => EnumValue::Int(n),
                Token::Float(f) => EnumValue::Float(f),
                tok => return Err(ParseError::Unexpected(tok, "enum value")),
            };
            entries.push(EnumEntry {
                name: entry_name,
                value,
            });
        }

        self.expect(Token::RBrace, "'}'")?;
        Ok(Enum { name, typ, entries })
    }

    fn parse_entity(&mut self) -> Result<Entity, ParseError> {
        let mut entity = Entity::new(self.expect_ident()?);
        self.expect(Token::LBrace, "'{'")?;

        while *self.peek() != Token::RBrace {
            if self.at_key() {
                self.advance();
                entity.keys.push(self.parse_key()?);
            } else if self.at_relation() {
                self.advance();
                entity.relations.push(self.parse_relation()?);
            } else {
                entity.fields.push(self.parse_field()?);
            }
        }

        self.expect(Token::RBrace, "'}'")?;
        Ok(entity)
    }

    /// `key label(` starts a key; `key string` is a field named `key`.
    fn at_key(&self) -> bool {
        self.check_ident("key")
            && matches!(self.peek_at(1), Token::Ident(_))
            && *self.peek_at(2) == Token::LParen
    }

    /// `rel name Kind ..` starts a relation; `rel string` is a field named
    /// `rel`. Relation kinds are PascalCase and field names are not.
    fn at_relation(&self) -> bool {
        self.check_ident("rel")
            && matches!(self.peek_at(1), Token::Ident(_))
            && matches!(self.peek_at(2), Token::Ident(kind) if kind.starts_with(|c: char| c.is_ascii_uppercase()))
    }

    fn parse_structure(&mut self) -> Result<Structure, ParseError> {
        let name = self.expect_ident()?;
        self.expect(Token::LBrace, "'{'")?;

        let mut fields = Vec::new();
        while *self.peek() != Token::RBrace {
            fields.push(self.parse_field()?);
        }

        self.expect(Token::RBrace, "'}'")?;
        Ok(Structure { name, fields })
    }

    fn parse_field(&mut self) -> Result<Field, ParseError> {
        let name = self.expect_ident()?;
        let type_name = self.expect_ident()?;
        let typ = match ScalarType::from_str(&type_name) {
            Some(scalar) => FieldType::Scalar(scalar),
            None => FieldType::Enum(type_name),
        };

        let nullable = *self.peek() == Token::Question;
        if nullable {
            self.advance();
        }

        Ok(Field {
            name,
            typ,
            nullable,
        })
    }

    /// Parse `label(field, field)`.
    fn parse_key(&mut self) -> Result<UniqueKey, ParseError> {
        let label = self.expect_ident()?;
        self.expect(Token::LParen, "'('")?;
        let fields = self.parse_ident_list()?;
        self.expect(Token::RParen, "')'")?;
        Ok(UniqueKey { label, fields })
    }

    fn parse_relation(&mut self) -> Result<Relation, ParseError> {
        let name = self.expect_ident()?;
        let kind_name = self.expect_ident()?;
        let kind =
            RelationKind::from_str(&kind_name).ok_or(ParseError::UnknownRelationKind(kind_name))?;

        let target = if kind.is_polymorphic_for() {
            self.expect(Token::LParen, "'(' before polymorphic targets")?;
            let names = self.parse_ident_list()?;
            self.expect(Token::RParen, "')'")?;
            RelationTarget::Union(names)
        } else {
            RelationTarget::Entity(self.expect_ident()?)
        };

        let mut nullable = true;
        let mut inverse = None;
        loop {
            if self.check_ident("required") {
                self.advance();
                nullable = false;
            } else if self.check_ident("nullable") {
                self.advance();
                nullable = true;
            } else if self.check_ident("inverse") {
                self.advance();
                inverse = Some(self.expect_ident()?);
            } else {
                break;
            }
        }

        Ok(Relation {
            name,
            kind,
            target,
            nullable,
            inverse,
        })
    }

    fn parse_ident_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut list = vec![self.expect_ident()?];
        while *self.peek() == Token::Comma {
            self.advance();
            list.push(self.expect_ident()?);
        }
        Ok(list)
    }
}

/// Parse schema source into a [`Schema`].
pub fn parse_schema(source: &str) -> Result<Schema, ParseError> {
    Parser::new(source)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity() {
        let input = r#"
            entity Person {
                id autoincrement
                firstName string
                nickname string?
                nationality Nationality
                key name(firstName, lastName)
            }
        "#;
        let schema = parse_schema(input).unwrap();
        assert_eq!(schema.entities.len(), 1);
        let person = &schema.entities[0];
        assert_eq!(person.name, "Person");
        assert_eq!(person.fields.len(), 4);
        assert_eq!(person.fields[0].typ, FieldType::Scalar(ScalarType::AutoIncrement));
        assert!(person.fields[2].nullable);
        assert_eq!(person.fields[3].typ, FieldType::Enum("Nationality".into()));
        assert_eq!(person.keys[0].label, "name");
        assert_eq!(person.keys[0].fields, vec!["firstName", "lastName"]);
    }

    #[test]
    fn test_parse_relations() {
        let input = r#"
            entity Company {
                id autoincrement
                rel person HasMany Person inverse company
                rel mainContact ForOne Contact required
                rel note HasManyPoly Comment inverse commentable
            }
            entity Comment {
                id autoincrement
                rel commentable ForOnePoly(Person, Company)
            }
        "#;
        let schema = parse_schema(input).unwrap();
        let company = &schema.entities[0];
        assert_eq!(company.relations.len(), 3);

        let person = &company.relations[0];
        assert_eq!(person.kind, RelationKind::HasMany);
        assert_eq!(person.target, RelationTarget::Entity("Person".into()));
        assert_eq!(person.inverse, Some("company".into()));
        assert!(person.nullable);

        assert!(!company.relations[1].nullable);

        let commentable = &schema.entities[1].relations[0];
        assert_eq!(
            commentable.target,
            RelationTarget::Union(vec!["Person".into(), "Company".into()])
        );
    }

    #[test]
    fn test_parse_enum() {
        let input = r#"
            enum Nationality string {
                DE = "German"
                FR = "French"
            }
            enum Level integer {
                Low = 1
                High = 10
            }
        "#;
        let schema = parse_schema(input).unwrap();
        assert_eq!(schema.enums.len(), 2);
        assert_eq!(schema.enums[0].typ, EnumType::String);
        assert_eq!(schema.enums[0].entries[1].value, EnumValue::Str("French".into()));
        assert_eq!(schema.enums[1].entries[1].value, EnumValue::Int(10));
    }

    #[test]
    fn test_unknown_relation_kind() {
        let input = "entity A { rel b BelongsTo B }";
        let err = parse_schema(input).unwrap_err();
        assert!(matches!(err, ParseError::UnknownRelationKind(k) if k == "BelongsTo"));
    }

    #[test]
    fn test_parse_structure() {
        let input = r#"
            structure Address {
                street string
                houseNr string
                zipCode string?
                country Country
            }
        "#;
        let schema = parse_schema(input).unwrap();
        let address = schema.structure("Address").unwrap();
        assert_eq!(address.fields.len(), 4);
        assert!(address.fields[2].nullable);
        assert_eq!(address.fields[3].typ, FieldType::Enum("Country".into()));
    }

    #[test]
    fn test_key_and_rel_as_field_names() {
        let input = r#"
            entity Setting {
                id autoincrement
                key string
                rel integer?
                rel owner ForOne Person
                key lookup(key)
            }
        "#;
        let schema = parse_schema(input).unwrap();
        let setting = &schema.entities[0];
        let names: Vec<&str> = setting.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "key", "rel"]);
        assert!(setting.fields[2].nullable);
        assert_eq!(setting.relations[0].name, "owner");
        assert_eq!(setting.keys[0].fields, vec!["key"]);
    }

    #[test]
    fn test_unexpected_top_level() {
        let err = parse_schema("view core { }").unwrap_err();
        assert!(matches!(err, ParseError::Unexpected(Token::Ident(_), _)));
    }
}
