//! Emission of resolved shapes into TypeScript declaration units.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::ast::{EnumValue, Schema};
use crate::cycle::ExpansionPlan;
use crate::error::Result;
use crate::hook::{CompileHooks, CompileTarget, run_hooks};
use crate::resolve::Resolution;
use crate::tsdef::{TsEnum, TsField, TsLiteral, TsObject, TsType, TypeRef, file_stem};
use crate::view::{IdentifierView, ProjectionKind};

/// Output directory for enum declarations.
pub const ENUMS_DIR: &str = "enums";

/// Output directory for structure declarations.
pub const STRUCTURES_DIR: &str = "structures";

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Object(TsObject),
    Enum(TsEnum),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Self::Object(object) => &object.name,
            Self::Enum(enum_def) => &enum_def.name,
        }
    }

    pub fn references(&self) -> Vec<TypeRef> {
        match self {
            Self::Object(object) => object.references(),
            Self::Enum(_) => Vec::new(),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Object(object) => render_object(object),
            Self::Enum(enum_def) => render_enum(enum_def),
        }
    }
}

/// Every declaration of one scope, stored once by name. Cross references
/// between declarations are by name only.
#[derive(Debug, Default)]
pub struct DeclArena {
    decls: BTreeMap<String, Declaration>,
}

impl DeclArena {
    /// Store `decl`. Returns `false` when an identical declaration is already
    /// present.
    ///
    /// # Panics
    /// If a different declaration was stored under the same name. That is an
    /// emission inconsistency in the engine, never a user error.
    pub fn insert(&mut self, decl: Declaration) -> bool {
        match self.decls.get(decl.name()) {
            Some(existing) => {
                assert_eq!(
                    existing,
                    &decl,
                    "emission inconsistency: '{}' emitted twice with different shapes",
                    decl.name()
                );
                false
            }
            None => {
                self.decls.insert(decl.name().to_string(), decl);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.decls.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitKind {
    Entity,
    View(ProjectionKind),
    Enum,
    Structure,
}

/// One emitted type declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedUnit {
    pub name: String,
    pub kind: UnitKind,
    /// Entity, enum or structure the unit belongs to; units sharing an owner
    /// share a file.
    pub owner: String,
    /// Output directory, the scope name.
    pub scope: String,
    pub references: Vec<TypeRef>,
    pub declaration: Declaration,
    pub text: String,
    /// Cycle-breaking plan for entity units. Diagnostic only: nested fields
    /// reference other declarations by name, so the plan never changes `text`.
    pub plan: Option<ExpansionPlan>,
}

impl EmittedUnit {
    fn new(scope: &str, owner: &str, kind: UnitKind, declaration: Declaration) -> Self {
        Self {
            name: declaration.name().to_string(),
            kind,
            owner: owner.to_string(),
            scope: scope.to_string(),
            references: declaration.references(),
            text: declaration.render(),
            declaration,
            plan: None,
        }
    }

    /// Imports followed by the declaration.
    pub fn render_standalone(&self) -> String {
        let mut out = render_imports(&self.references);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.text);
        out
    }
}

/// All units of one scope, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub scope: String,
    pub units: Vec<EmittedUnit>,
}

impl Output {
    pub fn unit(&self, name: &str) -> Option<&EmittedUnit> {
        self.units.iter().find(|u| u.name == name)
    }

    /// Merge units by owner into `(relative path, contents)` pairs, e.g.
    /// `models/contact-info.d.ts`. File order follows first appearance.
    pub fn files(&self) -> Vec<(String, String)> {
        let mut owners: Vec<&str> = Vec::new();
        for unit in &self.units {
            if !owners.contains(&unit.owner.as_str()) {
                owners.push(&unit.owner);
            }
        }

        owners
            .into_iter()
            .map(|owner| {
                let units: Vec<&EmittedUnit> =
                    self.units.iter().filter(|u| u.owner == owner).collect();

                let mut refs: Vec<TypeRef> = units
                    .iter()
                    .flat_map(|u| u.references.iter().cloned())
                    .filter(|r| !units.iter().any(|u| u.name == r.name))
                    .collect();
                refs.sort_by(|a, b| a.module.cmp(&b.module).then_with(|| a.name.cmp(&b.name)));
                refs.dedup();

                let mut contents = render_imports(&refs);
                for unit in units {
                    if !contents.is_empty() {
                        contents.push('\n');
                    }
                    contents.push_str(&unit.text);
                }

                (format!("{}/{}.d.ts", self.scope, file_stem(owner)), contents)
            })
            .collect()
    }
}

/// Emit entity and view units for one scope.
///
/// `plans` and `views` are indexed like `resolution.entities`. Each entity and
/// its views pass through `hooks` as one group.
///
/// # Panics
/// On an emission inconsistency: a name declared twice with different shapes,
/// or a reference to an entity that was never declared.
pub fn emit_scope(
    scope: &str,
    resolution: &Resolution,
    plans: Vec<ExpansionPlan>,
    views: Vec<Vec<IdentifierView>>,
    hooks: &dyn CompileHooks,
) -> Result<Output> {
    let mut arena = DeclArena::default();
    let mut units = Vec::new();

    for ((entity, plan), entity_views) in resolution.entities.iter().zip(plans).zip(views) {
        let mut kinds = vec![UnitKind::Entity];
        let mut declarations = vec![Declaration::Object(TsObject {
            name: entity.name.clone(),
            fields: entity.all_fields(),
        })];
        for view in entity_views {
            kinds.push(UnitKind::View(view.kind));
            declarations.push(Declaration::Object(view.object));
        }

        let target = CompileTarget::Entity {
            scope,
            name: &entity.name,
        };
        let declarations = run_hooks(hooks, target, declarations)?;

        let mut plan = Some(plan);
        for (kind, declaration) in kinds.into_iter().zip(declarations) {
            if arena.insert(declaration.clone()) {
                let mut unit = EmittedUnit::new(scope, &entity.name, kind, declaration);
                if unit.kind == UnitKind::Entity {
                    unit.plan = plan.take();
                }
                units.push(unit);
            }
        }
    }

    for unit in &units {
        for reference in &unit.references {
            let is_enum = reference.module.starts_with("../");
            assert!(
                is_enum || arena.contains(&reference.name),
                "emission inconsistency: '{}' references undeclared type '{}'",
                unit.name,
                reference.name
            );
        }
    }

    Ok(Output {
        scope: scope.to_string(),
        units,
    })
}

/// Emit one unit per enum into [`ENUMS_DIR`].
pub fn emit_enums(schema: &Schema, hooks: &dyn CompileHooks) -> Result<Output> {
    let mut arena = DeclArena::default();
    let mut units = Vec::new();

    for enum_def in &schema.enums {
        let declaration = Declaration::Enum(TsEnum {
            name: enum_def.name.clone(),
            entries: enum_def
                .entries
                .iter()
                .map(|entry| {
                    let literal = match &entry.value {
                        EnumValue::Str(s) => TsLiteral::Str(s.clone()),
                        EnumValue::Int(n) => TsLiteral::Int(*n),
                        EnumValue::Float(f) => TsLiteral::Float(*f),
                    };
                    (entry.name.clone(), literal)
                })
                .collect(),
        });

        let target = CompileTarget::Enum {
            name: &enum_def.name,
        };
        for declaration in run_hooks(hooks, target, vec![declaration])? {
            if arena.insert(declaration.clone()) {
                units.push(EmittedUnit::new(
                    ENUMS_DIR,
                    &enum_def.name,
                    UnitKind::Enum,
                    declaration,
                ));
            }
        }
    }

    Ok(Output {
        scope: ENUMS_DIR.to_string(),
        units,
    })
}

/// Emit one unit per structure into [`STRUCTURES_DIR`]. Structures carry
/// fields only, so their sole imports are enums.
pub fn emit_structures(schema: &Schema, hooks: &dyn CompileHooks) -> Result<Output> {
    let mut arena = DeclArena::default();
    let mut units = Vec::new();

    for structure in &schema.structures {
        let declaration = Declaration::Object(TsObject {
            name: structure.name.clone(),
            fields: structure
                .fields
                .iter()
                .map(|f| TsField {
                    name: f.name.clone(),
                    typ: TsType::for_field(&f.typ),
                    optional: f.nullable,
                })
                .collect(),
        });

        let target = CompileTarget::Structure {
            name: &structure.name,
        };
        for declaration in run_hooks(hooks, target, vec![declaration])? {
            if arena.insert(declaration.clone()) {
                units.push(EmittedUnit::new(
                    STRUCTURES_DIR,
                    &structure.name,
                    UnitKind::Structure,
                    declaration,
                ));
            }
        }
    }

    Ok(Output {
        scope: STRUCTURES_DIR.to_string(),
        units,
    })
}

fn render_object(object: &TsObject) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "export type {} = {{", object.name);
    for field in &object.fields {
        let marker = if field.optional { "?" } else { "" };
        let _ = writeln!(out, "\t{}{}: {}", field.name, marker, field.typ.syntax());
    }
    out.push_str("}\n");
    out
}

fn render_enum(enum_def: &TsEnum) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "export enum {} {{", enum_def.name);
    let last = enum_def.entries.len().saturating_sub(1);
    for (idx, (name, value)) in enum_def.entries.iter().enumerate() {
        let comma = if idx == last { "" } else { "," };
        let _ = writeln!(out, "\t{} = {}{}", name, value.syntax(), comma);
    }
    out.push_str("}\n");
    out
}

/// One `import` line per module; more than three names wrap onto separate lines.
fn render_imports(refs: &[TypeRef]) -> String {
    let mut by_module: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for reference in refs {
        let names = by_module.entry(reference.module.as_str()).or_default();
        if !names.contains(&reference.name.as_str()) {
            names.push(&reference.name);
        }
    }

    let mut out = String::new();
    for (module, names) in by_module {
        if names.len() <= 3 {
            let _ = writeln!(out, "import {{ {} }} from \"{}\"", names.join(", "), module);
        } else {
            out.push_str("import {\n");
            for name in names {
                let _ = writeln!(out, "\t{},", name);
            }
            let _ = writeln!(out, "}} from \"{}\"", module);
        }
    }
    out
}
