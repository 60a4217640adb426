//! The generation pipeline: validate, resolve, break cycles, project views,
//! emit.

use std::{panic, thread};

use tracing::{info, instrument};

use crate::ast::Schema;
use crate::cycle::plan_expansion;
use crate::emit::{Output, emit_enums, emit_scope, emit_structures};
use crate::error::Result;
use crate::hook::{CompileHooks, NoHooks};
use crate::parser::parse_schema;
use crate::resolve::resolve;
use crate::scope::{GenerationScope, validate_scopes};
use crate::validate::validate_schema;
use crate::view::project_views;

/// Generate one scope. Fails before emission on any schema or scope error.
pub fn generate(schema: &Schema, scope: &GenerationScope) -> Result<Output> {
    generate_with(schema, scope, &NoHooks)
}

pub fn generate_with(
    schema: &Schema,
    scope: &GenerationScope,
    hooks: &dyn CompileHooks,
) -> Result<Output> {
    validate_schema(schema)?;
    scope.validate(schema)?;
    generate_validated(schema, scope, hooks)
}

/// Generate the enum declarations of a schema.
pub fn generate_enums(schema: &Schema) -> Result<Output> {
    validate_schema(schema)?;
    emit_enums(schema, &NoHooks)
}

/// Generate the structure declarations of a schema.
pub fn generate_structures(schema: &Schema) -> Result<Output> {
    validate_schema(schema)?;
    emit_structures(schema, &NoHooks)
}

/// Generate several scopes over one schema. Outputs come back in the order of
/// `scopes`. Every scope is validated before any generation starts, so a
/// failed run produces nothing.
pub fn generate_scopes(schema: &Schema, scopes: &[GenerationScope]) -> Result<Vec<Output>> {
    generate_scopes_with(schema, scopes, &NoHooks)
}

pub fn generate_scopes_with(
    schema: &Schema,
    scopes: &[GenerationScope],
    hooks: &dyn CompileHooks,
) -> Result<Vec<Output>> {
    validate_schema(schema)?;
    validate_scopes(scopes)?;
    for scope in scopes {
        scope.validate(schema)?;
    }
    run_scopes(schema, scopes, hooks)
}

/// Scopes run on scoped threads, one per scope. wasm32-unknown-unknown has no
/// threads, so there, and for a single scope, they run in order on the
/// calling thread.
fn run_scopes(
    schema: &Schema,
    scopes: &[GenerationScope],
    hooks: &dyn CompileHooks,
) -> Result<Vec<Output>> {
    if cfg!(target_arch = "wasm32") || scopes.len() < 2 {
        run_sequential(schema, scopes, hooks)
    } else {
        run_threaded(schema, scopes, hooks)
    }
}

fn run_sequential(
    schema: &Schema,
    scopes: &[GenerationScope],
    hooks: &dyn CompileHooks,
) -> Result<Vec<Output>> {
    scopes
        .iter()
        .map(|scope| generate_validated(schema, scope, hooks))
        .collect()
}

fn run_threaded(
    schema: &Schema,
    scopes: &[GenerationScope],
    hooks: &dyn CompileHooks,
) -> Result<Vec<Output>> {
    thread::scope(|s| {
        let handles: Vec<_> = scopes
            .iter()
            .map(|scope| s.spawn(move || generate_validated(schema, scope, hooks)))
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|err| panic::resume_unwind(err)))
            .collect()
    })
}

/// Everything one source produces: enums, structures and one output per
/// scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub enums: Output,
    pub structures: Output,
    pub scopes: Vec<Output>,
}

impl Generated {
    /// `(relative path, contents)` for every file: enums, then structures,
    /// then scopes.
    pub fn files(&self) -> Vec<(String, String)> {
        [&self.enums, &self.structures]
            .into_iter()
            .chain(&self.scopes)
            .flat_map(Output::files)
            .collect()
    }
}

/// Parse `source` and generate `scopes`, enums and structures.
pub fn compile(source: &str, scopes: &[GenerationScope]) -> Result<Generated> {
    compile_with(source, scopes, &NoHooks)
}

pub fn compile_with(
    source: &str,
    scopes: &[GenerationScope],
    hooks: &dyn CompileHooks,
) -> Result<Generated> {
    let schema = parse_schema(source)?;
    validate_schema(&schema)?;
    let enums = emit_enums(&schema, hooks)?;
    let structures = emit_structures(&schema, hooks)?;
    let scopes = generate_scopes_with(&schema, scopes, hooks)?;
    Ok(Generated {
        enums,
        structures,
        scopes,
    })
}

#[instrument(skip_all, fields(scope = %scope.name))]
fn generate_validated(
    schema: &Schema,
    scope: &GenerationScope,
    hooks: &dyn CompileHooks,
) -> Result<Output> {
    let resolution = resolve(schema, scope);

    let plans = schema
        .entities
        .iter()
        .map(|entity| plan_expansion(&resolution, &entity.name))
        .collect();

    let views = schema
        .entities
        .iter()
        .zip(&resolution.entities)
        .map(|(entity, resolved)| project_views(entity, resolved))
        .collect();

    let output = emit_scope(&scope.name, &resolution, plans, views, hooks)?;
    info!(
        entities = schema.entities.len(),
        units = output.units.len(),
        "scope generated"
    );
    Ok(output)
}
