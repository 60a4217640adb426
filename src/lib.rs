pub mod ast;
pub mod cycle;
pub mod emit;
pub mod error;
pub mod generate;
pub mod hook;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod scope;
pub mod tsdef;
pub mod validate;
pub mod view;

use wasm_bindgen::prelude::*;

pub use error::{Error, HookError, Result};
pub use generate::{
    Generated, compile, compile_with, generate, generate_enums, generate_scopes,
    generate_scopes_with, generate_structures, generate_with,
};
pub use hook::{CompileHooks, CompileTarget, NoHooks};
pub use scope::{GenerationScope, ScopeKind};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Compile schema source to TypeScript declarations, keyed by relative path.
///
/// `scope` is `entities`, `models` or `both` (default). `allow` is a
/// comma-separated allow-list for the entities scope.
#[wasm_bindgen(js_name = "schemaToTs")]
pub fn schema_to_ts(
    source: &str,
    scope: Option<String>,
    max_depth: Option<u32>,
    allow: Option<String>,
) -> std::result::Result<js_sys::Map, String> {
    let scopes = scopes_for(scope.as_deref(), max_depth, allow.as_deref())?;
    let generated = compile(source, &scopes).map_err(|e| e.to_string())?;

    let files = js_sys::Map::new();
    for (path, contents) in generated.files() {
        files.set(&JsValue::from_str(&path), &JsValue::from_str(&contents));
    }
    Ok(files)
}

fn scopes_for(
    scope: Option<&str>,
    max_depth: Option<u32>,
    allow: Option<&str>,
) -> std::result::Result<Vec<GenerationScope>, String> {
    let allow: Vec<&str> = allow
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let entities = GenerationScope::entities(allow);
    let models = GenerationScope::models(max_depth.unwrap_or(crate::scope::DEFAULT_MAX_DEPTH));

    match scope.unwrap_or("both") {
        "entities" => Ok(vec![entities]),
        "models" => Ok(vec![models]),
        "both" => Ok(vec![entities, models]),
        other => Err(format!("Unknown scope '{}' (expected entities, models or both)", other)),
    }
}
