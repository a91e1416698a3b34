pub mod bindings;
pub mod config;
pub mod export;
pub mod legend;
pub mod measure;
pub mod model;
pub mod persistence;
pub mod presentation;
pub mod relationship;
pub mod schema;
pub mod session;
pub mod store;
pub mod svg;
pub mod web;

use wasm_bindgen::prelude::*;

use schema::Grammar;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Parse column declarations to `[{ name, isPK }]` JSON
#[wasm_bindgen(js_name = "parseColumns")]
pub fn parse_columns(text: &str, grammar: Option<String>) -> Result<String, String> {
    let grammar = grammar
        .as_deref()
        .and_then(Grammar::from_str)
        .unwrap_or_default();

    let columns = schema::parse(text, grammar);
    serde_json::to_string(&columns).map_err(|e| e.to_string())
}
