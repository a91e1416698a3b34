//! JavaScript façade over [`Session`], persisted in `window.localStorage`.

use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;

use crate::config::EditorConfig;
use crate::export::{ExportBackends, ExportFormat};
use crate::model::{Endpoint, Position};
use crate::persistence::{KeyValueStore, StoreError};
use crate::relationship::Connection;
use crate::schema::Grammar;
use crate::session::Session;

/// The browser's `localStorage`, reached through the global object.
pub struct LocalStorage {
    storage: JsValue,
}

impl LocalStorage {
    pub fn open() -> Result<Self, StoreError> {
        let storage = Reflect::get(&js_sys::global(), &JsValue::from_str("localStorage"))
            .map_err(|e| unavailable("localStorage", &e))?;
        if storage.is_undefined() || storage.is_null() {
            return Err(StoreError::Unavailable("localStorage is not defined".into()));
        }
        Ok(Self { storage })
    }

    fn method(&self, name: &str) -> Result<Function, StoreError> {
        Reflect::get(&self.storage, &JsValue::from_str(name))
            .map_err(|e| unavailable(name, &e))?
            .dyn_into::<Function>()
            .map_err(|e| unavailable(name, &e))
    }
}

fn unavailable(what: &str, e: &JsValue) -> StoreError {
    StoreError::Unavailable(format!("{}: {:?}", what, e))
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .method("getItem")?
            .call1(&self.storage, &JsValue::from_str(key))
            .map_err(|e| unavailable("getItem", &e))?;
        Ok(value.as_string())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.method("setItem")?
            .call2(&self.storage, &JsValue::from_str(key), &JsValue::from_str(value))
            .map_err(|e| unavailable("setItem", &e))?;
        Ok(())
    }
}

/// Editor session for the browser host.
///
/// Collections cross the boundary as JSON in the persisted layout.
#[wasm_bindgen]
pub struct Editor {
    session: Session<LocalStorage>,
}

#[wasm_bindgen]
impl Editor {
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<Editor, String> {
        let config = match config {
            Some(json) => EditorConfig::from_json(&json).map_err(|e| e.to_string())?,
            None => EditorConfig::default(),
        };
        let storage = LocalStorage::open().map_err(|e| e.to_string())?;
        Ok(Editor {
            session: Session::open(config, storage),
        })
    }

    /// `{ nodes, edges, legend }`
    pub fn snapshot(&self) -> Result<String, String> {
        serde_json::to_string(&self.session.snapshot()).map_err(|e| e.to_string())
    }

    #[wasm_bindgen(js_name = "setGrammar")]
    pub fn set_grammar(&mut self, grammar: &str) -> bool {
        match Grammar::from_str(grammar) {
            Some(g) => {
                self.session.set_grammar(g);
                true
            }
            None => false,
        }
    }

    // Table panel

    #[wasm_bindgen(js_name = "setTableName")]
    pub fn set_table_name(&mut self, name: &str) {
        self.session.set_table_name(name);
    }

    #[wasm_bindgen(js_name = "setSchemaText")]
    pub fn set_schema_text(&mut self, text: &str) {
        self.session.set_schema_text(text);
    }

    #[wasm_bindgen(js_name = "setColor")]
    pub fn set_color(&mut self, color: &str) {
        self.session.set_color(color);
    }

    #[wasm_bindgen(getter, js_name = "tableName")]
    pub fn table_name(&self) -> String {
        self.session.form().name.clone()
    }

    #[wasm_bindgen(getter, js_name = "schemaText")]
    pub fn schema_text(&self) -> String {
        self.session.form().schema_text.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn color(&self) -> String {
        self.session.form().color.clone()
    }

    #[wasm_bindgen(getter, js_name = "editingNode")]
    pub fn editing_node(&self) -> Option<String> {
        self.session.form().editing.clone()
    }

    #[wasm_bindgen(js_name = "submitTable")]
    pub fn submit_table(&mut self) -> Option<String> {
        self.session.submit_table()
    }

    #[wasm_bindgen(js_name = "editNode")]
    pub fn edit_node(&mut self, id: &str) -> bool {
        self.session.edit_node(id)
    }

    #[wasm_bindgen(js_name = "cancelEdit")]
    pub fn cancel_edit(&mut self) {
        self.session.cancel_edit();
    }

    #[wasm_bindgen(js_name = "moveNode")]
    pub fn move_node(&mut self, id: &str, x: f64, y: f64) -> bool {
        self.session.move_node(id, Position::new(x, y))
    }

    #[wasm_bindgen(js_name = "deleteNode")]
    pub fn delete_node(&mut self, id: &str) -> bool {
        self.session.delete_node(id)
    }

    /// Edit button on a rendered node.
    #[wasm_bindgen(js_name = "nodeEdit")]
    pub fn node_edit(&mut self, id: &str) -> bool {
        self.trigger(id, true)
    }

    /// Delete button on a rendered node.
    #[wasm_bindgen(js_name = "nodeDelete")]
    pub fn node_delete(&mut self, id: &str) -> bool {
        self.trigger(id, false)
    }

    // Relationship panel

    #[wasm_bindgen(js_name = "selectSource")]
    pub fn select_source(&mut self, handle: &str) {
        self.session.select_source(handle);
    }

    #[wasm_bindgen(js_name = "selectTarget")]
    pub fn select_target(&mut self, handle: &str) {
        self.session.select_target(handle);
    }

    /// Returns the kind actually selected; unknown names fall back.
    #[wasm_bindgen(js_name = "setKind")]
    pub fn set_kind(&mut self, kind: &str) -> String {
        self.session.set_kind_name(kind).as_str().to_string()
    }

    #[wasm_bindgen(js_name = "setEdgeLabel")]
    pub fn set_edge_label(&mut self, label: Option<String>) {
        self.session.set_edge_label(label.filter(|l| !l.trim().is_empty()));
    }

    pub fn link(&mut self) -> Option<String> {
        self.session.link()
    }

    pub fn connect(
        &mut self,
        source: String,
        source_handle: Option<String>,
        target: String,
        target_handle: Option<String>,
    ) -> Option<String> {
        self.session.connect(Connection {
            source,
            source_handle,
            target,
            target_handle,
        })
    }

    /// Current source selector value (`node|column`), e.g. after `selectEdge`.
    #[wasm_bindgen(getter, js_name = "selectedSource")]
    pub fn selected_source(&self) -> Option<String> {
        self.session.relationship().source().map(Endpoint::to_handle)
    }

    #[wasm_bindgen(getter, js_name = "selectedTarget")]
    pub fn selected_target(&self) -> Option<String> {
        self.session.relationship().target().map(Endpoint::to_handle)
    }

    #[wasm_bindgen(getter, js_name = "selectedKind")]
    pub fn selected_kind(&self) -> String {
        self.session.relationship().kind().as_str().to_string()
    }

    #[wasm_bindgen(js_name = "selectEdge")]
    pub fn select_edge(&mut self, id: &str) -> bool {
        self.session.select_edge(id)
    }

    #[wasm_bindgen(js_name = "cancelLink")]
    pub fn cancel_link(&mut self) {
        self.session.cancel_link();
    }

    #[wasm_bindgen(js_name = "deleteEdge")]
    pub fn delete_edge(&mut self, id: &str) -> bool {
        self.session.delete_edge(id)
    }

    // Legend

    #[wasm_bindgen(js_name = "addLegendEntry")]
    pub fn add_legend_entry(&mut self, name: &str, color: &str, description: &str) -> String {
        self.session.add_legend_entry(name, color, description)
    }

    #[wasm_bindgen(js_name = "updateLegendEntry")]
    pub fn update_legend_entry(&mut self, id: &str, name: &str, color: &str, description: &str) -> bool {
        self.session.update_legend_entry(id, name, color, description)
    }

    #[wasm_bindgen(js_name = "removeLegendEntry")]
    pub fn remove_legend_entry(&mut self, id: &str) -> bool {
        self.session.remove_legend_entry(id)
    }

    // Whole state

    /// Erase everything if `confirm()` returns a truthy value.
    pub fn reset(&mut self, confirm: &Function) -> bool {
        self.session.reset(|| {
            confirm
                .call0(&JsValue::NULL)
                .map(|answer| answer.is_truthy())
                .unwrap_or(false)
        })
    }

    #[wasm_bindgen(js_name = "importJson")]
    pub fn import_json(&mut self, json: &str) -> Result<(), String> {
        self.session.import_json(json).map_err(|e| e.to_string())
    }

    /// JSON or SVG bytes. Raster and PDF output are produced by the page
    /// from the SVG view.
    pub fn export(&self, format: &str) -> Result<Vec<u8>, String> {
        let format =
            ExportFormat::from_str(format).ok_or_else(|| format!("Unknown export format: {}", format))?;
        let job = self.session.begin_export(format);
        self.session
            .export(&job, ExportBackends::default())
            .map(|artifact| artifact.bytes)
            .ok_or_else(|| format!("{:?} export failed", format))
    }
}

impl Editor {
    fn trigger(&mut self, id: &str, edit: bool) -> bool {
        let Some(node) = self.session.bound_node(id) else {
            return false;
        };
        if edit {
            node.edit();
        } else {
            node.delete();
        }
        self.session.process_actions() > 0
    }
}
