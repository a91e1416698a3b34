//! The editor session: single owner of all graph state.
//!
//! Hosts read snapshots and call the mutation methods below. Every
//! successful mutation is followed by a persistence sync and a rebind of
//! node behavior; a rejected one changes nothing.

use std::rc::Rc;
use tracing::{debug, error, info};

use crate::bindings::{ActionQueue, BoundNode, NodeAction, NodeBindings, NodeDispatch};
use crate::config::EditorConfig;
use crate::export::{ExportArtifact, ExportBackends, ExportError, ExportFormat, ExportJob};
use crate::legend::Legend;
use crate::model::{CardinalityKind, EdgeId, Endpoint, NodeData, NodeId, Position, Snapshot};
use crate::persistence::{FileStore, KeyValueStore, PersistenceAdapter};
use crate::relationship::{Connection, RelationshipBuilder};
use crate::schema::{self, Grammar};
use crate::store::GraphStore;

/// Contents of the table panel.
#[derive(Debug, Clone, PartialEq)]
pub struct TableForm {
    pub name: String,
    pub schema_text: String,
    pub color: String,
    /// Node being edited; submitting updates it instead of creating.
    pub editing: Option<NodeId>,
}

impl TableForm {
    fn blank(color: &str) -> Self {
        Self {
            name: String::new(),
            schema_text: String::new(),
            color: color.to_string(),
            editing: None,
        }
    }
}

pub struct Session<S> {
    config: EditorConfig,
    store: GraphStore,
    legend: Legend,
    builder: RelationshipBuilder,
    form: TableForm,
    grammar: Grammar,
    persistence: PersistenceAdapter<S>,
    bindings: NodeBindings,
    queue: Rc<ActionQueue>,
    dispatch: Rc<dyn NodeDispatch>,
}

impl<S: KeyValueStore> Session<S> {
    /// Load persisted state and bind node behavior.
    pub fn open(config: EditorConfig, kv: S) -> Self {
        let persistence = PersistenceAdapter::new(kv);
        let loaded = persistence.load();

        let mut store = GraphStore::new(config.identity, config.default_position);
        store.hydrate(loaded.nodes, loaded.edges);
        let legend = Legend::new(loaded.legend);

        let queue = Rc::new(ActionQueue::default());
        let dispatch: Rc<dyn NodeDispatch> = queue.clone();

        let mut session = Self {
            form: TableForm::blank(&config.default_color),
            grammar: config.grammar,
            config,
            store,
            legend,
            builder: RelationshipBuilder::new(),
            persistence,
            bindings: NodeBindings::new(),
            queue,
            dispatch,
        };

        let snapshot = session.snapshot();
        session.persistence.mark_saved(&snapshot);
        session.bindings.attach(&snapshot.nodes, &session.dispatch);
        info!(
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "session opened"
        );
        session
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.store.nodes(),
            edges: self.store.edges(),
            legend: self.legend.entries(),
        }
    }

    pub fn graph(&self) -> &GraphStore {
        &self.store
    }

    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    pub fn persistence(&self) -> &PersistenceAdapter<S> {
        &self.persistence
    }

    pub fn form(&self) -> &TableForm {
        &self.form
    }

    pub fn relationship(&self) -> &RelationshipBuilder {
        &self.builder
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    pub fn set_grammar(&mut self, grammar: Grammar) {
        self.grammar = grammar;
    }

    // --- tables ---

    pub fn set_table_name(&mut self, name: &str) {
        self.form.name = name.to_string();
    }

    pub fn set_schema_text(&mut self, text: &str) {
        self.form.schema_text = text.to_string();
    }

    pub fn set_color(&mut self, color: &str) {
        self.form.color = color.to_string();
    }

    /// Create a table from the form, or update the table being edited.
    ///
    /// A blank name, blank schema text, or text that parses to no columns
    /// leaves everything untouched.
    pub fn submit_table(&mut self) -> Option<NodeId> {
        let name = self.form.name.trim();
        if name.is_empty() || self.form.schema_text.trim().is_empty() {
            debug!("table needs a name and a schema, skipping");
            return None;
        }
        let columns = schema::parse(&self.form.schema_text, self.grammar);
        if columns.is_empty() {
            debug!("schema text has no columns, skipping");
            return None;
        }
        let data = NodeData::new(name, columns, self.form.color.clone());

        let id = match self.form.editing.clone() {
            Some(editing) => {
                let id = self.store.update_node(&editing, data)?;
                if id != editing {
                    self.builder.rename_node(&editing, &id);
                    if let Some(edge) = self.builder.editing().map(str::to_string) {
                        if self.store.edge(&edge).is_none() {
                            self.builder.forget_edge(&edge);
                        }
                    }
                }
                id
            }
            None => self.store.create_node(data)?,
        };

        self.form = TableForm::blank(&self.config.default_color);
        self.commit();
        Some(id)
    }

    /// Load a node into the form with clean, re-parseable column text.
    pub fn edit_node(&mut self, id: &str) -> bool {
        let Some(node) = self.store.node(id) else {
            return false;
        };
        self.form = TableForm {
            name: node.data.label.clone(),
            schema_text: schema::render(&node.data.columns, self.grammar),
            color: if node.data.color.is_empty() {
                self.config.default_color.clone()
            } else {
                node.data.color.clone()
            },
            editing: Some(node.id.clone()),
        };
        true
    }

    pub fn cancel_edit(&mut self) {
        self.form = TableForm::blank(&self.config.default_color);
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> bool {
        if !self.store.move_node(id, position) {
            return false;
        }
        self.commit();
        true
    }

    /// Delete a node and every edge touching it.
    pub fn delete_node(&mut self, id: &str) -> bool {
        let touching: Vec<EdgeId> = self.store.edges_touching(id).map(|e| e.id.clone()).collect();
        if !self.store.delete_node(id) {
            return false;
        }
        if self.form.editing.as_deref() == Some(id) {
            self.cancel_edit();
        }
        for edge in &touching {
            self.builder.forget_edge(edge);
        }
        self.commit();
        true
    }

    // --- relationships ---

    /// Select the source from a `node|column` selector value.
    pub fn select_source(&mut self, handle: &str) {
        self.builder.select_source(Endpoint::from_handle(handle));
    }

    pub fn select_target(&mut self, handle: &str) {
        self.builder.select_target(Endpoint::from_handle(handle));
    }

    pub fn set_kind(&mut self, kind: CardinalityKind) {
        self.builder.set_kind(kind);
    }

    pub fn set_kind_name(&mut self, name: &str) -> CardinalityKind {
        self.builder.set_kind_name(name)
    }

    pub fn set_edge_label(&mut self, label: Option<String>) {
        self.builder.set_label(label);
    }

    /// Save the relationship selection: updates the selected edge, or links.
    pub fn link(&mut self) -> Option<EdgeId> {
        let id = self.builder.save(&mut self.store)?;
        self.commit();
        Some(id)
    }

    /// Canvas drag-connect with the selected kind.
    pub fn connect(&mut self, connection: Connection) -> Option<EdgeId> {
        let id = self.builder.connect(&mut self.store, connection)?;
        self.commit();
        Some(id)
    }

    /// Load an edge into the relationship panel for editing.
    pub fn select_edge(&mut self, id: &str) -> bool {
        match self.store.edge(id) {
            Some(edge) => {
                self.builder.load_edge(edge);
                true
            }
            None => false,
        }
    }

    pub fn cancel_link(&mut self) {
        self.builder.cancel();
    }

    pub fn delete_edge(&mut self, id: &str) -> bool {
        if !self.store.delete_edge(id) {
            return false;
        }
        self.builder.forget_edge(id);
        self.commit();
        true
    }

    // --- legend ---

    pub fn add_legend_entry(&mut self, name: &str, color: &str, description: &str) -> String {
        let id = self.legend.add(name, color, description);
        self.commit();
        id
    }

    pub fn update_legend_entry(&mut self, id: &str, name: &str, color: &str, description: &str) -> bool {
        if !self.legend.update(id, name, color, description) {
            return false;
        }
        self.commit();
        true
    }

    pub fn remove_legend_entry(&mut self, id: &str) -> bool {
        if !self.legend.remove(id) {
            return false;
        }
        self.commit();
        true
    }

    // --- node behavior ---

    pub fn bound_nodes(&self) -> &[BoundNode] {
        self.bindings.bound()
    }

    pub fn bound_node(&self, id: &str) -> Option<&BoundNode> {
        self.bindings.get(id)
    }

    /// Route node edit/delete through a host dispatch instead of the
    /// session's own queue.
    pub fn set_dispatch(&mut self, dispatch: Rc<dyn NodeDispatch>) -> bool {
        self.dispatch = dispatch;
        self.bindings.attach(&self.store.nodes(), &self.dispatch)
    }

    /// Apply edit/delete actions queued by bound nodes.
    pub fn process_actions(&mut self) -> usize {
        let actions = self.queue.drain();
        let count = actions.len();
        for action in actions {
            match action {
                NodeAction::Edit(id) => {
                    self.edit_node(&id);
                }
                NodeAction::Delete(id) => {
                    self.delete_node(&id);
                }
            }
        }
        count
    }

    // --- whole-state operations ---

    /// Replace all state with an imported JSON export.
    pub fn import_json(&mut self, json: &str) -> Result<(), ExportError> {
        let snapshot = crate::export::from_json(json)?;
        self.store
            .hydrate(snapshot.nodes.to_vec(), snapshot.edges.to_vec());
        self.legend.replace(snapshot.legend.to_vec());
        self.form = TableForm::blank(&self.config.default_color);
        self.builder.cancel();
        self.commit();
        info!("snapshot imported");
        Ok(())
    }

    /// Erase everything, in memory and in storage. Runs only if `confirm`
    /// returns true.
    pub fn reset(&mut self, confirm: impl FnOnce() -> bool) -> bool {
        if !confirm() {
            debug!("reset not confirmed");
            return false;
        }

        self.store.clear();
        self.legend.clear();
        self.form = TableForm::blank(&self.config.default_color);
        self.builder.cancel();
        self.persistence.clear();

        let snapshot = self.snapshot();
        self.persistence.mark_saved(&snapshot);
        self.bindings.attach(&snapshot.nodes, &self.dispatch);
        info!("session reset");
        true
    }

    /// Pin an export to the current state; running it later is unaffected
    /// by mutations made in between.
    pub fn begin_export(&self, format: ExportFormat) -> ExportJob {
        ExportJob::new(self.snapshot(), format, self.config.page)
    }

    /// Run an export. Failures are logged and reported; graph state is
    /// never touched.
    pub fn export(&self, job: &ExportJob, backends: ExportBackends<'_>) -> Option<ExportArtifact> {
        match job.run(backends) {
            Ok(artifact) => {
                info!(format = ?job.format(), bytes = artifact.bytes.len(), "export finished");
                Some(artifact)
            }
            Err(e) => {
                error!(format = ?job.format(), error = %e, "export failed");
                None
            }
        }
    }

    fn commit(&mut self) {
        let snapshot = self.snapshot();
        let written = self.persistence.sync(&snapshot);
        if self.bindings.attach(&snapshot.nodes, &self.dispatch) {
            debug!(nodes = snapshot.nodes.len(), "node behavior rebound");
        }
        debug!(written, "state committed");
    }
}

impl Session<FileStore> {
    /// Open a session persisted under `config.storage_dir`. `None` when the
    /// configuration names no directory.
    pub fn open_in_dir(config: EditorConfig) -> Option<Self> {
        let dir = config.storage_dir.clone()?;
        Some(Self::open(config, FileStore::new(dir)))
    }
}
