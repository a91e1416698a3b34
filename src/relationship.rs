//! Edge construction from endpoint selection or canvas drag-connect.

use tracing::debug;

use crate::model::{CardinalityKind, Edge, EdgeId, EdgeSpec, Endpoint, NodeId};
use crate::store::{GraphStore, LinkOrigin};

/// A completed canvas drag between two connection points.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub source: NodeId,
    pub source_handle: Option<String>,
    pub target: NodeId,
    pub target_handle: Option<String>,
}

/// Working selection of the relationship panel.
///
/// `kind` is the globally selected cardinality: explicit links and
/// drag-connects both use it.
#[derive(Debug, Clone, Default)]
pub struct RelationshipBuilder {
    source: Option<Endpoint>,
    target: Option<Endpoint>,
    kind: CardinalityKind,
    label: Option<String>,
    editing: Option<EdgeId>,
}

impl RelationshipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<&Endpoint> {
        self.source.as_ref()
    }

    pub fn target(&self) -> Option<&Endpoint> {
        self.target.as_ref()
    }

    pub fn kind(&self) -> CardinalityKind {
        self.kind
    }

    /// Edge whose endpoints are loaded, if any; `save` updates it.
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn select_source(&mut self, endpoint: Option<Endpoint>) {
        self.source = endpoint;
    }

    pub fn select_target(&mut self, endpoint: Option<Endpoint>) {
        self.target = endpoint;
    }

    pub fn set_kind(&mut self, kind: CardinalityKind) {
        self.kind = kind;
    }

    /// Select a kind by name. Unknown names select the default kind.
    pub fn set_kind_name(&mut self, name: &str) -> CardinalityKind {
        self.kind = CardinalityKind::from_str(name).unwrap_or_default();
        self.kind
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label.filter(|l| !l.trim().is_empty());
    }

    /// Load an existing edge into the selection for editing.
    pub fn load_edge(&mut self, edge: &Edge) {
        self.source = Some(edge.source_endpoint());
        self.target = Some(edge.target_endpoint());
        self.kind = edge.kind();
        self.label = edge.label.clone();
        self.editing = Some(edge.id.clone());
    }

    pub fn cancel(&mut self) {
        self.source = None;
        self.target = None;
        self.label = None;
        self.editing = None;
    }

    /// Forget the edited edge if it is `id` (deleted elsewhere).
    pub fn forget_edge(&mut self, id: &str) {
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
    }

    /// Follow a node rename in the selected endpoints.
    pub fn rename_node(&mut self, old: &str, new: &str) {
        for endpoint in [&mut self.source, &mut self.target].into_iter().flatten() {
            if endpoint.node == old {
                endpoint.node = new.to_string();
            }
        }
    }

    /// Commit the selection: update the edited edge, or create an explicit
    /// link. Missing endpoints make this a no-op.
    pub fn save(&mut self, store: &mut GraphStore) -> Option<EdgeId> {
        let (Some(source), Some(target)) = (self.source.clone(), self.target.clone()) else {
            debug!("link needs both endpoints, skipping");
            return None;
        };
        let spec = EdgeSpec {
            source,
            target,
            kind: self.kind,
            label: self.label.clone(),
        };

        match self.editing.take() {
            Some(id) => {
                let updated = store.update_edge(&id, spec);
                if updated.is_none() {
                    debug!(%id, "edited edge could not be updated");
                }
                updated
            }
            None => store.create_edge(spec, LinkOrigin::Explicit),
        }
    }

    /// Create a drag-connect edge with a fresh id and the selected kind.
    pub fn connect(&self, store: &mut GraphStore, connection: Connection) -> Option<EdgeId> {
        let spec = EdgeSpec {
            source: Endpoint {
                node: connection.source,
                handle: connection.source_handle,
            },
            target: Endpoint {
                node: connection.target,
                handle: connection.target_handle,
            },
            kind: self.kind,
            label: None,
        };
        store.create_edge(spec, LinkOrigin::DragConnect)
    }
}
