//! Canonical node and edge collections.
//!
//! Collections are handed out as `Arc<Vec<_>>` snapshots. A successful
//! mutation builds a new vector and swaps it in, so `Arc::ptr_eq` on two
//! snapshots tells whether anything changed in between. A rejected mutation
//! leaves both collections untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::{Edge, EdgeData, EdgeId, EdgeSpec, NodeData, NodeId, Position, TableNode};
use crate::presentation::Presentation;

/// How node ids are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    /// Assigned once (`node_<n>`), never changes.
    #[default]
    Opaque,
    /// The display name is the id; renames rewrite edge endpoints.
    ByName,
}

/// How an edge came to be, which decides its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOrigin {
    /// Picked from the endpoint selectors; id derived from the endpoints.
    Explicit,
    /// Dragged between two connection points; fresh id.
    DragConnect,
}

#[derive(Debug, Clone)]
pub struct GraphStore {
    nodes: Arc<Vec<TableNode>>,
    edges: Arc<Vec<Edge>>,
    identity: IdentityMode,
    default_position: Position,
    next_node: u64,
    next_edge: u64,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(IdentityMode::Opaque, Position::new(350.0, 150.0))
    }
}

impl GraphStore {
    pub fn new(identity: IdentityMode, default_position: Position) -> Self {
        let default_position = if default_position.is_finite() {
            default_position
        } else {
            warn!(?default_position, "non-finite default position, using origin");
            Position::default()
        };
        Self {
            nodes: Arc::new(Vec::new()),
            edges: Arc::new(Vec::new()),
            identity,
            default_position,
            next_node: 1,
            next_edge: 1,
        }
    }

    pub fn identity(&self) -> IdentityMode {
        self.identity
    }

    pub fn nodes(&self) -> Arc<Vec<TableNode>> {
        Arc::clone(&self.nodes)
    }

    pub fn edges(&self) -> Arc<Vec<Edge>> {
        Arc::clone(&self.edges)
    }

    pub fn node(&self, id: &str) -> Option<&TableNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn edges_touching<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(node))
    }

    pub fn create_node(&mut self, data: NodeData) -> Option<NodeId> {
        let id = match self.identity {
            IdentityMode::Opaque => self.fresh_node_id(),
            IdentityMode::ByName => {
                let name = data.label.trim();
                if name.is_empty() || self.contains_node(name) {
                    debug!(name, "node name unavailable, skipping create");
                    return None;
                }
                name.to_string()
            }
        };

        let mut nodes = (*self.nodes).clone();
        nodes.push(TableNode::new(id.clone(), self.default_position, data));
        self.nodes = Arc::new(nodes);

        debug!(%id, "node created");
        Some(id)
    }

    /// Replace a node's payload. Returns the node's id afterwards, which
    /// differs from `id` only for a by-name rename.
    pub fn update_node(&mut self, id: &str, data: NodeData) -> Option<NodeId> {
        let Some(index) = self.nodes.iter().position(|n| n.id == id) else {
            debug!(id, "unknown node, skipping update");
            return None;
        };

        let new_id = match self.identity {
            IdentityMode::Opaque => id.to_string(),
            IdentityMode::ByName => data.label.trim().to_string(),
        };
        let renamed = new_id != id;
        if renamed && (new_id.is_empty() || self.contains_node(&new_id)) {
            debug!(id, %new_id, "rename target unavailable, skipping update");
            return None;
        }

        if renamed {
            let edges: Vec<Edge> = self
                .edges
                .iter()
                .cloned()
                .map(|mut e| {
                    let explicit = e.id == endpoint_key(&e);
                    if e.source == id {
                        e.source = new_id.clone();
                    }
                    if e.target == id {
                        e.target = new_id.clone();
                    }
                    if explicit {
                        e.id = endpoint_key(&e);
                    }
                    e
                })
                .collect();
            let unique = {
                let mut ids = HashSet::new();
                edges.iter().all(|e| ids.insert(e.id.as_str()))
            };
            if !unique {
                debug!(id, %new_id, "rename would merge two links, skipping update");
                return None;
            }
            self.edges = Arc::new(edges);
            debug!(old = id, new = %new_id, "node renamed, edge endpoints rewritten");
        }

        let mut nodes = (*self.nodes).clone();
        nodes[index].id = new_id.clone();
        nodes[index].data = data;
        self.nodes = Arc::new(nodes);

        Some(new_id)
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> bool {
        if !position.is_finite() {
            debug!(id, ?position, "non-finite position, skipping move");
            return false;
        }
        let Some(index) = self.nodes.iter().position(|n| n.id == id) else {
            return false;
        };
        if self.nodes[index].position == position {
            return false;
        }

        let mut nodes = (*self.nodes).clone();
        nodes[index].position = position;
        self.nodes = Arc::new(nodes);
        true
    }

    /// Remove a node together with every edge that touches it.
    pub fn delete_node(&mut self, id: &str) -> bool {
        if !self.contains_node(id) {
            return false;
        }

        let nodes: Vec<TableNode> = self.nodes.iter().filter(|n| n.id != id).cloned().collect();
        let before = self.edges.len();
        let edges: Vec<Edge> = self.edges.iter().filter(|e| !e.touches(id)).cloned().collect();
        let cascaded = before - edges.len();

        self.nodes = Arc::new(nodes);
        if cascaded > 0 {
            self.edges = Arc::new(edges);
        }

        debug!(id, cascaded, "node deleted");
        true
    }

    /// Create an edge between two existing nodes.
    ///
    /// Explicit links with the same endpoints share an id: linking again
    /// replaces the existing edge in place.
    pub fn create_edge(&mut self, spec: EdgeSpec, origin: LinkOrigin) -> Option<EdgeId> {
        if !self.endpoints_exist(&spec) {
            debug!(source = %spec.source.node, target = %spec.target.node, "missing endpoint, skipping link");
            return None;
        }

        let id = match origin {
            LinkOrigin::Explicit => derived_edge_id(&spec),
            LinkOrigin::DragConnect => self.fresh_edge_id(),
        };
        let edge = build_edge(id.clone(), spec);

        let mut edges = (*self.edges).clone();
        match edges.iter_mut().find(|e| e.id == id) {
            Some(existing) if endpoint_key(existing) != id => {
                debug!(%id, "id held by a link with other endpoints, skipping");
                return None;
            }
            Some(existing) => *existing = edge,
            None => edges.push(edge),
        }
        self.edges = Arc::new(edges);

        debug!(%id, "edge saved");
        Some(id)
    }

    /// Replace an edge's endpoints and kind in place. Returns the edge's id
    /// afterwards.
    ///
    /// An explicit link is re-keyed to its new endpoints, so linking the old
    /// pair again creates a new edge. The update is rejected when another
    /// edge already links the new endpoints.
    pub fn update_edge(&mut self, id: &str, spec: EdgeSpec) -> Option<EdgeId> {
        let Some(index) = self.edges.iter().position(|e| e.id == id) else {
            debug!(id, "unknown edge, skipping update");
            return None;
        };
        if !self.endpoints_exist(&spec) {
            debug!(id, "missing endpoint, skipping edge update");
            return None;
        }

        let new_id = if endpoint_key(&self.edges[index]) == id {
            derived_edge_id(&spec)
        } else {
            id.to_string()
        };
        if new_id != id && self.edge(&new_id).is_some() {
            debug!(id, %new_id, "endpoints already linked, skipping edge update");
            return None;
        }

        let mut edges = (*self.edges).clone();
        edges[index] = build_edge(new_id.clone(), spec);
        self.edges = Arc::new(edges);
        Some(new_id)
    }

    pub fn delete_edge(&mut self, id: &str) -> bool {
        if self.edge(id).is_none() {
            return false;
        }
        let edges = self.edges.iter().filter(|e| e.id != id).cloned().collect();
        self.edges = Arc::new(edges);
        true
    }

    /// Replace both collections with loaded records.
    ///
    /// Later duplicates of a node id and edges whose endpoints are missing
    /// are dropped. Edge presentation is re-derived from each edge's kind.
    pub fn hydrate(&mut self, nodes: Vec<TableNode>, edges: Vec<Edge>) {
        let mut seen = HashSet::new();
        let nodes: Vec<TableNode> = nodes
            .into_iter()
            .filter(|n| {
                let fresh = seen.insert(n.id.clone());
                if !fresh {
                    warn!(id = %n.id, "duplicate node id in loaded state, dropped");
                }
                fresh
            })
            .collect();

        let mut edge_ids = HashSet::new();
        let edges: Vec<Edge> = edges
            .into_iter()
            .filter(|e| {
                let valid = seen.contains(&e.source) && seen.contains(&e.target);
                if !valid {
                    warn!(id = %e.id, "dangling edge in loaded state, dropped");
                }
                valid && edge_ids.insert(e.id.clone())
            })
            .map(|mut e| {
                Presentation::apply(e.kind(), &mut e);
                e
            })
            .collect();

        self.nodes = Arc::new(nodes);
        self.edges = Arc::new(edges);
    }

    pub fn clear(&mut self) {
        self.nodes = Arc::new(Vec::new());
        self.edges = Arc::new(Vec::new());
    }

    fn endpoints_exist(&self, spec: &EdgeSpec) -> bool {
        self.contains_node(&spec.source.node) && self.contains_node(&spec.target.node)
    }

    fn fresh_node_id(&mut self) -> NodeId {
        loop {
            let id = format!("node_{}", self.next_node);
            self.next_node += 1;
            if !self.contains_node(&id) {
                return id;
            }
        }
    }

    fn fresh_edge_id(&mut self) -> EdgeId {
        loop {
            let id = format!("edge_{}", self.next_edge);
            self.next_edge += 1;
            if self.edge(&id).is_none() {
                return id;
            }
        }
    }
}

/// `e-<source>[.<column>]-<target>[.<column>]`
pub fn derived_edge_id(spec: &EdgeSpec) -> EdgeId {
    format_edge_id(
        &spec.source.node,
        spec.source.handle.as_deref(),
        &spec.target.node,
        spec.target.handle.as_deref(),
    )
}

/// The id an explicit link between this edge's endpoints would carry.
/// Explicit edges always hold it; drag-connect edges never do.
fn endpoint_key(edge: &Edge) -> EdgeId {
    format_edge_id(
        &edge.source,
        edge.source_handle.as_deref(),
        &edge.target,
        edge.target_handle.as_deref(),
    )
}

fn format_edge_id(source: &str, source_handle: Option<&str>, target: &str, target_handle: Option<&str>) -> EdgeId {
    let part = |node: &str, handle: Option<&str>| match handle {
        Some(column) => format!("{}.{}", node, column),
        None => node.to_string(),
    };
    format!("e-{}-{}", part(source, source_handle), part(target, target_handle))
}

fn build_edge(id: EdgeId, spec: EdgeSpec) -> Edge {
    let presentation = Presentation::for_kind(spec.kind);
    Edge {
        id,
        source: spec.source.node,
        target: spec.target.node,
        source_handle: spec.source.handle,
        target_handle: spec.target.handle,
        label: spec.label,
        animated: presentation.animated,
        style: presentation.style(),
        marker_start: presentation.start_marker(),
        marker_end: presentation.end_marker(),
        data: EdgeData { kind: spec.kind },
    }
}
