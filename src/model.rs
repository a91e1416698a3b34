//! Graph records shared by the store, the persistence layer and exports.
//!
//! Field names follow the persisted layout (`position`, `data.label`,
//! `sourceHandle`, `markerEnd`, ...) so a record serializes to exactly what
//! the canvas host consumes.

use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use crate::legend::LegendEntry;

pub type NodeId = String;
pub type EdgeId = String;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// JSON has no NaN or infinity; such a position cannot be persisted.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "isPK", default)]
    pub is_pk: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, is_pk: bool) -> Self {
        Self {
            name: name.into(),
            is_pk,
        }
    }
}

/// Payload of a table node: everything the table form edits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub color: String,
}

impl NodeData {
    pub fn new(label: impl Into<String>, columns: Vec<Column>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            columns,
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeType {
    #[default]
    #[serde(rename = "tableNode")]
    Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableNode {
    pub id: NodeId,
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
}

impl TableNode {
    pub fn new(id: impl Into<NodeId>, position: Position, data: NodeData) -> Self {
        Self {
            id: id.into(),
            node_type: NodeType::Table,
            position,
            data,
        }
    }

    pub fn label(&self) -> &str {
        &self.data.label
    }
}

/// Relationship multiplicity chosen for an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardinalityKind {
    #[default]
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
    Identifying,
    NonIdentifying,
    Optional,
}

impl CardinalityKind {
    pub const ALL: [CardinalityKind; 7] = [
        Self::OneToOne,
        Self::OneToMany,
        Self::ManyToOne,
        Self::ManyToMany,
        Self::Identifying,
        Self::NonIdentifying,
        Self::Optional,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "oneToOne" => Some(Self::OneToOne),
            "oneToMany" => Some(Self::OneToMany),
            "manyToOne" => Some(Self::ManyToOne),
            "manyToMany" => Some(Self::ManyToMany),
            "identifying" => Some(Self::Identifying),
            "nonIdentifying" => Some(Self::NonIdentifying),
            "optional" => Some(Self::Optional),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "oneToOne",
            Self::OneToMany => "oneToMany",
            Self::ManyToOne => "manyToOne",
            Self::ManyToMany => "manyToMany",
            Self::Identifying => "identifying",
            Self::NonIdentifying => "nonIdentifying",
            Self::Optional => "optional",
        }
    }
}

/// Unknown kind names load as the default kind instead of failing the record.
fn lenient_kind<'de, D>(deserializer: D) -> Result<CardinalityKind, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    Ok(CardinalityKind::from_str(&name).unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerType {
    #[serde(rename = "arrow")]
    Arrow,
    #[serde(rename = "arrowclosed")]
    ArrowClosed,
}

impl MarkerType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arrow => "arrow",
            Self::ArrowClosed => "arrowclosed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(rename = "type")]
    pub marker_type: MarkerType,
    pub color: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub stroke: String,
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_dasharray: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeData {
    #[serde(default, deserialize_with = "lenient_kind")]
    pub kind: CardinalityKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub style: EdgeStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_start: Option<Marker>,
    pub marker_end: Marker,
    #[serde(default)]
    pub data: EdgeData,
}

impl Edge {
    pub fn kind(&self) -> CardinalityKind {
        self.data.kind
    }

    pub fn touches(&self, node: &str) -> bool {
        self.source == node || self.target == node
    }

    pub fn source_endpoint(&self) -> Endpoint {
        Endpoint {
            node: self.source.clone(),
            handle: self.source_handle.clone(),
        }
    }

    pub fn target_endpoint(&self) -> Endpoint {
        Endpoint {
            node: self.target.clone(),
            handle: self.target_handle.clone(),
        }
    }
}

/// One end of a relationship: a node, optionally narrowed to a column or
/// canvas connection point.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub node: NodeId,
    pub handle: Option<String>,
}

impl Endpoint {
    pub fn node(node: impl Into<NodeId>) -> Self {
        Self {
            node: node.into(),
            handle: None,
        }
    }

    pub fn column(node: impl Into<NodeId>, column: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            handle: Some(column.into()),
        }
    }

    /// Parse a `node|column` selector value. Blank input yields `None`.
    pub fn from_handle(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match value.split_once('|') {
            Some((node, column)) if !node.is_empty() => Some(Self {
                node: node.to_string(),
                handle: (!column.is_empty()).then(|| column.to_string()),
            }),
            Some(_) => None,
            None => Some(Self::node(value)),
        }
    }

    pub fn to_handle(&self) -> String {
        match &self.handle {
            Some(column) => format!("{}|{}", self.node, column),
            None => self.node.clone(),
        }
    }
}

/// Requested shape of an edge; the presentation is derived from `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    pub source: Endpoint,
    pub target: Endpoint,
    pub kind: CardinalityKind,
    pub label: Option<String>,
}

impl EdgeSpec {
    pub fn new(source: Endpoint, target: Endpoint, kind: CardinalityKind) -> Self {
        Self {
            source,
            target,
            kind,
            label: None,
        }
    }
}

/// Full state at one point in time. Cloning shares the collections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Arc<Vec<TableNode>>,
    pub edges: Arc<Vec<Edge>>,
    pub legend: Arc<Vec<LegendEntry>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_wire_shape() {
        let node = TableNode::new(
            "node_1",
            Position::new(350.0, 150.0),
            NodeData::new("ORDERS", vec![Column::new("id", true)], "#fbbf24"),
        );
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "tableNode");
        assert_eq!(json["position"]["x"], 350.0);
        assert_eq!(json["data"]["label"], "ORDERS");
        assert_eq!(json["data"]["columns"][0]["isPK"], true);
        assert_eq!(json["data"]["color"], "#fbbf24");
    }

    #[test]
    fn test_unknown_kind_loads_as_default() {
        let json = r##"{
            "id": "e1", "source": "a", "target": "b",
            "markerEnd": {"type": "arrowclosed", "color": "#3b82f6", "width": 25, "height": 25},
            "data": {"kind": "sideways"}
        }"##;
        let edge: Edge = serde_json::from_str(json).unwrap();
        assert_eq!(edge.kind(), CardinalityKind::OneToOne);
        assert!(edge.marker_start.is_none());
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in CardinalityKind::ALL {
            assert_eq!(CardinalityKind::from_str(kind.as_str()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_endpoint_from_handle() {
        assert_eq!(
            Endpoint::from_handle("node_1|id"),
            Some(Endpoint::column("node_1", "id"))
        );
        assert_eq!(Endpoint::from_handle("node_1"), Some(Endpoint::node("node_1")));
        assert_eq!(Endpoint::from_handle("node_1|"), Some(Endpoint::node("node_1")));
        assert_eq!(Endpoint::from_handle("  "), None);
        assert_eq!(Endpoint::from_handle("|id"), None);
    }

    #[test]
    fn test_endpoint_handle_text() {
        let column = Endpoint::column("node_1", "id");
        assert_eq!(column.to_handle(), "node_1|id");
        assert_eq!(Endpoint::from_handle(&column.to_handle()), Some(column));
        assert_eq!(Endpoint::node("node_2").to_handle(), "node_2");
    }

    #[test]
    fn test_position_is_finite() {
        assert!(Position::new(-5.0, 1e9).is_finite());
        assert!(!Position::new(f64::NAN, 0.0).is_finite());
        assert!(!Position::new(0.0, f64::INFINITY).is_finite());
    }
}
