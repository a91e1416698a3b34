use crate::measure::TextMetrics;
use crate::model::{Edge, MarkerType, Snapshot, TableNode};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write;

/// A rendered view of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    pub body: String,
    pub width: f64,
    pub height: f64,
}

pub struct SvgRenderer {
    metrics: TextMetrics,
    margin: f64,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            metrics: TextMetrics::default(),
            margin: 40.0,
        }
    }
}

struct NodeBox<'a> {
    node: &'a TableNode,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl NodeBox<'_> {
    fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

impl SvgRenderer {
    /// Render nodes at their canvas positions, translated so the drawing
    /// starts at the margin.
    pub fn render(&self, snapshot: &Snapshot) -> SvgDocument {
        let mut boxes: Vec<NodeBox> = snapshot
            .nodes
            .iter()
            .map(|node| {
                let (width, height) = self.metrics.node_size(&node.data.label, &node.data.columns);
                NodeBox {
                    node,
                    x: node.position.x,
                    y: node.position.y,
                    width,
                    height,
                }
            })
            .collect();

        let min_x = boxes.iter().map(|b| b.x).fold(f64::INFINITY, f64::min);
        let min_y = boxes.iter().map(|b| b.y).fold(f64::INFINITY, f64::min);
        let max_x = boxes.iter().map(|b| b.x + b.width).fold(f64::NEG_INFINITY, f64::max);
        let max_y = boxes.iter().map(|b| b.y + b.height).fold(f64::NEG_INFINITY, f64::max);

        let (width, height) = if boxes.is_empty() {
            (self.margin * 2.0, self.margin * 2.0)
        } else {
            for b in &mut boxes {
                b.x += self.margin - min_x;
                b.y += self.margin - min_y;
            }
            (
                max_x - min_x + self.margin * 2.0,
                max_y - min_y + self.margin * 2.0,
            )
        };

        let mut svg = String::new();
        writeln!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            width, height, width, height
        )
        .unwrap();

        writeln!(
            &mut svg,
            r#"<style>
  .table-bg {{ fill: #fff; stroke: #1e293b; stroke-width: 2; }}
  .table-name {{ font-family: sans-serif; font-size: 11px; font-weight: bold; fill: #fff; }}
  .column-text {{ font-family: sans-serif; font-size: 11px; fill: #334155; }}
  .pk {{ font-weight: bold; }}
  .key {{ font-size: 10px; fill: #eab308; }}
  .edge {{ fill: none; }}
  .edge-label {{ font-family: sans-serif; font-size: 10px; fill: #475569; }}
</style>"#
        )
        .unwrap();

        self.render_marker_defs(&mut svg, &snapshot.edges);

        let box_map: HashMap<&str, &NodeBox> =
            boxes.iter().map(|b| (b.node.id.as_str(), b)).collect();

        // Edges first (behind nodes)
        for edge in snapshot.edges.iter() {
            if let (Some(from), Some(to)) = (
                box_map.get(edge.source.as_str()),
                box_map.get(edge.target.as_str()),
            ) {
                self.render_edge(&mut svg, edge, from, to);
            }
        }

        for b in &boxes {
            self.render_node(&mut svg, b);
        }

        writeln!(&mut svg, "</svg>").unwrap();

        SvgDocument {
            body: svg,
            width,
            height,
        }
    }

    fn render_marker_defs(&self, svg: &mut String, edges: &[Edge]) {
        let used: BTreeSet<(&'static str, &str)> = edges
            .iter()
            .flat_map(|e| e.marker_start.iter().chain(std::iter::once(&e.marker_end)))
            .map(|m| (m.marker_type.as_str(), m.color.as_str()))
            .collect();
        if used.is_empty() {
            return;
        }

        writeln!(svg, "<defs>").unwrap();
        for (kind, color) in used {
            let shape = if kind == MarkerType::ArrowClosed.as_str() {
                format!(r#"<path d="M0,0 L10,5 L0,10 z" fill="{}" />"#, escape_xml(color))
            } else {
                format!(
                    r#"<path d="M0,0 L10,5 L0,10" fill="none" stroke="{}" stroke-width="1.5" />"#,
                    escape_xml(color)
                )
            };
            writeln!(
                svg,
                r#"<marker id="{}" viewBox="0 0 10 10" refX="9" refY="5" markerWidth="8" markerHeight="8" orient="auto-start-reverse">{}</marker>"#,
                marker_id(kind, color),
                shape
            )
            .unwrap();
        }
        writeln!(svg, "</defs>").unwrap();
    }

    fn render_node(&self, svg: &mut String, b: &NodeBox) {
        let node = b.node;
        let header_h = self.metrics.header_height();
        let color = if node.data.color.is_empty() {
            "#334155"
        } else {
            node.data.color.as_str()
        };

        // 1. Body
        writeln!(
            svg,
            r#"<rect class="table-bg" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            b.x, b.y, b.width, b.height
        )
        .unwrap();

        // 2. Header in the category color
        writeln!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="4" fill="{}" />"#,
            b.x,
            b.y,
            b.width,
            header_h,
            escape_xml(color)
        )
        .unwrap();

        writeln!(
            svg,
            r#"<text class="table-name" x="{}" y="{}">{}</text>"#,
            b.x + self.metrics.padding_x,
            b.y + header_h / 2.0 + 4.0,
            escape_xml(&node.data.label.to_uppercase())
        )
        .unwrap();

        // 3. Columns
        for (i, col) in node.data.columns.iter().enumerate() {
            let row_y = b.y + self.metrics.row_center(i) + 4.0;
            if col.is_pk {
                writeln!(
                    svg,
                    r#"<text class="key" x="{}" y="{}">◆</text>"#,
                    b.x + self.metrics.padding_x,
                    row_y
                )
                .unwrap();
            }
            let class = if col.is_pk { "column-text pk" } else { "column-text" };
            writeln!(
                svg,
                r#"<text class="{}" x="{}" y="{}">{}</text>"#,
                class,
                b.x + self.metrics.padding_x + self.metrics.key_gutter,
                row_y,
                escape_xml(&col.name)
            )
            .unwrap();
        }
    }

    fn render_edge(&self, svg: &mut String, edge: &Edge, from: &NodeBox, to: &NodeBox) {
        let (x1, y1) = self.anchor(from, edge.source_handle.as_deref(), to.center());
        let (x2, y2) = self.anchor(to, edge.target_handle.as_deref(), from.center());

        let mut attrs = format!(
            r#"stroke="{}" stroke-width="{}""#,
            escape_xml(&edge.style.stroke),
            edge.style.stroke_width
        );
        if let Some(dash) = &edge.style.stroke_dasharray {
            write!(attrs, r#" stroke-dasharray="{}""#, escape_xml(dash)).unwrap();
        }
        if let Some(start) = &edge.marker_start {
            write!(
                attrs,
                r#" marker-start="url(#{})""#,
                marker_id(start.marker_type.as_str(), &start.color)
            )
            .unwrap();
        }
        write!(
            attrs,
            r#" marker-end="url(#{})""#,
            marker_id(edge.marker_end.marker_type.as_str(), &edge.marker_end.color)
        )
        .unwrap();

        writeln!(
            svg,
            r#"<line class="edge" x1="{}" y1="{}" x2="{}" y2="{}" {} />"#,
            x1, y1, x2, y2, attrs
        )
        .unwrap();

        if let Some(label) = &edge.label {
            writeln!(
                svg,
                r#"<text class="edge-label" x="{}" y="{}" text-anchor="middle">{}</text>"#,
                (x1 + x2) / 2.0,
                (y1 + y2) / 2.0 - 5.0,
                escape_xml(label)
            )
            .unwrap();
        }
    }

    /// Where an edge meets a node: the named column's row, the named side,
    /// or the side facing the other end.
    fn anchor(&self, b: &NodeBox, handle: Option<&str>, toward: (f64, f64)) -> (f64, f64) {
        let (cx, cy) = b.center();
        let facing_x = if toward.0 >= cx { b.x + b.width } else { b.x };

        if let Some(handle) = handle {
            if let Some(i) = b.node.data.columns.iter().position(|c| c.name == handle) {
                return (facing_x, b.y + self.metrics.row_center(i));
            }
            match handle.split('-').next() {
                Some("top") => return (cx, b.y),
                Some("bottom") => return (cx, b.y + b.height),
                Some("left") => return (b.x, cy),
                Some("right") => return (b.x + b.width, cy),
                _ => {}
            }
        }

        let (dx, dy) = (toward.0 - cx, toward.1 - cy);
        if dx.abs() * b.height >= dy.abs() * b.width {
            (facing_x, cy)
        } else if dy > 0.0 {
            (cx, b.y + b.height)
        } else {
            (cx, b.y)
        }
    }
}

fn marker_id(kind: &str, color: &str) -> String {
    let color: String = color.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    format!("m-{}-{}", kind, color)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardinalityKind, Column, EdgeSpec, Endpoint, NodeData, Position};
    use crate::store::{GraphStore, LinkOrigin};

    fn snapshot(store: &GraphStore) -> Snapshot {
        Snapshot {
            nodes: store.nodes(),
            edges: store.edges(),
            legend: Default::default(),
        }
    }

    #[test]
    fn test_render_empty() {
        let doc = SvgRenderer::default().render(&Snapshot::default());
        assert!(doc.body.starts_with("<svg"));
        assert!(doc.body.trim_end().ends_with("</svg>"));
        assert_eq!(doc.width, 80.0);
    }

    #[test]
    fn test_render_table() {
        let mut store = GraphStore::default();
        store.create_node(NodeData::new(
            "sales.orders",
            vec![Column::new("id", true), Column::new("note<&>", false)],
            "#fbbf24",
        ));
        let doc = SvgRenderer::default().render(&snapshot(&store));

        assert!(doc.body.contains("SALES.ORDERS"));
        assert!(doc.body.contains(r##"fill="#fbbf24""##));
        assert!(doc.body.contains("column-text pk"));
        assert!(doc.body.contains("note&lt;&amp;&gt;"));
        assert!(!doc.body.contains("<defs>"));
    }

    #[test]
    fn test_render_unicode() {
        let mut store = GraphStore::default();
        store.create_node(NodeData::new("ユーザー", vec![Column::new("名前", false)], ""));
        let doc = SvgRenderer::default().render(&snapshot(&store));
        assert!(doc.body.contains("ユーザー"));
        assert!(doc.body.contains("名前"));
    }

    #[test]
    fn test_render_edges_with_markers() {
        let mut store = GraphStore::default();
        let a = store
            .create_node(NodeData::new("ORDERS", vec![Column::new("customer_id", false)], ""))
            .unwrap();
        let b = store
            .create_node(NodeData::new("CUSTOMERS", vec![Column::new("id", true)], ""))
            .unwrap();
        store.move_node(&b, Position::new(800.0, 150.0));
        let mut spec = EdgeSpec::new(
            Endpoint::column(&a, "customer_id"),
            Endpoint::column(&b, "id"),
            CardinalityKind::ManyToMany,
        );
        spec.label = Some("places".into());
        store.create_edge(spec, LinkOrigin::Explicit);

        let doc = SvgRenderer::default().render(&snapshot(&store));
        assert!(doc.body.contains("<defs>"));
        assert!(doc.body.contains(r#"marker-start="url(#m-arrow-8b5cf6)""#));
        assert!(doc.body.contains(r#"marker-end="url(#m-arrow-8b5cf6)""#));
        assert!(doc.body.contains("places"));
        assert!(doc.width > 700.0);
    }
}
