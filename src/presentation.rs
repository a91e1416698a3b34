//! Cardinality kind → edge presentation.

use crate::model::{CardinalityKind, Edge, EdgeStyle, Marker, MarkerType};

const MARKER_SIZE: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    pub fn dasharray(self) -> Option<&'static str> {
        match self {
            Self::Solid => None,
            Self::Dashed => Some("6 4"),
            Self::Dotted => Some("2 4"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    pub marker_start: Option<MarkerType>,
    pub marker_end: MarkerType,
    pub line: LineStyle,
    pub color: &'static str,
    pub stroke_width: f64,
    pub animated: bool,
}

impl Default for Presentation {
    /// Direct link with a closed arrow.
    fn default() -> Self {
        Self {
            marker_start: None,
            marker_end: MarkerType::ArrowClosed,
            line: LineStyle::Solid,
            color: "#3b82f6",
            stroke_width: 2.0,
            animated: true,
        }
    }
}

impl Presentation {
    pub fn for_kind(kind: CardinalityKind) -> Self {
        let direct = Self::default();
        match kind {
            CardinalityKind::OneToOne => direct,
            CardinalityKind::OneToMany => Self {
                marker_end: MarkerType::Arrow,
                ..direct
            },
            CardinalityKind::ManyToOne => Self {
                marker_start: Some(MarkerType::Arrow),
                ..direct
            },
            CardinalityKind::ManyToMany => Self {
                marker_start: Some(MarkerType::Arrow),
                marker_end: MarkerType::Arrow,
                color: "#8b5cf6",
                ..direct
            },
            CardinalityKind::Identifying => Self {
                color: "#0f172a",
                stroke_width: 3.0,
                animated: false,
                ..direct
            },
            CardinalityKind::NonIdentifying => Self {
                line: LineStyle::Dashed,
                color: "#64748b",
                animated: false,
                ..direct
            },
            CardinalityKind::Optional => Self {
                marker_end: MarkerType::Arrow,
                line: LineStyle::Dotted,
                color: "#94a3b8",
                animated: false,
                ..direct
            },
        }
    }

    pub fn style(&self) -> EdgeStyle {
        EdgeStyle {
            stroke: self.color.to_string(),
            stroke_width: self.stroke_width,
            stroke_dasharray: self.line.dasharray().map(str::to_string),
        }
    }

    fn marker(&self, marker_type: MarkerType) -> Marker {
        Marker {
            marker_type,
            color: self.color.to_string(),
            width: MARKER_SIZE,
            height: MARKER_SIZE,
        }
    }

    pub fn start_marker(&self) -> Option<Marker> {
        self.marker_start.map(|m| self.marker(m))
    }

    pub fn end_marker(&self) -> Marker {
        self.marker(self.marker_end)
    }

    /// Overwrite every presentation field of `edge` and record `kind`.
    pub fn apply(kind: CardinalityKind, edge: &mut Edge) {
        let p = Self::for_kind(kind);
        edge.data.kind = kind;
        edge.style = p.style();
        edge.animated = p.animated;
        edge.marker_start = p.start_marker();
        edge.marker_end = p.end_marker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EdgeData;

    fn blank_edge() -> Edge {
        Edge {
            id: "e".into(),
            source: "a".into(),
            target: "b".into(),
            source_handle: None,
            target_handle: None,
            label: None,
            animated: false,
            style: EdgeStyle::default(),
            marker_start: None,
            marker_end: Presentation::default().end_marker(),
            data: EdgeData::default(),
        }
    }

    #[test]
    fn test_one_to_many() {
        let p = Presentation::for_kind(CardinalityKind::OneToMany);
        assert_eq!(p.marker_start, None);
        assert_eq!(p.marker_end, MarkerType::Arrow);
    }

    #[test]
    fn test_one_to_one_is_direct() {
        assert_eq!(
            Presentation::for_kind(CardinalityKind::OneToOne),
            Presentation::default()
        );
    }

    #[test]
    fn test_mapping_is_total_and_distinct() {
        let all: Vec<Presentation> = CardinalityKind::ALL
            .iter()
            .map(|k| Presentation::for_kind(*k))
            .collect();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_apply_replaces_everything() {
        let mut edge = blank_edge();
        Presentation::apply(CardinalityKind::ManyToMany, &mut edge);
        assert!(edge.marker_start.is_some());
        assert_eq!(edge.style.stroke, "#8b5cf6");

        Presentation::apply(CardinalityKind::NonIdentifying, &mut edge);
        assert_eq!(edge.kind(), CardinalityKind::NonIdentifying);
        assert!(edge.marker_start.is_none());
        assert_eq!(edge.marker_end.marker_type, MarkerType::ArrowClosed);
        assert_eq!(edge.marker_end.color, "#64748b");
        assert_eq!(edge.style.stroke_dasharray.as_deref(), Some("6 4"));
        assert!(!edge.animated);
    }
}
