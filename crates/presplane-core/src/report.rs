use crate::bundle::dropped_count;
use crate::document::PresentationPlane;
use crate::error::Result;
use crate::geom::BBox2;
use crate::model::{EdgeKind, ProjectedEdge};
use crate::plane::{PageSize, Placement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: String,
    pub message: String,
}

impl Warning {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountsReport {
    pub shapes: usize,
    pub input_edges: usize,
    pub projected_edges: usize,
    pub omitted_edges: usize,
    pub line_segments: usize,
    pub arc_segments: usize,
    pub dropped_curves: usize,
    pub points: usize,
}

/// Summary of one flatten run of a plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenReport {
    pub page_size: PageSize,
    pub dimensions: (f64, f64),
    pub scale: f64,
    pub discretize: f64,
    pub placement: Placement,
    pub counts: CountsReport,
    pub extents: Option<BBox2>,
    /// Dropped curve kinds with their counts.
    pub dropped_kinds: BTreeMap<String, usize>,
    pub warnings: Vec<Warning>,
}

impl FlattenReport {
    /// Builds the report from the plane's last `execute`.
    pub fn build(plane: &PresentationPlane) -> Result<Self> {
        let props = plane.properties();
        let shape = plane.shape();
        let bundle = plane.bundle_points()?;

        let line_segments = shape.iter().filter(|e| e.kind() == EdgeKind::Line).count();
        let counts = CountsReport {
            shapes: plane.resolved_shapes(),
            input_edges: plane.input_edges(),
            projected_edges: shape.len(),
            omitted_edges: plane.omitted_edges(),
            line_segments,
            arc_segments: bundle.len() - line_segments,
            dropped_curves: dropped_count(shape),
            points: bundle.point_count(),
        };

        let mut dropped_kinds = BTreeMap::new();
        for edge in shape {
            if let ProjectedEdge::Other { kind } = edge {
                *dropped_kinds.entry(kind.clone()).or_insert(0) += 1;
            }
        }

        let mut warnings = Vec::new();
        if props.objects.is_empty() {
            warnings.push(Warning::new("no_objects", "no objects selected; bundle is empty"));
        }
        for name in plane.unresolved() {
            warnings.push(Warning::new(
                "unresolved_object",
                format!("object '{name}' not found"),
            ));
        }
        if counts.dropped_curves > 0 {
            let kinds = dropped_kinds
                .iter()
                .map(|(k, n)| format!("{k} x{n}"))
                .collect::<Vec<_>>()
                .join(", ");
            warnings.push(Warning::new(
                "unsupported_curves",
                format!("{} curve(s) cannot be flattened: {kinds}", counts.dropped_curves),
            ));
        }
        if counts.omitted_edges > 0 {
            warnings.push(Warning::new(
                "omitted_edges",
                format!(
                    "{} edge(s) do not project onto the plane face",
                    counts.omitted_edges
                ),
            ));
        }
        if !props.placement.rotation.is_identity() {
            warnings.push(Warning::new(
                "rotated_plane",
                format!(
                    "plane is rotated {:.3} deg; projected output keeps the rotation",
                    props.placement.rotation.angle_degrees()
                ),
            ));
        }

        info!(
            shapes = counts.shapes,
            segments = bundle.len(),
            points = counts.points,
            warnings = warnings.len(),
            "flatten report"
        );

        Ok(Self {
            page_size: props.page_size,
            dimensions: props.page_size.dimensions(),
            scale: props.scale,
            discretize: props.discretize,
            placement: props.placement,
            counts,
            extents: bundle.extents(),
            dropped_kinds,
            warnings,
        })
    }
}
