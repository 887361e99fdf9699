use crate::discretize::discretize_arc;
use crate::error::Result;
use crate::model::{Bundle, InputEdge, ProjectedEdge, Segment};
use crate::plane::PlaneFrame;
use crate::project::project_edges;
use tracing::debug;

/// One two-point segment per projected line, in edge order.
pub fn lines_of(edges: &[ProjectedEdge]) -> Vec<Segment> {
    edges
        .iter()
        .filter_map(|edge| match edge {
            ProjectedEdge::Line { start, end } => Some(Segment::from_line(*start, *end)),
            _ => None,
        })
        .collect()
}

/// One sampled polyline per projected arc, in edge order.
pub fn arcs_of(edges: &[ProjectedEdge], spacing: f64) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    for edge in edges {
        if let ProjectedEdge::Arc {
            circle,
            first,
            last,
        } = edge
        {
            segments.push(Segment::new(discretize_arc(circle, *first, *last, spacing)?));
        }
    }
    Ok(segments)
}

/// `lines_of` followed by `arcs_of`. Lines always come first, whatever the
/// interleaving of the input; renderers and exporters rely on it.
pub fn bundle(edges: &[ProjectedEdge], spacing: f64) -> Result<Bundle> {
    let mut segments = lines_of(edges);
    let line_count = segments.len();
    segments.extend(arcs_of(edges, spacing)?);

    let dropped = dropped_count(edges);
    if dropped > 0 {
        debug!(dropped, "unsupported curves left out of bundle");
    }
    debug!(
        lines = line_count,
        arcs = segments.len() - line_count,
        "bundled segments"
    );
    Ok(Bundle::new(segments))
}

/// Projected edges the bundler cannot represent.
pub fn dropped_count(edges: &[ProjectedEdge]) -> usize {
    edges
        .iter()
        .filter(|e| matches!(e, ProjectedEdge::Other { .. }))
        .count()
}

/// Projection and bundling in one call, always a full rebuild.
pub fn flatten<'a, I>(edges: I, frame: &PlaneFrame) -> Result<Bundle>
where
    I: IntoIterator<Item = &'a InputEdge>,
{
    let projected = project_edges(edges, frame)?;
    bundle(&projected, frame.discretize_spacing)
}
