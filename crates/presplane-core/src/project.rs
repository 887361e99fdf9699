use crate::error::Result;
use crate::geom::BBox2;
use crate::model::{Circle3, InputEdge, ProjectedEdge, GEOM_TOLERANCE};
use crate::plane::PlaneFrame;
use nalgebra::{Point2, Point3, Rotation3, Vector2, Vector3};
use std::f64::consts::TAU;
use tracing::debug;

/// Slack applied when testing projected geometry against the face rectangle.
pub const FACE_TOLERANCE: f64 = 1e-7;

// Arc parameters closer than this are one break point.
const PARAM_EPS: f64 = 1e-12;

/// Result of projecting a list of input edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub edges: Vec<ProjectedEdge>,
    /// Input edges that left nothing on the face.
    pub omitted: usize,
}

/// Parallel-projects `edges` onto the plane's face along the placement axis.
///
/// Output order follows input order. Projected geometry is trimmed to the
/// face: lines are clipped, arcs are cut at the face border and may come
/// back as several pieces. Edges that leave nothing on the face (direction
/// parallel to the face, collapsed lines, geometry off the face) are left out
/// without error. Results are re-centred on the plane's local origin; the
/// placement rotation is not undone.
pub fn project_edges<'a, I>(edges: I, frame: &PlaneFrame) -> Result<Vec<ProjectedEdge>>
where
    I: IntoIterator<Item = &'a InputEdge>,
{
    Ok(project(edges, frame)?.edges)
}

/// [`project_edges`] that also reports how many input edges were omitted.
pub fn project<'a, I>(edges: I, frame: &PlaneFrame) -> Result<Projection>
where
    I: IntoIterator<Item = &'a InputEdge>,
{
    let face = Face::new(frame)?;

    let mut projection = Projection::default();
    for (index, edge) in edges.into_iter().enumerate() {
        let pieces = face.project(edge);
        if pieces.is_empty() {
            projection.omitted += 1;
            debug!(index, kind = ?edge.kind(), "edge misses the face, omitted");
        }
        projection.edges.extend(pieces);
    }

    debug!(
        projected = projection.edges.len(),
        omitted = projection.omitted,
        "projected edges onto plane"
    );
    Ok(projection)
}

/// The plane's face placed in the world.
struct Face {
    origin: Point3<f64>,
    normal: Vector3<f64>,
    direction: Vector3<f64>,
    to_face: Rotation3<f64>,
    bounds: BBox2,
    base: Vector3<f64>,
}

impl Face {
    fn new(frame: &PlaneFrame) -> Result<Self> {
        let (hw, hh) = frame.face_half_extents()?;
        Ok(Self {
            origin: frame.local_origin(),
            normal: frame.face_normal().into_inner(),
            direction: frame.projection_direction().into_inner(),
            to_face: frame.placement.rotation.to_rotation3().inverse(),
            bounds: BBox2::centered(hw, hh),
            base: frame.placement.base,
        })
    }

    fn project_point(&self, p: &Point3<f64>) -> Option<Point3<f64>> {
        let denom = self.direction.dot(&self.normal);
        if denom.abs() < GEOM_TOLERANCE {
            return None;
        }
        let s = (self.origin - *p).dot(&self.normal) / denom;
        Some(*p + self.direction * s)
    }

    fn face_coords(&self, world: &Point3<f64>) -> Point2<f64> {
        let local = self.to_face * (*world - self.origin);
        Point2::new(local.x, local.y)
    }

    fn face_vector(&self, world: &Vector3<f64>) -> Vector2<f64> {
        let local = self.to_face * world;
        Vector2::new(local.x, local.y)
    }

    fn recentre(&self, p: Point3<f64>) -> Point3<f64> {
        p - self.base
    }

    fn project(&self, edge: &InputEdge) -> Vec<ProjectedEdge> {
        if self.direction.dot(&self.normal).abs() < GEOM_TOLERANCE {
            return Vec::new();
        }
        match edge {
            InputEdge::Line { start, end } => self.project_line(start, end).into_iter().collect(),
            InputEdge::Arc {
                circle,
                first,
                last,
            } => self.project_arc(circle, *first, *last),
            InputEdge::Other { kind } => vec![ProjectedEdge::Other { kind: kind.clone() }],
        }
    }

    fn project_line(&self, start: &Point3<f64>, end: &Point3<f64>) -> Option<ProjectedEdge> {
        let a = self.project_point(start)?;
        let b = self.project_point(end)?;
        let length = (b - a).norm();
        if length < GEOM_TOLERANCE {
            return None;
        }

        let (fa, fb) = (self.face_coords(&a), self.face_coords(&b));
        // Exact border first so clipped ends land on it; the slack only rescues
        // edges lying along the border.
        let (t0, t1) = self
            .bounds
            .clip_segment(fa, fb, 0.0)
            .or_else(|| self.bounds.clip_segment(fa, fb, FACE_TOLERANCE))?;
        if (t1 - t0) * length < GEOM_TOLERANCE {
            return None;
        }

        let at = |t: f64| a + (b - a) * t;
        Some(ProjectedEdge::Line {
            start: self.recentre(at(t0)),
            end: self.recentre(at(t1)),
        })
    }

    fn project_arc(&self, circle: &Circle3, first: f64, last: f64) -> Vec<ProjectedEdge> {
        if circle.radius <= GEOM_TOLERANCE {
            return Vec::new();
        }
        let Some(center) = self.project_point(&circle.center) else {
            return Vec::new();
        };

        // Only a circle lying parallel to the face stays a circle.
        if circle.normal.cross(&self.normal).norm() > GEOM_TOLERANCE {
            return vec![ProjectedEdge::Other {
                kind: "ellipse".to_string(),
            }];
        }

        let projected = Circle3 {
            center,
            ..circle.clone()
        };
        let (lo, hi) = if first <= last {
            (first, last)
        } else {
            (last, first)
        };
        self.arc_spans_on_face(&projected, lo, hi)
            .into_iter()
            .map(|(first, last)| ProjectedEdge::Arc {
                circle: Circle3 {
                    center: self.recentre(projected.center),
                    ..projected.clone()
                },
                first,
                last,
            })
            .collect()
    }

    /// Parameter spans of `circle[first..=last]` that lie on the face.
    fn arc_spans_on_face(&self, circle: &Circle3, first: f64, last: f64) -> Vec<(f64, f64)> {
        let c = self.face_coords(&circle.center);
        let ex = self.face_vector(&(circle.x_axis.into_inner() * circle.radius));
        let ey = self.face_vector(&(circle.y_axis() * circle.radius));
        let at = |u: f64| c + ex * u.cos() + ey * u.sin();

        let mut breaks = vec![first, last];
        for (axis, value) in [
            (0, self.bounds.min.x),
            (0, self.bounds.max.x),
            (1, self.bounds.min.y),
            (1, self.bounds.max.y),
        ] {
            // c + ex cos u + ey sin u hits the border line: R cos(u - phi) = C.
            let (a, b) = (ex[axis], ey[axis]);
            let r = a.hypot(b);
            let offset = value - c[axis];
            if r < PARAM_EPS || offset.abs() > r {
                continue;
            }
            let phi = b.atan2(a);
            let delta = (offset / r).clamp(-1.0, 1.0).acos();
            for root in [phi - delta, phi + delta] {
                let mut u = root + ((first - root) / TAU).ceil() * TAU;
                while u < last {
                    if u > first {
                        breaks.push(u);
                    }
                    u += TAU;
                }
            }
        }
        breaks.sort_by(f64::total_cmp);
        breaks.dedup_by(|b, a| (*b - *a).abs() < PARAM_EPS);

        let mut spans: Vec<(f64, f64)> = Vec::new();
        for w in breaks.windows(2) {
            let (u0, u1) = (w[0], w[1]);
            if !self.bounds.contains(at(0.5 * (u0 + u1)), FACE_TOLERANCE) {
                continue;
            }
            match spans.last_mut() {
                Some(span) if (span.1 - u0).abs() < PARAM_EPS => span.1 = u1,
                _ => spans.push((u0, u1)),
            }
        }

        // A full circle cut by the border: join the pieces meeting at its seam.
        let full_turn = (last - first - TAU).abs() < PARAM_EPS;
        if full_turn && spans.len() > 1 {
            let head = spans[0];
            let tail = spans[spans.len() - 1];
            if (head.0 - first).abs() < PARAM_EPS && (tail.1 - last).abs() < PARAM_EPS {
                spans.pop();
                spans[0] = (tail.0, head.1 + TAU);
            }
        }

        spans.retain(|(u0, u1)| (u1 - u0) * circle.radius >= GEOM_TOLERANCE);
        spans
    }
}
