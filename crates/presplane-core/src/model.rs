use crate::geom::BBox2;
use nalgebra::{Point2, Point3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Distances below this are treated as zero.
pub const GEOM_TOLERANCE: f64 = 1e-9;

/// Circle in 3D: `center + r (cos u · x_axis + sin u · (normal × x_axis))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle3 {
    pub center: Point3<f64>,
    pub normal: Unit<Vector3<f64>>,
    pub x_axis: Unit<Vector3<f64>>,
    pub radius: f64,
}

impl Circle3 {
    /// Circle whose parameter origin follows the arbitrary-axis rule for `normal`.
    pub fn new(center: Point3<f64>, normal: Vector3<f64>, radius: f64) -> Self {
        let normal = Unit::try_new(normal, GEOM_TOLERANCE).unwrap_or_else(Vector3::z_axis);
        let x_axis = arbitrary_x_axis(&normal);
        Self {
            center,
            normal,
            x_axis,
            radius,
        }
    }

    pub fn y_axis(&self) -> Vector3<f64> {
        self.normal.into_inner().cross(&self.x_axis.into_inner())
    }

    pub fn point_at(&self, u: f64) -> Point3<f64> {
        let dir = self.x_axis.into_inner() * u.cos() + self.y_axis() * u.sin();
        self.center + dir * self.radius
    }

    pub fn arc_length(&self, first: f64, last: f64) -> f64 {
        self.radius.abs() * (last - first).abs()
    }
}

/// X direction of an entity coordinate system with the given normal
/// (the DXF "arbitrary axis" algorithm).
pub fn arbitrary_x_axis(normal: &Unit<Vector3<f64>>) -> Unit<Vector3<f64>> {
    const LIMIT: f64 = 1.0 / 64.0;
    let n = normal.into_inner();
    let seed = if n.x.abs() < LIMIT && n.y.abs() < LIMIT {
        Vector3::y()
    } else {
        Vector3::z()
    };
    Unit::new_normalize(seed.cross(&n))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Line,
    Arc,
    Other,
}

/// One edge of an input shape, in world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEdge {
    Line {
        start: Point3<f64>,
        end: Point3<f64>,
    },
    /// Circular arc over the parameter range `[first, last]` (radians).
    Arc {
        circle: Circle3,
        first: f64,
        last: f64,
    },
    /// Any curve the pipeline cannot flatten (ellipse, spline, ...).
    Other { kind: String },
}

impl InputEdge {
    pub fn line(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self::Line { start, end }
    }

    pub fn arc(circle: Circle3, first: f64, last: f64) -> Self {
        Self::Arc {
            circle,
            first,
            last,
        }
    }

    pub fn full_circle(circle: Circle3) -> Self {
        Self::arc(circle, 0.0, TAU)
    }

    pub fn other(kind: impl Into<String>) -> Self {
        Self::Other { kind: kind.into() }
    }

    pub fn kind(&self) -> EdgeKind {
        match self {
            Self::Line { .. } => EdgeKind::Line,
            Self::Arc { .. } => EdgeKind::Arc,
            Self::Other { .. } => EdgeKind::Other,
        }
    }
}

/// A named geometry provider selected onto a plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub name: String,
    pub edges: Vec<InputEdge>,
}

impl Shape {
    pub fn new(name: impl Into<String>, edges: Vec<InputEdge>) -> Self {
        Self {
            name: name.into(),
            edges,
        }
    }
}

/// An edge after projection, expressed in the plane-local frame
/// (placement translation removed, rotation kept).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectedEdge {
    Line {
        start: Point3<f64>,
        end: Point3<f64>,
    },
    Arc {
        circle: Circle3,
        first: f64,
        last: f64,
    },
    Other { kind: String },
}

impl ProjectedEdge {
    pub fn kind(&self) -> EdgeKind {
        match self {
            Self::Line { .. } => EdgeKind::Line,
            Self::Arc { .. } => EdgeKind::Arc,
            Self::Other { .. } => EdgeKind::Other,
        }
    }
}

/// Ordered point run produced from one projected edge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Segment {
    pub points: Vec<Point3<f64>>,
}

impl Segment {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    pub fn from_line(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self::new(vec![start, end])
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First and last point, if the segment has at least two points.
    pub fn endpoints(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        match self.points.as_slice() {
            [first, .., last] => Some((*first, *last)),
            _ => None,
        }
    }
}

impl From<Vec<Point3<f64>>> for Segment {
    fn from(points: Vec<Point3<f64>>) -> Self {
        Self::new(points)
    }
}

/// Line-derived segments followed by arc-derived segments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle {
    pub segments: Vec<Segment>,
}

impl Bundle {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn point_count(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    /// XY extents of every point, `None` for an empty bundle.
    pub fn extents(&self) -> Option<BBox2> {
        let bbox = BBox2::from_points(
            self.segments
                .iter()
                .flat_map(|s| s.points.iter())
                .map(|p| Point2::new(p.x, p.y)),
        );
        if bbox.is_empty() {
            None
        } else {
            Some(bbox)
        }
    }
}

impl<'a> IntoIterator for &'a Bundle {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
