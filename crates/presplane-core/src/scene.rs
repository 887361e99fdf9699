//! Scene graph handed to renderers.
//!
//! Every node type is a plain, independently constructible value with its own
//! [`Style`]. A [`Scene`] groups them into three fixed members: the plane
//! outline, the segment endpoints and the flattened edges.

use crate::error::Result;
use crate::model::Bundle;
use crate::plane::PlaneFrame;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Index that terminates one polyline run.
pub const SENTINEL: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub color: [f32; 3],
    pub point_size: f32,
    pub line_width: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0],
            point_size: 1.0,
            line_width: 1.0,
        }
    }
}

impl Style {
    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn with_point_size(mut self, size: f32) -> Self {
        self.point_size = size;
        self
    }

    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }
}

/// Flat coordinate buffer shared by the nodes of one group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordinateBuffer {
    pub points: Vec<Point3<f64>>,
}

impl CoordinateBuffer {
    pub fn set_points(&mut self, points: Vec<Point3<f64>>) {
        self.points = points;
    }

    pub fn push(&mut self, point: Point3<f64>) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: i32) -> Option<&Point3<f64>> {
        usize::try_from(index).ok().and_then(|i| self.points.get(i))
    }
}

/// Draws `count` points of the group's buffer starting at `start`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointSet {
    pub start: usize,
    pub count: usize,
    pub style: Style,
}

impl PointSet {
    pub fn styled(style: Style) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.count
    }
}

/// Indexed polyline; each run is closed off by [`SENTINEL`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexedPolyline {
    pub indices: Vec<i32>,
    pub style: Style,
}

impl IndexedPolyline {
    pub fn styled(style: Style) -> Self {
        Self {
            indices: Vec::new(),
            style,
        }
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn push(&mut self, index: i32) {
        self.indices.push(index);
    }

    pub fn end_run(&mut self) {
        self.indices.push(SENTINEL);
    }

    /// Index runs between sentinels, skipping empty runs.
    pub fn runs(&self) -> impl Iterator<Item = &[i32]> + '_ {
        self.indices
            .split(|&i| i == SENTINEL)
            .filter(|run| !run.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutlineGroup {
    pub coords: CoordinateBuffer,
    pub points: PointSet,
    pub polygon: IndexedPolyline,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MarkerGroup {
    pub coords: CoordinateBuffer,
    pub points: PointSet,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeGroup {
    pub coords: CoordinateBuffer,
    pub points: PointSet,
    pub edge_set: IndexedPolyline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub outline: OutlineGroup,
    pub endpoints: MarkerGroup,
    pub edges: EdgeGroup,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene with the presentation styles applied.
    pub fn new() -> Self {
        let magenta = [1.0, 0.0, 1.0];
        Self {
            outline: OutlineGroup {
                coords: CoordinateBuffer::default(),
                points: PointSet::styled(Style::default().with_color(magenta).with_point_size(4.0)),
                polygon: IndexedPolyline::styled(
                    Style::default().with_color(magenta).with_line_width(1.5),
                ),
            },
            endpoints: MarkerGroup {
                coords: CoordinateBuffer::default(),
                points: PointSet::styled(
                    Style::default()
                        .with_color([1.0, 1.0, 1.0])
                        .with_point_size(2.0),
                ),
            },
            edges: EdgeGroup {
                coords: CoordinateBuffer::default(),
                points: PointSet::styled(
                    Style::default()
                        .with_color([0.0, 0.0, 0.8])
                        .with_point_size(1.0),
                ),
                edge_set: IndexedPolyline::styled(Style::default().with_line_width(1.0)),
            },
        }
    }

    pub fn build(frame: &PlaneFrame, bundle: &Bundle) -> Result<Self> {
        let mut scene = Self::new();
        scene.rebuild(frame, bundle)?;
        Ok(scene)
    }

    /// Refills every buffer from scratch; styles are kept.
    pub fn rebuild(&mut self, frame: &PlaneFrame, bundle: &Bundle) -> Result<()> {
        self.rebuild_outline(frame)?;
        self.rebuild_endpoints(bundle);
        self.rebuild_edges(bundle);
        Ok(())
    }

    fn rebuild_outline(&mut self, frame: &PlaneFrame) -> Result<()> {
        let corners = frame.outline_points()?;
        let outline = &mut self.outline;
        outline.coords.set_points(corners.to_vec());
        outline.points.set_count(corners.len());
        outline.polygon.clear();
        for i in 0..corners.len() as i32 {
            outline.polygon.push(i);
        }
        outline.polygon.push(0);
        outline.polygon.end_run();
        Ok(())
    }

    fn rebuild_endpoints(&mut self, bundle: &Bundle) {
        let points: Vec<Point3<f64>> = bundle
            .iter()
            .filter_map(|s| s.endpoints())
            .flat_map(|(first, last)| [first, last])
            .collect();
        self.endpoints.points.set_count(points.len());
        self.endpoints.coords.set_points(points);
    }

    fn rebuild_edges(&mut self, bundle: &Bundle) {
        let edges = &mut self.edges;
        edges.coords.set_points(Vec::new());
        edges.edge_set.clear();

        let mut next = 0i32;
        for segment in bundle.iter().filter(|s| s.len() > 1) {
            for p in &segment.points {
                edges.coords.push(*p);
                edges.edge_set.push(next);
                next += 1;
            }
            edges.edge_set.end_run();
        }
        edges.points.set_count(edges.coords.len());
    }
}
