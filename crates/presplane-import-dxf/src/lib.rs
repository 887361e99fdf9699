use anyhow::{Context, Result};
use dxf::entities::EntityType;
use nalgebra::{Matrix3, Point3, Unit, Vector2, Vector3};
use presplane_core::model::{arbitrary_x_axis, Circle3, InputEdge, Shape, GEOM_TOLERANCE};
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::path::Path;
use tracing::{debug, info};

const MAX_INSERT_DEPTH: usize = 8;

/// Reads 3D edges from a DXF file, one [`Shape`] per layer in first-seen order.
pub fn import_dxf(path: &Path) -> Result<Vec<Shape>> {
    let drawing = dxf::Drawing::load_file(path).with_context(|| format!("load DXF: {path:?}"))?;

    let mut importer = DxfImporter::new(&drawing);
    importer.import_all();

    let shapes = importer.finish();
    info!(
        path = %path.display(),
        shapes = shapes.len(),
        edges = shapes.iter().map(|s| s.edges.len()).sum::<usize>(),
        "imported DXF"
    );
    Ok(shapes)
}

struct DxfImporter<'a> {
    drawing: &'a dxf::Drawing,
    blocks: HashMap<String, &'a dxf::Block>,
    shapes: Vec<Shape>,
    by_layer: HashMap<String, usize>,
}

impl<'a> DxfImporter<'a> {
    fn new(drawing: &'a dxf::Drawing) -> Self {
        let mut blocks = HashMap::new();
        for block in drawing.blocks() {
            blocks.insert(block.name.to_ascii_lowercase(), block);
        }
        Self {
            drawing,
            blocks,
            shapes: Vec::new(),
            by_layer: HashMap::new(),
        }
    }

    fn import_all(&mut self) {
        let tx = Transform3::identity();
        let mut stack = Vec::new();
        for ent in self.drawing.entities() {
            self.import_entity(ent, &tx, None, &mut stack, 0);
        }
    }

    fn finish(self) -> Vec<Shape> {
        self.shapes
    }

    fn push(&mut self, layer: &str, edge: InputEdge) {
        let index = match self.by_layer.get(layer) {
            Some(&i) => i,
            None => {
                self.shapes.push(Shape::new(layer, Vec::new()));
                self.by_layer.insert(layer.to_string(), self.shapes.len() - 1);
                self.shapes.len() - 1
            }
        };
        self.shapes[index].edges.push(edge);
    }

    fn import_entity(
        &mut self,
        ent: &dxf::entities::Entity,
        tx: &Transform3,
        parent_layer: Option<&str>,
        stack: &mut Vec<String>,
        depth: usize,
    ) {
        let layer = resolve_layer(&ent.common.layer, parent_layer);
        match &ent.specific {
            EntityType::Insert(insert) => {
                self.import_insert(insert, &layer, tx, stack, depth + 1);
            }
            EntityType::Line(line) => {
                let start = tx.apply_point(&point(&line.p1));
                let end = tx.apply_point(&point(&line.p2));
                self.push(&layer, InputEdge::line(start, end));
            }
            EntityType::Circle(circle) => {
                let ocs = Ocs::new(vector(&circle.normal));
                let center = ocs.to_world(&point(&circle.center));
                let edge = tx.apply_arc(&ocs.circle(center, circle.radius), 0.0, TAU);
                self.push(&layer, edge);
            }
            EntityType::Arc(arc) => {
                let ocs = Ocs::new(vector(&arc.normal));
                let center = ocs.to_world(&point(&arc.center));
                let (first, last) = arc_range(arc.start_angle, arc.end_angle);
                let edge = tx.apply_arc(&ocs.circle(center, arc.radius), first, last);
                self.push(&layer, edge);
            }
            EntityType::LwPolyline(poly) => {
                let ocs = Ocs::new(vector(&poly.extrusion_direction));
                let vertices: Vec<(Vector2<f64>, f64)> = poly
                    .vertices
                    .iter()
                    .map(|v| (Vector2::new(v.x, v.y), v.bulge))
                    .collect();
                for edge in polyline_edges(&vertices, poly.is_closed(), ent.common.elevation, &ocs) {
                    self.push(&layer, tx.apply_edge(edge));
                }
            }
            EntityType::Polyline(poly) => {
                let vertices: Vec<(Point3<f64>, f64)> = poly
                    .vertices()
                    .map(|v| (point(&v.location), v.bulge))
                    .collect();
                for edge in polyline3_edges(&vertices, poly.is_closed()) {
                    self.push(&layer, tx.apply_edge(edge));
                }
            }
            EntityType::Spline(_) => {
                self.push(&layer, InputEdge::other("spline"));
            }
            EntityType::Ellipse(_) => {
                self.push(&layer, InputEdge::other("ellipse"));
            }
            _ => {
                debug!(layer = %layer, "ignoring non-curve DXF entity");
            }
        }
    }

    fn import_insert(
        &mut self,
        insert: &dxf::entities::Insert,
        insert_layer: &str,
        parent_tx: &Transform3,
        stack: &mut Vec<String>,
        depth: usize,
    ) {
        if depth > MAX_INSERT_DEPTH {
            debug!(block = %insert.name, "insert nesting too deep, skipped");
            return;
        }
        let name = insert.name.to_ascii_lowercase();
        if stack.iter().any(|n| n == &name) {
            debug!(block = %insert.name, "recursive block reference, skipped");
            return;
        }
        let (base, entities) = match self.blocks.get(&name) {
            Some(block) => (point(&block.base_point).coords, block.entities.clone()),
            None => return,
        };
        stack.push(name);
        let location = point(&insert.location).coords;
        let scale = Vector3::new(
            insert.x_scale_factor,
            insert.y_scale_factor,
            insert.z_scale_factor,
        );
        let col_count = insert.column_count.max(1) as i32;
        let row_count = insert.row_count.max(1) as i32;

        for row in 0..row_count {
            for col in 0..col_count {
                let offset = Vector3::new(
                    col as f64 * insert.column_spacing,
                    row as f64 * insert.row_spacing,
                    0.0,
                );
                let local = Transform3::from_insert(base, location, scale, insert.rotation, offset);
                let combined = parent_tx.compose(&local);
                for ent in &entities {
                    self.import_entity(ent, &combined, Some(insert_layer), stack, depth);
                }
            }
        }

        stack.pop();
    }
}

/// Entities on layer "0" inside a block take the insert's layer.
fn resolve_layer(layer: &str, parent_layer: Option<&str>) -> String {
    match parent_layer {
        Some(parent) if layer.is_empty() || layer == "0" => parent.to_string(),
        _ if layer.is_empty() => "0".to_string(),
        _ => layer.to_string(),
    }
}

fn point(p: &dxf::Point) -> Point3<f64> {
    Point3::new(p.x, p.y, p.z)
}

fn vector(v: &dxf::Vector) -> Vector3<f64> {
    Vector3::new(v.x, v.y, v.z)
}

/// Degrees to a counter-clockwise parameter range in radians.
fn arc_range(start_deg: f64, end_deg: f64) -> (f64, f64) {
    let first = start_deg.to_radians();
    let mut last = end_deg.to_radians();
    if last < first {
        last += TAU;
    }
    (first, last)
}

/// Object coordinate system of a planar entity.
struct Ocs {
    normal: Unit<Vector3<f64>>,
    x_axis: Vector3<f64>,
    y_axis: Vector3<f64>,
}

impl Ocs {
    fn new(extrusion: Vector3<f64>) -> Self {
        let normal = Unit::try_new(extrusion, GEOM_TOLERANCE).unwrap_or_else(Vector3::z_axis);
        let x_axis = arbitrary_x_axis(&normal).into_inner();
        let y_axis = normal.into_inner().cross(&x_axis);
        Self {
            normal,
            x_axis,
            y_axis,
        }
    }

    fn to_world(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.x_axis * p.x + self.y_axis * p.y + self.normal.into_inner() * p.z)
    }

    fn circle(&self, center: Point3<f64>, radius: f64) -> Circle3 {
        Circle3 {
            center,
            normal: self.normal,
            x_axis: Unit::new_unchecked(self.x_axis),
            radius,
        }
    }
}

/// Spans of a 2D polyline given in `ocs` at `elevation`; bulged spans become arcs.
fn polyline_edges(
    vertices: &[(Vector2<f64>, f64)],
    closed: bool,
    elevation: f64,
    ocs: &Ocs,
) -> Vec<InputEdge> {
    let lift = |v: &Vector2<f64>| ocs.to_world(&Point3::new(v.x, v.y, elevation));
    let mut edges = Vec::new();
    for (i, (a, bulge)) in vertices.iter().enumerate() {
        let b = match vertices.get(i + 1) {
            Some((b, _)) => b,
            None if closed && vertices.len() > 2 => &vertices[0].0,
            None => break,
        };
        if (b - a).norm() < GEOM_TOLERANCE {
            continue;
        }
        match bulge_arc(a, b, *bulge) {
            Some((center, radius, first, last)) => {
                let center = lift(&center);
                edges.push(InputEdge::arc(ocs.circle(center, radius), first, last));
            }
            None => edges.push(InputEdge::line(lift(a), lift(b))),
        }
    }
    edges
}

/// Spans of a world-space polyline. Bulges only apply to planar XY polylines.
fn polyline3_edges(vertices: &[(Point3<f64>, f64)], closed: bool) -> Vec<InputEdge> {
    let ocs = Ocs::new(Vector3::z());
    let mut edges = Vec::new();
    for (i, (a, bulge)) in vertices.iter().enumerate() {
        let b = match vertices.get(i + 1) {
            Some((b, _)) => b,
            None if closed && vertices.len() > 2 => &vertices[0].0,
            None => break,
        };
        if (b - a).norm() < GEOM_TOLERANCE {
            continue;
        }
        let flat = (a.z - b.z).abs() < GEOM_TOLERANCE;
        let arc = if flat {
            bulge_arc(&a.xy().coords, &b.xy().coords, *bulge)
        } else {
            None
        };
        match arc {
            Some((center, radius, first, last)) => {
                let center = Point3::new(center.x, center.y, a.z);
                edges.push(InputEdge::arc(ocs.circle(center, radius), first, last));
            }
            None => edges.push(InputEdge::line(*a, *b)),
        }
    }
    edges
}

/// Centre, radius and counter-clockwise parameter range of a bulged span.
fn bulge_arc(a: &Vector2<f64>, b: &Vector2<f64>, bulge: f64) -> Option<(Vector2<f64>, f64, f64, f64)> {
    if !bulge.is_finite() || bulge.abs() < GEOM_TOLERANCE {
        return None;
    }
    let chord = b - a;
    let half = chord.norm() / 2.0;
    let left = Vector2::new(-chord.y, chord.x).normalize();
    let center = (a + b) / 2.0 + left * (half * (1.0 - bulge * bulge) / (2.0 * bulge));
    let radius = (a - center).norm();

    let angle_of = |p: &Vector2<f64>| (p.y - center.y).atan2(p.x - center.x);
    // Clockwise spans are stored reversed.
    let (from, to) = if bulge > 0.0 { (a, b) } else { (b, a) };
    let first = angle_of(from);
    let mut last = angle_of(to);
    if last <= first {
        last += TAU;
    }
    Some((center, radius, first, last))
}

/// Affine placement of block content: `linear * p + translation`.
#[derive(Debug, Clone, Copy)]
struct Transform3 {
    linear: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl Transform3 {
    fn identity() -> Self {
        Self {
            linear: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    fn from_insert(
        base: Vector3<f64>,
        location: Vector3<f64>,
        scale: Vector3<f64>,
        rotation_deg: f64,
        offset: Vector3<f64>,
    ) -> Self {
        let r = rotation_deg.to_radians();
        let rotation = Matrix3::new(
            r.cos(), -r.sin(), 0.0,
            r.sin(), r.cos(), 0.0,
            0.0, 0.0, 1.0,
        );
        let linear = rotation * Matrix3::from_diagonal(&scale);
        let translation = location + linear * offset - linear * base;
        Self {
            linear,
            translation,
        }
    }

    fn compose(&self, other: &Transform3) -> Self {
        Self {
            linear: self.linear * other.linear,
            translation: self.linear * other.translation + self.translation,
        }
    }

    fn apply_point(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.linear * p.coords + self.translation)
    }

    /// Scale factor when the linear part is a uniformly scaled rotation,
    /// possibly mirrored.
    fn uniform_scale(&self) -> Option<f64> {
        const EPS: f64 = 1e-6;
        let cols = [
            self.linear.column(0).into_owned(),
            self.linear.column(1).into_owned(),
            self.linear.column(2).into_owned(),
        ];
        let s = cols[0].norm();
        if !s.is_finite() || s < EPS {
            return None;
        }
        if cols.iter().any(|c| (c.norm() - s).abs() > EPS * s.max(1.0)) {
            return None;
        }
        if cols[0].dot(&cols[1]).abs() > EPS
            || cols[0].dot(&cols[2]).abs() > EPS
            || cols[1].dot(&cols[2]).abs() > EPS
        {
            return None;
        }
        Some(s)
    }

    fn apply_arc(&self, circle: &Circle3, first: f64, last: f64) -> InputEdge {
        let Some(scale) = self.uniform_scale() else {
            return InputEdge::other("ellipse");
        };
        // A mirror flips `normal x x_axis`; turning the normal over keeps the
        // parameter range pointing at the same points.
        let handedness = self.linear.determinant().signum();
        let normal = Unit::new_normalize(self.linear * circle.normal.into_inner() * handedness);
        let x_axis = Unit::new_normalize(self.linear * circle.x_axis.into_inner());
        let circle = Circle3 {
            center: self.apply_point(&circle.center),
            normal,
            x_axis,
            radius: circle.radius * scale,
        };
        InputEdge::arc(circle, first, last)
    }

    fn apply_edge(&self, edge: InputEdge) -> InputEdge {
        match edge {
            InputEdge::Line { start, end } => {
                InputEdge::line(self.apply_point(&start), self.apply_point(&end))
            }
            InputEdge::Arc {
                circle,
                first,
                last,
            } => self.apply_arc(&circle, first, last),
            other => other,
        }
    }
}
