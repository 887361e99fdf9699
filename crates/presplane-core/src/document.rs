//! Host-side document model: the property bag, the plane entity, its view
//! provider and the document that dispatches property changes between them.

use crate::bundle::{arcs_of, bundle, lines_of};
use crate::error::Result;
use crate::model::{Bundle, ProjectedEdge, Segment, Shape};
use crate::plane::{PageSize, Placement, PlaneFrame};
use crate::project::project;
use crate::scene::Scene;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Export formats a plane can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gateway {
    #[default]
    #[serde(rename = "PPTX", alias = "pptx")]
    Pptx,
}

/// Configuration owned and persisted by the host document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PlaneProperties {
    /// Names of the shapes flattened onto the plane.
    pub objects: Vec<String>,
    pub page_size: PageSize,
    pub scale: f64,
    /// Arc sampling spacing in millimetres.
    pub discretize: f64,
    /// Export destination; empty disables export.
    pub file: PathBuf,
    /// `None` disables export.
    pub gateway: Option<Gateway>,
    pub placement: Placement,
}

impl Default for PlaneProperties {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            page_size: PageSize::A4,
            scale: 1.0,
            discretize: 2.0,
            file: PathBuf::new(),
            gateway: Some(Gateway::Pptx),
            placement: Placement::identity(),
        }
    }
}

impl PlaneProperties {
    pub fn frame(&self) -> PlaneFrame {
        PlaneFrame {
            page_size: self.page_size,
            scale: self.scale,
            placement: self.placement,
            discretize_spacing: self.discretize,
        }
    }
}

/// Property names the host reports changes for. `Shape` is the computed
/// projection result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Objects,
    PageSize,
    Scale,
    Discretize,
    File,
    Gateway,
    Placement,
    Shape,
}

/// Shapes available for selection, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ShapeLibrary {
    shapes: Vec<Shape>,
}

impl ShapeLibrary {
    pub fn new(shapes: Vec<Shape>) -> Self {
        let mut lib = Self::default();
        for shape in shapes {
            lib.insert(shape);
        }
        lib
    }

    /// Adds `shape`, replacing any shape with the same name.
    pub fn insert(&mut self, shape: Shape) {
        match self.shapes.iter_mut().find(|s| s.name == shape.name) {
            Some(slot) => *slot = shape,
            None => self.shapes.push(shape),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.shapes.iter().map(|s| s.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Shape> {
        self.shapes.iter()
    }
}

/// Computation side of a document entity.
pub trait DocumentObject {
    /// Full recompute from the current properties.
    fn execute(&mut self, shapes: &ShapeLibrary) -> Result<()>;

    /// Returns `true` when the change invalidates the computed result.
    fn on_property_changed(&mut self, prop: Property) -> bool;
}

/// Presentation side of a document entity.
pub trait ViewProvider {
    fn on_attach(&mut self, plane: &PresentationPlane) -> Result<()>;

    fn update_data(&mut self, plane: &PresentationPlane, prop: Property) -> Result<()>;

    fn double_clicked(
        &mut self,
        plane: &PresentationPlane,
        exporter: &dyn SlideExporter,
    ) -> Result<ExportOutcome> {
        plane.export_now(exporter)
    }
}

/// Writes straight line segments onto a page-sized slide.
pub trait SlideExporter {
    /// Returns the number of connectors written.
    fn write_lines(&self, page: (f64, f64), lines: &[Segment], path: &Path) -> Result<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoGateway,
    EmptyPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Skipped(SkipReason),
    Written { path: PathBuf, connectors: usize },
}

/// The plane entity. Its only durable state is [`PlaneProperties`]; the
/// projected edges are recomputed on every `execute`.
#[derive(Debug, Clone, Default)]
pub struct PresentationPlane {
    properties: PlaneProperties,
    shape: Vec<ProjectedEdge>,
    resolved_shapes: usize,
    input_edges: usize,
    omitted_edges: usize,
    unresolved: Vec<String>,
}

impl PresentationPlane {
    pub fn new(properties: PlaneProperties) -> Self {
        Self {
            properties,
            ..Self::default()
        }
    }

    pub fn properties(&self) -> &PlaneProperties {
        &self.properties
    }

    pub fn frame(&self) -> PlaneFrame {
        self.properties.frame()
    }

    pub fn page_size(&self) -> (f64, f64) {
        self.properties.page_size.dimensions()
    }

    /// Projected edges from the last `execute`.
    pub fn shape(&self) -> &[ProjectedEdge] {
        &self.shape
    }

    pub fn resolved_shapes(&self) -> usize {
        self.resolved_shapes
    }

    pub fn input_edges(&self) -> usize {
        self.input_edges
    }

    /// Input edges that left nothing on the face during the last `execute`.
    pub fn omitted_edges(&self) -> usize {
        self.omitted_edges
    }

    /// Object names that matched no shape during the last `execute`.
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn lines_to_points(&self) -> Vec<Segment> {
        lines_of(&self.shape)
    }

    pub fn arcs_to_points(&self) -> Result<Vec<Segment>> {
        arcs_of(&self.shape, self.properties.discretize)
    }

    pub fn bundle_points(&self) -> Result<Bundle> {
        bundle(&self.shape, self.properties.discretize)
    }

    /// Exports the line-derived segments. A missing gateway or an empty path
    /// makes this a no-op.
    pub fn export_now(&self, exporter: &dyn SlideExporter) -> Result<ExportOutcome> {
        let props = &self.properties;
        if props.gateway != Some(Gateway::Pptx) {
            if !props.file.as_os_str().is_empty() {
                warn!(file = %props.file.display(), "no export gateway selected, skipping export");
            }
            return Ok(ExportOutcome::Skipped(SkipReason::NoGateway));
        }
        if props.file.as_os_str().is_empty() {
            return Ok(ExportOutcome::Skipped(SkipReason::EmptyPath));
        }

        let lines = self.lines_to_points();
        let connectors = exporter.write_lines(self.page_size(), &lines, &props.file)?;
        info!(file = %props.file.display(), connectors, "exported presentation plane");
        Ok(ExportOutcome::Written {
            path: props.file.clone(),
            connectors,
        })
    }
}

impl DocumentObject for PresentationPlane {
    fn execute(&mut self, shapes: &ShapeLibrary) -> Result<()> {
        let mut selected = Vec::new();
        let mut unresolved = Vec::new();
        for name in &self.properties.objects {
            match shapes.get(name) {
                Some(shape) => selected.push(shape),
                None => {
                    warn!(object = %name, "plane object not found, skipped");
                    unresolved.push(name.clone());
                }
            }
        }

        // A failed projection must not leave the previous result behind.
        self.shape.clear();
        self.omitted_edges = 0;
        self.input_edges = selected.iter().map(|s| s.edges.len()).sum();
        self.resolved_shapes = selected.len();
        self.unresolved = unresolved;

        let edges = selected.iter().flat_map(|s| s.edges.iter());
        let projection = project(edges, &self.frame())?;
        self.shape = projection.edges;
        self.omitted_edges = projection.omitted;
        Ok(())
    }

    fn on_property_changed(&mut self, prop: Property) -> bool {
        !matches!(prop, Property::File | Property::Gateway | Property::Shape)
    }
}

/// Default view provider: keeps a [`Scene`] in sync with the plane.
#[derive(Debug, Clone, Default)]
pub struct PlaneView {
    scene: Scene,
    attached: bool,
}

impl PlaneView {
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

impl ViewProvider for PlaneView {
    fn on_attach(&mut self, _plane: &PresentationPlane) -> Result<()> {
        self.scene = Scene::new();
        self.attached = true;
        Ok(())
    }

    fn update_data(&mut self, plane: &PresentationPlane, prop: Property) -> Result<()> {
        if prop != Property::Shape {
            return Ok(());
        }
        let rebuilt = plane
            .bundle_points()
            .and_then(|bundle| self.scene.rebuild(&plane.frame(), &bundle));
        if rebuilt.is_err() {
            self.scene = Scene::new();
        }
        rebuilt
    }
}

/// One plane, its view and the shapes it can select from.
pub struct Document<V: ViewProvider = PlaneView> {
    shapes: ShapeLibrary,
    plane: PresentationPlane,
    view: V,
}

impl<V: ViewProvider> Document<V> {
    /// Creates the plane, computes it and attaches `view`.
    pub fn new(shapes: ShapeLibrary, properties: PlaneProperties, mut view: V) -> Result<Self> {
        let mut plane = PresentationPlane::new(properties);
        plane.execute(&shapes)?;
        view.on_attach(&plane)?;
        view.update_data(&plane, Property::Shape)?;
        Ok(Self {
            shapes,
            plane,
            view,
        })
    }

    pub fn plane(&self) -> &PresentationPlane {
        &self.plane
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn shapes(&self) -> &ShapeLibrary {
        &self.shapes
    }

    /// Applies `change` to the plane's properties and recomputes if needed.
    ///
    /// The new value is kept even when the recompute fails.
    pub fn set_property<F>(&mut self, prop: Property, change: F) -> Result<()>
    where
        F: FnOnce(&mut PlaneProperties),
    {
        change(&mut self.plane.properties);
        self.view.update_data(&self.plane, prop)?;
        if self.plane.on_property_changed(prop) {
            self.recompute()?;
        }
        Ok(())
    }

    pub fn set_shapes(&mut self, shapes: ShapeLibrary) -> Result<()> {
        self.shapes = shapes;
        self.recompute()
    }

    /// Full rebuild. On failure the plane and its view are left empty.
    pub fn recompute(&mut self) -> Result<()> {
        let executed = self.plane.execute(&self.shapes);
        let updated = self.view.update_data(&self.plane, Property::Shape);
        executed.and(updated)
    }

    /// What a double click on the plane does: export it.
    pub fn activate(&mut self, exporter: &dyn SlideExporter) -> Result<ExportOutcome> {
        self.view.double_clicked(&self.plane, exporter)
    }
}
