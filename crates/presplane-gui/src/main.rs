use anyhow::{bail, Context, Result};
use eframe::egui;
use nalgebra::{Point2, Point3, Vector3};
use presplane_core::document::{
    Document, ExportOutcome, Gateway, PlaneProperties, PlaneView, PresentationPlane, Property,
    ShapeLibrary,
};
use presplane_core::geom::BBox2;
use presplane_core::model::Shape;
use presplane_core::plane::{PageSize, Rotation};
use presplane_core::report::FlattenReport;
use presplane_core::scene::{CoordinateBuffer, IndexedPolyline, Scene, Style};
use presplane_pptx::PptxExporter;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> eframe::Result {
    if let Err(e) = tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(Level::INFO).finish(),
    ) {
        eprintln!("failed to install logger: {e}");
    }

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "presplane",
        native_options,
        Box::new(|cc| Ok(Box::new(PresPlaneApp::new(cc)))),
    )
}

struct PresPlaneApp {
    input_path: Option<PathBuf>,
    doc: Option<Document>,
    report: Option<FlattenReport>,

    /// Edited copy of the plane properties; pushed to the document after each frame.
    draft: PlaneProperties,
    angle_deg: f64,

    last_export: Option<PathBuf>,

    zoom: f32,
    pan: egui::Vec2,

    status: String,
}

impl PresPlaneApp {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            input_path: None,
            doc: None,
            report: None,
            draft: PlaneProperties::default(),
            angle_deg: 0.0,
            last_export: None,
            zoom: 1.0,
            pan: egui::Vec2::ZERO,
            status: "Open a DXF or shape JSON to begin.".to_string(),
        }
    }

    fn pick_input(&mut self) {
        let file = rfd::FileDialog::new()
            .add_filter("CAD shapes", &["dxf", "json"])
            .pick_file();
        if let Some(path) = file {
            self.load_input(&path);
        }
    }

    fn load_input(&mut self, path: &Path) {
        let shapes = match import_any(path) {
            Ok(shapes) => shapes,
            Err(e) => {
                self.status = format!("Failed to load {}: {e:#}", path.display());
                return;
            }
        };

        // Keep the plane settings across reloads; only the selection follows the file.
        let mut props = self.draft.clone();
        props.objects = shapes.iter().map(|s| s.name.clone()).collect();

        match Document::new(ShapeLibrary::new(shapes), props.clone(), PlaneView::default()) {
            Ok(doc) => {
                info!(path = %path.display(), objects = props.objects.len(), "loaded shapes");
                self.draft = props;
                self.doc = Some(doc);
                self.input_path = Some(path.to_path_buf());
                self.last_export = None;
                self.zoom = 1.0;
                self.pan = egui::Vec2::ZERO;
                self.refresh_report();
                self.status = format!("Loaded {}", path.display());
            }
            Err(e) => {
                self.status = format!("Failed to flatten {}: {e}", path.display());
                self.doc = None;
                self.report = None;
            }
        }
    }

    fn handle_file_drop(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().find(|f| f.path.is_some()) else {
            return;
        };
        if let Some(path) = file.path {
            self.load_input(&path);
        }
    }

    /// Pushes every draft field that differs from the document through
    /// `set_property`, one change notification per property.
    fn sync_properties(&mut self) {
        self.draft.placement.rotation =
            Rotation::from_degrees(self.draft.placement.rotation.axis, self.angle_deg);

        let Some(doc) = self.doc.as_mut() else {
            return;
        };
        let changed = changed_properties(doc.plane().properties(), &self.draft);
        if changed.is_empty() {
            return;
        }

        let mut failed = None;
        for prop in changed {
            let draft = &self.draft;
            if let Err(e) = doc.set_property(prop, |p| copy_property(prop, draft, p)) {
                warn!(?prop, error = %e, "recompute failed");
                failed = Some(e.to_string());
            }
        }
        self.refresh_report();
        if let Some(e) = failed {
            self.status = e;
        }
    }

    fn refresh_report(&mut self) {
        self.report = self
            .doc
            .as_ref()
            .and_then(|doc| FlattenReport::build(doc.plane()).ok());
    }

    fn run_export(&mut self) {
        let Some(doc) = self.doc.as_mut() else {
            self.status = "No shapes loaded.".to_string();
            return;
        };

        let stem = self
            .input_path
            .as_deref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("plane");
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PowerPoint", &["pptx"])
            .set_file_name(format!("{stem}.pptx"))
            .save_file()
        else {
            return;
        };

        self.draft.file = path.clone();
        if let Err(e) = doc.set_property(Property::File, |p| p.file = path.clone()) {
            self.status = format!("Failed to set export file: {e}");
            return;
        }

        match doc.activate(&PptxExporter) {
            Ok(ExportOutcome::Written { path, connectors }) => {
                self.status = format!("Wrote {} ({connectors} connectors)", path.display());
                self.last_export = Some(path);
            }
            Ok(ExportOutcome::Skipped(reason)) => {
                self.status = format!("Export skipped: {reason:?}");
            }
            Err(e) => {
                self.status = format!("Export failed: {e}");
            }
        }
    }

    fn properties_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Plane");
        egui::ComboBox::from_label("Page size")
            .selected_text(self.draft.page_size.label())
            .show_ui(ui, |ui| {
                for page in PageSize::ALL {
                    ui.selectable_value(&mut self.draft.page_size, page, page.label());
                }
            });
        ui.add(
            egui::DragValue::new(&mut self.draft.scale)
                .speed(0.01)
                .range(0.001..=1000.0)
                .prefix("scale="),
        );
        ui.add(
            egui::DragValue::new(&mut self.draft.discretize)
                .speed(0.05)
                .range(0.01..=100.0)
                .prefix("discretize=")
                .suffix(" mm"),
        );

        ui.separator();
        ui.label("Base");
        vector_row(ui, &mut self.draft.placement.base);
        ui.label("Axis");
        vector_row(ui, &mut self.draft.placement.rotation.axis);
        ui.add(
            egui::DragValue::new(&mut self.angle_deg)
                .speed(0.5)
                .range(-360.0..=360.0)
                .prefix("angle=")
                .suffix("°"),
        );

        ui.separator();
        let gateway_label = match self.draft.gateway {
            Some(Gateway::Pptx) => "PPTX",
            None => "(none)",
        };
        egui::ComboBox::from_label("Gateway")
            .selected_text(gateway_label)
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.draft.gateway, Some(Gateway::Pptx), "PPTX");
                ui.selectable_value(&mut self.draft.gateway, None, "(none)");
            });

        ui.separator();
        ui.heading("Objects");
        let Some(doc) = &self.doc else {
            ui.label("No shapes loaded.");
            return;
        };
        let names = doc.shapes().names();
        egui::ScrollArea::vertical().show(ui, |ui| {
            for name in names {
                let mut on = self.draft.objects.contains(&name);
                if ui.checkbox(&mut on, name.as_str()).changed() {
                    if on {
                        self.draft.objects.push(name);
                    } else {
                        self.draft.objects.retain(|n| *n != name);
                    }
                }
            }
        });
    }
}

impl eframe::App for PresPlaneApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_file_drop(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open DXF/JSON…").clicked() {
                    self.pick_input();
                }
                ui.separator();
                let can_export = self.doc.is_some();
                if ui
                    .add_enabled(can_export, egui::Button::new("Export…"))
                    .clicked()
                {
                    self.run_export();
                }
                if ui.button("Reset view").clicked() {
                    self.zoom = 1.0;
                    self.pan = egui::Vec2::ZERO;
                }
            });
            if let Some(p) = &self.input_path {
                ui.label(format!("Input: {}", p.display()));
            }
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                if let Some(p) = &self.last_export {
                    if ui.button("Copy path").clicked() {
                        ui.ctx().copy_text(p.display().to_string());
                    }
                    if ui.button("Open file").clicked() {
                        let _ = open::that(p);
                    }
                    if let Some(dir) = p.parent() {
                        if ui.button("Open folder").clicked() {
                            let _ = open::that(dir);
                        }
                    }
                }
            });
        });

        egui::SidePanel::left("properties")
            .resizable(true)
            .show(ctx, |ui| self.properties_panel(ui));

        egui::SidePanel::right("report")
            .resizable(true)
            .show(ctx, |ui| draw_report(ui, self.report.as_ref()));

        egui::CentralPanel::default().show(ctx, |ui| {
            draw_scene(ui, self);
        });

        self.sync_properties();
    }
}

fn import_any(path: &Path) -> Result<Vec<Shape>> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "dxf" => presplane_import_dxf::import_dxf(path),
        "json" => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read shapes: {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parse shapes: {}", path.display()))
        }
        _ => bail!("Unsupported input extension: .{ext}"),
    }
}

/// Properties whose value differs between `current` and `draft`, in the
/// order the host would report them.
fn changed_properties(current: &PlaneProperties, draft: &PlaneProperties) -> Vec<Property> {
    let mut changed = Vec::new();
    if current.objects != draft.objects {
        changed.push(Property::Objects);
    }
    if current.page_size != draft.page_size {
        changed.push(Property::PageSize);
    }
    if current.scale != draft.scale {
        changed.push(Property::Scale);
    }
    if current.discretize != draft.discretize {
        changed.push(Property::Discretize);
    }
    if current.file != draft.file {
        changed.push(Property::File);
    }
    if current.gateway != draft.gateway {
        changed.push(Property::Gateway);
    }
    if current.placement != draft.placement {
        changed.push(Property::Placement);
    }
    changed
}

fn copy_property(prop: Property, from: &PlaneProperties, to: &mut PlaneProperties) {
    match prop {
        Property::Objects => to.objects = from.objects.clone(),
        Property::PageSize => to.page_size = from.page_size,
        Property::Scale => to.scale = from.scale,
        Property::Discretize => to.discretize = from.discretize,
        Property::File => to.file = from.file.clone(),
        Property::Gateway => to.gateway = from.gateway,
        Property::Placement => to.placement = from.placement,
        Property::Shape => {}
    }
}

fn vector_row(ui: &mut egui::Ui, v: &mut Vector3<f64>) {
    ui.horizontal(|ui| {
        for (label, c) in ["x=", "y=", "z="].into_iter().zip(v.iter_mut()) {
            ui.add(egui::DragValue::new(c).speed(0.1).prefix(label));
        }
    });
}

fn draw_report(ui: &mut egui::Ui, report: Option<&FlattenReport>) {
    ui.heading("Report");
    ui.separator();
    let Some(report) = report else {
        ui.label("Nothing flattened yet.");
        return;
    };

    let c = &report.counts;
    ui.label(format!(
        "Page: {} ({} × {} mm)",
        report.page_size.label(),
        report.dimensions.0,
        report.dimensions.1
    ));
    ui.label(format!("Shapes: {} ({} edges)", c.shapes, c.input_edges));
    ui.label(format!(
        "Projected: {} (omitted {})",
        c.projected_edges, c.omitted_edges
    ));
    ui.label(format!(
        "Lines: {}  Arcs: {}  Dropped: {}",
        c.line_segments, c.arc_segments, c.dropped_curves
    ));
    ui.label(format!("Points: {}", c.points));

    if !report.warnings.is_empty() {
        ui.separator();
        for w in &report.warnings {
            ui.colored_label(egui::Color32::from_rgb(0xFD, 0x8D, 0x3C), w.message.as_str());
        }
    }

    ui.separator();
    ui.collapsing("Raw report.json", |ui| {
        if let Ok(json) = serde_json::to_string_pretty(report) {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.monospace(json);
            });
        }
    });
}

fn draw_scene(ui: &mut egui::Ui, app: &mut PresPlaneApp) {
    let Some(doc) = &app.doc else {
        ui.label("No input loaded.");
        return;
    };
    let scene = doc.view().scene();
    let Some(face) = face_rect(doc.plane()) else {
        ui.label("Plane scale must be positive.");
        return;
    };

    let mut extents = face;
    for p in &scene.edges.coords.points {
        extents.include_point(Point2::new(p.x, p.y));
    }

    let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::drag());
    let painter = ui.painter_at(rect);

    if response.dragged() {
        app.pan += response.drag_delta();
    }
    if response.hovered() {
        let scroll = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll.abs() > 0.0 {
            let factor = (scroll / 200.0).exp();
            app.zoom = (app.zoom * factor).clamp(0.1, 50.0);
        }
    }

    let transform = WorldToScreen::new(rect, extents, app.pan, app.zoom);

    let page = transform.bbox_to_rect(face);
    painter.rect_filled(page, egui::CornerRadius::same(0), egui::Color32::from_gray(150));

    draw_scene_groups(&painter, &transform, scene);
}

/// The face as drawn by the outline group: the page divided by the scale.
fn face_rect(plane: &PresentationPlane) -> Option<BBox2> {
    let (hw, hh) = plane.frame().face_half_extents().ok()?;
    Some(BBox2::centered(hw, hh))
}

fn draw_scene_groups(painter: &egui::Painter, tx: &WorldToScreen, scene: &Scene) {
    let outline = &scene.outline;
    draw_runs(painter, tx, &outline.coords, &outline.polygon);
    draw_points(
        painter,
        tx,
        &outline.coords,
        outline.points.indices(),
        outline.points.style,
    );

    let edges = &scene.edges;
    draw_runs(painter, tx, &edges.coords, &edges.edge_set);
    draw_points(
        painter,
        tx,
        &edges.coords,
        edges.points.indices(),
        edges.points.style,
    );

    let endpoints = &scene.endpoints;
    draw_points(
        painter,
        tx,
        &endpoints.coords,
        endpoints.points.indices(),
        endpoints.points.style,
    );
}

fn draw_runs(
    painter: &egui::Painter,
    tx: &WorldToScreen,
    coords: &CoordinateBuffer,
    lines: &IndexedPolyline,
) {
    let stroke = egui::Stroke::new(lines.style.line_width, style_color(lines.style));
    for run in lines.runs() {
        let pts: Vec<egui::Pos2> = run
            .iter()
            .filter_map(|&i| coords.get(i))
            .map(|p| tx.point(p))
            .collect();
        if pts.len() > 1 {
            painter.add(egui::Shape::line(pts, stroke));
        }
    }
}

fn draw_points(
    painter: &egui::Painter,
    tx: &WorldToScreen,
    coords: &CoordinateBuffer,
    indices: std::ops::Range<usize>,
    style: Style,
) {
    let color = style_color(style);
    for p in indices.filter_map(|i| coords.points.get(i)) {
        painter.circle_filled(tx.point(p), style.point_size, color);
    }
}

fn style_color(style: Style) -> egui::Color32 {
    let [r, g, b] = style.color;
    egui::Rgba::from_rgb(r, g, b).into()
}

/// Plane millimetres to screen pixels, Y up, fitted to `rect`.
#[derive(Debug, Clone, Copy)]
struct WorldToScreen {
    rect: egui::Rect,
    center: Point2<f64>,
    scale: f32,
    pan: egui::Vec2,
}

impl WorldToScreen {
    fn new(rect: egui::Rect, world: BBox2, pan: egui::Vec2, zoom: f32) -> Self {
        let center = world.center();
        let world_w = world.width().max(1e-6) as f32;
        let world_h = world.height().max(1e-6) as f32;
        let sx = rect.width() / world_w;
        let sy = rect.height() / world_h;
        let scale = (sx.min(sy) * 0.9).max(1e-3) * zoom;
        Self {
            rect,
            center,
            scale,
            pan,
        }
    }

    fn point(&self, p: &Point3<f64>) -> egui::Pos2 {
        let dx = (p.x - self.center.x) as f32;
        let dy = (p.y - self.center.y) as f32;
        let x = self.rect.center().x + self.pan.x + dx * self.scale;
        let y = self.rect.center().y + self.pan.y - dy * self.scale;
        egui::pos2(x, y)
    }

    fn bbox_to_rect(&self, b: BBox2) -> egui::Rect {
        let p0 = self.point(&Point3::new(b.min.x, b.min.y, 0.0));
        let p1 = self.point(&Point3::new(b.max.x, b.max.y, 0.0));
        egui::Rect::from_min_max(
            egui::pos2(p0.x.min(p1.x), p0.y.min(p1.y)),
            egui::pos2(p0.x.max(p1.x), p0.y.max(p1.y)),
        )
    }
}
