use nalgebra::{Point3, Vector3};
use presplane_core::document::{
    Document, DocumentObject, ExportOutcome, Gateway, PlaneProperties, PlaneView,
    PresentationPlane, Property, ShapeLibrary, SkipReason, SlideExporter,
};
use presplane_core::model::{Circle3, InputEdge, Segment, Shape};
use presplane_core::plane::{PageSize, Rotation};
use presplane_core::report::FlattenReport;
use presplane_core::{FlattenError, Result};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

#[derive(Default)]
struct RecordingExporter {
    calls: RefCell<Vec<((f64, f64), Vec<Segment>, PathBuf)>>,
}

impl SlideExporter for RecordingExporter {
    fn write_lines(&self, page: (f64, f64), lines: &[Segment], path: &Path) -> Result<usize> {
        self.calls
            .borrow_mut()
            .push((page, lines.to_vec(), path.to_path_buf()));
        Ok(lines.len())
    }
}

fn library() -> ShapeLibrary {
    ShapeLibrary::new(vec![
        Shape::new(
            "bar",
            vec![InputEdge::line(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(10.0, 0.0, 0.0),
            )],
        ),
        Shape::new(
            "ring",
            vec![InputEdge::full_circle(Circle3::new(
                Point3::origin(),
                Vector3::z(),
                10.0,
            ))],
        ),
    ])
}

fn properties(objects: &[&str]) -> PlaneProperties {
    PlaneProperties {
        objects: objects.iter().map(|s| s.to_string()).collect(),
        discretize: 5.0,
        ..PlaneProperties::default()
    }
}

#[test]
fn defaults_match_host_properties() {
    let props = PlaneProperties::default();
    assert!(props.objects.is_empty());
    assert_eq!(PageSize::A4, props.page_size);
    assert_eq!(1.0, props.scale);
    assert_eq!(2.0, props.discretize);
    assert!(props.file.as_os_str().is_empty());
    assert_eq!(Some(Gateway::Pptx), props.gateway);
}

#[test]
fn properties_accept_host_names() {
    let json = r#"{ "Objects": ["bar"], "PageSize": "SizeA3Paper", "Gateway": "pptx", "Scale": 2.0 }"#;
    let props: PlaneProperties = serde_json::from_str(json).unwrap();
    assert_eq!(vec!["bar".to_string()], props.objects);
    assert_eq!(PageSize::A3, props.page_size);
    assert_eq!(2.0, props.scale);
    assert_eq!(2.0, props.discretize);
    assert_eq!(Some(Gateway::Pptx), props.gateway);

    let none: PlaneProperties = serde_json::from_str(r#"{ "Gateway": null }"#).unwrap();
    assert_eq!(None, none.gateway);
}

#[test]
fn execute_resolves_objects_in_order() {
    let mut plane = PresentationPlane::new(properties(&["ring", "missing", "bar"]));
    plane.execute(&library()).unwrap();

    assert_eq!(2, plane.resolved_shapes());
    assert_eq!(2, plane.input_edges());
    assert_eq!(&["missing".to_string()], plane.unresolved());
    assert_eq!(1, plane.lines_to_points().len());
    assert_eq!(14, plane.arcs_to_points().unwrap()[0].len());

    let bundle = plane.bundle_points().unwrap();
    assert_eq!(2, bundle.segments[0].len());
    assert_eq!(14, bundle.segments[1].len());
}

#[test]
fn scenario_line_exports_one_connector() {
    let mut plane = PresentationPlane::new(PlaneProperties {
        file: PathBuf::from("deck.pptx"),
        ..properties(&["bar", "ring"])
    });
    plane.execute(&library()).unwrap();

    let exporter = RecordingExporter::default();
    let outcome = plane.export_now(&exporter).unwrap();
    assert_eq!(
        ExportOutcome::Written {
            path: PathBuf::from("deck.pptx"),
            connectors: 1
        },
        outcome
    );

    let calls = exporter.calls.borrow();
    assert_eq!(1, calls.len());
    let (page, lines, _) = &calls[0];
    assert_eq!((297.0, 210.0), *page);
    // Arc segments never reach the exporter.
    assert_eq!(1, lines.len());
    assert_eq!(2, lines[0].len());
}

#[test]
fn export_is_skipped_without_gateway_or_file() {
    let exporter = RecordingExporter::default();

    let mut no_file = PresentationPlane::new(properties(&["bar"]));
    no_file.execute(&library()).unwrap();
    assert_eq!(
        ExportOutcome::Skipped(SkipReason::EmptyPath),
        no_file.export_now(&exporter).unwrap()
    );

    let mut no_gateway = PresentationPlane::new(PlaneProperties {
        file: PathBuf::from("deck.pptx"),
        gateway: None,
        ..properties(&["bar"])
    });
    no_gateway.execute(&library()).unwrap();
    assert_eq!(
        ExportOutcome::Skipped(SkipReason::NoGateway),
        no_gateway.export_now(&exporter).unwrap()
    );

    assert!(exporter.calls.borrow().is_empty());
}

#[test]
fn property_changes_recompute_the_view() {
    let mut doc = Document::new(library(), properties(&["bar"]), PlaneView::default()).unwrap();
    assert!(doc.view().is_attached());
    assert_eq!(2, doc.view().scene().edges.coords.len());

    doc.set_property(Property::Objects, |p| p.objects.push("ring".to_string()))
        .unwrap();
    assert_eq!(16, doc.view().scene().edges.coords.len());
    assert_eq!(4, doc.view().scene().endpoints.coords.len());

    doc.set_property(Property::Discretize, |p| p.discretize = 1.0)
        .unwrap();
    assert!(doc.view().scene().edges.coords.len() > 16);

    doc.set_property(Property::PageSize, |p| p.page_size = PageSize::A3)
        .unwrap();
    assert_eq!(
        Some(&Point3::new(-210.0, 148.5, 0.0)),
        doc.view().scene().outline.coords.get(0)
    );
}

#[test]
fn file_change_does_not_recompute() {
    let mut plane = PresentationPlane::default();
    assert!(!plane.on_property_changed(Property::File));
    assert!(!plane.on_property_changed(Property::Gateway));
    assert!(plane.on_property_changed(Property::Scale));
    assert!(plane.on_property_changed(Property::Placement));
}

#[test]
fn bad_scale_surfaces_on_recompute() {
    let mut doc = Document::new(library(), properties(&["bar"]), PlaneView::default()).unwrap();
    let err = doc
        .set_property(Property::Scale, |p| p.scale = 0.0)
        .unwrap_err();
    assert!(matches!(err, FlattenError::InvalidScale(_)));
    assert_eq!(0.0, doc.plane().properties().scale);
}

#[test]
fn failed_recompute_leaves_nothing_to_export() {
    let props = PlaneProperties {
        file: PathBuf::from("out.pptx"),
        ..properties(&["bar", "ring"])
    };
    let mut doc = Document::new(library(), props, PlaneView::default()).unwrap();
    assert_eq!(2, doc.plane().shape().len());
    assert!(!doc.view().scene().edges.coords.is_empty());

    assert!(doc.set_property(Property::Scale, |p| p.scale = 0.0).is_err());
    assert!(doc.plane().shape().is_empty());
    assert!(doc.view().scene().edges.coords.is_empty());
    assert!(doc.view().scene().outline.coords.is_empty());

    let exporter = RecordingExporter::default();
    let outcome = doc.activate(&exporter).unwrap();
    assert!(matches!(outcome, ExportOutcome::Written { connectors: 0, .. }));
    assert!(exporter.calls.borrow()[0].1.is_empty());

    doc.set_property(Property::Scale, |p| p.scale = 1.0).unwrap();
    assert_eq!(2, doc.plane().shape().len());
}

#[test]
fn double_click_exports() {
    let props = PlaneProperties {
        file: PathBuf::from("out.pptx"),
        ..properties(&["bar"])
    };
    let mut doc = Document::new(library(), props, PlaneView::default()).unwrap();
    let exporter = RecordingExporter::default();
    let outcome = doc.activate(&exporter).unwrap();
    assert!(matches!(outcome, ExportOutcome::Written { connectors: 1, .. }));
}

#[test]
fn report_counts_and_warnings() {
    let mut shapes = library();
    shapes.insert(Shape::new(
        "curvy",
        vec![
            InputEdge::other("spline"),
            InputEdge::line(
                Point3::new(900.0, 0.0, 0.0),
                Point3::new(950.0, 0.0, 0.0),
            ),
        ],
    ));
    let mut plane = PresentationPlane::new(PlaneProperties {
        placement: presplane_core::plane::Placement::new(
            Vector3::zeros(),
            Rotation::from_degrees(Vector3::z(), 15.0),
        ),
        ..properties(&["bar", "ring", "curvy", "ghost"])
    });
    plane.execute(&shapes).unwrap();

    let report = FlattenReport::build(&plane).unwrap();
    assert_eq!(3, report.counts.shapes);
    assert_eq!(4, report.counts.input_edges);
    assert_eq!(3, report.counts.projected_edges);
    assert_eq!(1, report.counts.omitted_edges);
    assert_eq!(1, report.counts.line_segments);
    assert_eq!(1, report.counts.arc_segments);
    assert_eq!(1, report.counts.dropped_curves);
    assert_eq!(16, report.counts.points);
    assert_eq!(Some(&1), report.dropped_kinds.get("spline"));

    let codes: Vec<&str> = report.warnings.iter().map(|w| w.code.as_str()).collect();
    assert_eq!(
        vec![
            "unresolved_object",
            "unsupported_curves",
            "omitted_edges",
            "rotated_plane"
        ],
        codes
    );
}

#[test]
fn empty_plane_reports_no_objects() {
    let mut plane = PresentationPlane::default();
    plane.execute(&library()).unwrap();
    let report = FlattenReport::build(&plane).unwrap();
    assert_eq!(0, report.counts.points);
    assert!(report.extents.is_none());
    assert_eq!("no_objects", report.warnings[0].code);
}
