use nalgebra::{Point3, Vector3};
use presplane_core::bundle::{arcs_of, bundle, dropped_count, flatten, lines_of};
use presplane_core::discretize::{discretize_arc, sample_count};
use presplane_core::model::{Circle3, EdgeKind, InputEdge, ProjectedEdge};
use presplane_core::plane::{Placement, PlaneFrame, Rotation};
use presplane_core::project::{project, project_edges};
use presplane_core::FlattenError;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

fn close(a: &Point3<f64>, b: &Point3<f64>) -> bool {
    (*a - *b).norm() < 1e-9
}

fn circle_at_origin(radius: f64) -> Circle3 {
    Circle3::new(Point3::origin(), Vector3::z(), radius)
}

#[test]
fn line_yields_one_two_point_segment() {
    let edges = vec![InputEdge::line(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, 0.0),
    )];
    let projected = project_edges(&edges, &PlaneFrame::default()).unwrap();
    let lines = lines_of(&projected);

    assert_eq!(1, lines.len());
    assert_eq!(2, lines[0].len());
    assert!(close(&Point3::new(0.0, 0.0, 0.0), &lines[0].points[0]));
    assert!(close(&Point3::new(10.0, 0.0, 0.0), &lines[0].points[1]));
}

#[test]
fn lifted_line_lands_on_face_and_is_recentred() {
    let frame = PlaneFrame {
        placement: Placement::from_base(Vector3::new(100.0, 0.0, 50.0)),
        ..PlaneFrame::default()
    };
    let edges = vec![InputEdge::line(
        Point3::new(100.0, 0.0, -7.0),
        Point3::new(110.0, 5.0, 3.0),
    )];
    let projected = project_edges(&edges, &frame).unwrap();
    match &projected[0] {
        ProjectedEdge::Line { start, end } => {
            assert!(close(&Point3::new(0.0, 0.0, 0.0), start));
            assert!(close(&Point3::new(10.0, 5.0, 0.0), end));
        }
        other => panic!("expected a line, got {other:?}"),
    }
}

#[test]
fn full_circle_sampling() {
    let circle = circle_at_origin(10.0);
    let points = discretize_arc(&circle, 0.0, TAU, 5.0).unwrap();
    assert_eq!(14, points.len());
    assert_eq!(14, sample_count(circle.arc_length(0.0, TAU), 5.0).unwrap());
    assert!(close(&points[0], points.last().unwrap()));
    assert!(close(&Point3::new(10.0, 0.0, 0.0), &points[0]));

    let mut previous = 0;
    for spacing in [10.0, 5.0, 2.0, 1.0, 0.5, 0.1] {
        let n = discretize_arc(&circle, 0.0, TAU, spacing).unwrap().len();
        assert!(n >= previous, "{n} points at {spacing} after {previous}");
        previous = n;
    }
}

#[test]
fn short_arc_keeps_both_endpoints() {
    let circle = circle_at_origin(1.0);
    let points = discretize_arc(&circle, 0.0, 0.1, 5.0).unwrap();
    assert_eq!(2, points.len());
    assert!(close(&circle.point_at(0.0), &points[0]));
    assert!(close(&circle.point_at(0.1), &points[1]));
}

#[test]
fn quarter_arc_ends_on_arc_endpoints() {
    let circle = circle_at_origin(20.0);
    let points = discretize_arc(&circle, 0.0, FRAC_PI_2, 3.0).unwrap();
    assert!(close(&Point3::new(20.0, 0.0, 0.0), &points[0]));
    assert!(close(&Point3::new(0.0, 20.0, 0.0), points.last().unwrap()));
    for p in &points {
        assert!(((*p - Point3::origin()).norm() - 20.0).abs() < 1e-9);
    }
}

#[test]
fn zero_spacing_is_rejected() {
    let circle = circle_at_origin(1.0);
    assert!(matches!(
        discretize_arc(&circle, 0.0, TAU, 0.0),
        Err(FlattenError::InvalidSpacing(_))
    ));
    assert!(matches!(
        sample_count(1.0, -2.0),
        Err(FlattenError::InvalidSpacing(_))
    ));
}

#[test]
fn bundle_puts_lines_before_arcs() {
    let edges = vec![
        InputEdge::full_circle(circle_at_origin(10.0)),
        InputEdge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)),
        InputEdge::arc(circle_at_origin(5.0), 0.0, FRAC_PI_2),
        InputEdge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 10.0, 0.0)),
    ];
    let projected = project_edges(&edges, &PlaneFrame::default()).unwrap();
    let bundled = bundle(&projected, 5.0).unwrap();

    let mut expected = lines_of(&projected);
    expected.extend(arcs_of(&projected, 5.0).unwrap());
    assert_eq!(expected, bundled.segments);
    assert_eq!(4, bundled.len());
    assert_eq!(2, bundled.segments[0].len());
    assert_eq!(2, bundled.segments[1].len());
    assert_eq!(14, bundled.segments[2].len());
}

#[test]
fn arc_then_line_bundles_line_first() {
    let edges = vec![
        InputEdge::full_circle(circle_at_origin(10.0)),
        InputEdge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)),
    ];
    let frame = PlaneFrame {
        discretize_spacing: 5.0,
        ..PlaneFrame::default()
    };
    let bundled = flatten(&edges, &frame).unwrap();
    assert_eq!(2, bundled.len());
    assert_eq!(2, bundled.segments[0].len());
    assert_eq!(14, bundled.segments[1].len());
}

#[test]
fn unsupported_and_tilted_curves_are_dropped() {
    let tilted = Circle3::new(Point3::origin(), Vector3::x(), 5.0);
    let edges = vec![
        InputEdge::other("spline"),
        InputEdge::full_circle(tilted),
        InputEdge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)),
    ];
    let projected = project_edges(&edges, &PlaneFrame::default()).unwrap();
    assert_eq!(3, projected.len());
    assert_eq!(EdgeKind::Other, projected[0].kind());
    assert_eq!(
        ProjectedEdge::Other {
            kind: "ellipse".to_string()
        },
        projected[1]
    );
    assert_eq!(2, dropped_count(&projected));

    let bundled = bundle(&projected, 2.0).unwrap();
    assert_eq!(1, bundled.len());
}

#[test]
fn edges_off_the_face_or_along_the_axis_are_omitted() {
    let edges = vec![
        InputEdge::line(Point3::new(1000.0, 0.0, 0.0), Point3::new(1010.0, 0.0, 0.0)),
        InputEdge::line(Point3::new(5.0, 5.0, 0.0), Point3::new(5.0, 5.0, 40.0)),
        InputEdge::full_circle(Circle3::new(
            Point3::new(0.0, 500.0, 0.0),
            Vector3::z(),
            10.0,
        )),
        InputEdge::line(Point3::new(140.0, 0.0, 0.0), Point3::new(160.0, 0.0, 0.0)),
    ];
    let projection = project(&edges, &PlaneFrame::default()).unwrap();
    assert_eq!(1, projection.edges.len());
    assert_eq!(EdgeKind::Line, projection.edges[0].kind());
    assert_eq!(3, projection.omitted);
}

#[test]
fn lines_are_clipped_to_the_face() {
    // A4 face: x in [-148.5, 148.5], y in [-105, 105].
    let edges = vec![
        InputEdge::line(Point3::new(140.0, 0.0, 0.0), Point3::new(160.0, 0.0, 0.0)),
        InputEdge::line(Point3::new(-200.0, 10.0, 0.0), Point3::new(200.0, 10.0, 0.0)),
    ];
    let lines = lines_of(&project_edges(&edges, &PlaneFrame::default()).unwrap());
    assert_eq!(2, lines.len());
    assert!(close(&Point3::new(140.0, 0.0, 0.0), &lines[0].points[0]));
    assert!(close(&Point3::new(148.5, 0.0, 0.0), &lines[0].points[1]));
    assert!(close(&Point3::new(-148.5, 10.0, 0.0), &lines[1].points[0]));
    assert!(close(&Point3::new(148.5, 10.0, 0.0), &lines[1].points[1]));
}

#[test]
fn line_passing_the_corner_is_omitted() {
    // Its bounding box overlaps the face, the segment itself never enters it.
    let edges = vec![InputEdge::line(
        Point3::new(140.0, 200.0, 0.0),
        Point3::new(250.0, 95.0, 0.0),
    )];
    let projection = project(&edges, &PlaneFrame::default()).unwrap();
    assert!(projection.edges.is_empty());
    assert_eq!(1, projection.omitted);
}

#[test]
fn clipping_happens_in_face_coordinates() {
    let frame = PlaneFrame {
        placement: Placement::from_base(Vector3::new(100.0, 0.0, 20.0)),
        ..PlaneFrame::default()
    };
    let edges = vec![InputEdge::line(
        Point3::new(200.0, 0.0, 0.0),
        Point3::new(300.0, 0.0, 0.0),
    )];
    let lines = lines_of(&project_edges(&edges, &frame).unwrap());
    assert_eq!(1, lines.len());
    assert!(close(&Point3::new(100.0, 0.0, 0.0), &lines[0].points[0]));
    assert!(close(&Point3::new(148.5, 0.0, 0.0), &lines[0].points[1]));
}

fn arc_spans(projected: &[ProjectedEdge]) -> Vec<(f64, f64)> {
    projected
        .iter()
        .filter_map(|e| match e {
            ProjectedEdge::Arc { first, last, .. } => Some((*first, *last)),
            _ => None,
        })
        .collect()
}

#[test]
fn arc_outside_the_face_is_omitted_even_if_its_circle_overlaps() {
    let circle = Circle3::new(Point3::new(150.0, 0.0, 0.0), Vector3::z(), 10.0);
    let edges = vec![InputEdge::arc(circle, -FRAC_PI_4, FRAC_PI_4)];
    let projection = project(&edges, &PlaneFrame::default()).unwrap();
    assert!(projection.edges.is_empty());
    assert_eq!(1, projection.omitted);
}

#[test]
fn circle_on_the_border_keeps_its_inner_half() {
    let circle = Circle3::new(Point3::new(148.5, 0.0, 0.0), Vector3::z(), 10.0);
    let projected =
        project_edges(&[InputEdge::full_circle(circle)], &PlaneFrame::default()).unwrap();
    let spans = arc_spans(&projected);
    assert_eq!(1, spans.len());
    assert!((spans[0].0 - FRAC_PI_2).abs() < 1e-9);
    assert!((spans[0].1 - 3.0 * FRAC_PI_2).abs() < 1e-9);

    for segment in arcs_of(&projected, 1.0).unwrap() {
        for p in &segment.points {
            assert!(p.x <= 148.5 + 1e-9);
        }
    }
}

#[test]
fn inner_half_across_the_seam_stays_one_arc() {
    let circle = Circle3::new(Point3::new(-148.5, 0.0, 0.0), Vector3::z(), 10.0);
    let projected =
        project_edges(&[InputEdge::full_circle(circle)], &PlaneFrame::default()).unwrap();
    let spans = arc_spans(&projected);
    assert_eq!(1, spans.len());
    assert!((spans[0].0 - 3.0 * FRAC_PI_2).abs() < 1e-9);
    assert!((spans[0].1 - 5.0 * FRAC_PI_2).abs() < 1e-9);
}

#[test]
fn large_circle_splits_into_pieces_on_the_face() {
    let projected = project_edges(
        &[InputEdge::full_circle(circle_at_origin(120.0))],
        &PlaneFrame::default(),
    )
    .unwrap();
    assert_eq!(2, arc_spans(&projected).len());

    for segment in arcs_of(&projected, 2.0).unwrap() {
        let (first, last) = segment.endpoints().unwrap();
        assert!((first.y.abs() - 105.0).abs() < 1e-6);
        assert!((last.y.abs() - 105.0).abs() < 1e-6);
        for p in &segment.points {
            assert!(p.y.abs() <= 105.0 + 1e-6);
        }
    }
}

#[test]
fn circle_inside_the_face_is_untouched() {
    let projected = project_edges(
        &[InputEdge::full_circle(circle_at_origin(10.0))],
        &PlaneFrame::default(),
    )
    .unwrap();
    assert_eq!(vec![(0.0, TAU)], arc_spans(&projected));
}

#[test]
fn absurdly_fine_spacing_is_rejected() {
    assert!(matches!(
        discretize_arc(&circle_at_origin(10.0), 0.0, TAU, 1e-300),
        Err(FlattenError::InvalidSpacing(_))
    ));
}

#[test]
fn direction_parallel_to_face_projects_nothing() {
    // A quarter turn about X tips the face normal onto -Y, perpendicular to the axis.
    let frame = PlaneFrame {
        placement: Placement::new(Vector3::zeros(), Rotation::new(Vector3::x(), FRAC_PI_2)),
        ..PlaneFrame::default()
    };
    let edges = vec![
        InputEdge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)),
        InputEdge::other("spline"),
    ];
    assert!(project_edges(&edges, &frame).unwrap().is_empty());
}

#[test]
fn rotation_is_not_undone() {
    let frame = PlaneFrame {
        placement: Placement::new(
            Vector3::new(10.0, 0.0, 0.0),
            Rotation::from_degrees(Vector3::z(), 90.0),
        ),
        ..PlaneFrame::default()
    };
    let edges = vec![InputEdge::line(
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(20.0, 0.0, 0.0),
    )];
    let lines = lines_of(&project_edges(&edges, &frame).unwrap());
    // Only the base is removed; world orientation is kept.
    assert!(close(&Point3::new(0.0, 0.0, 0.0), &lines[0].points[0]));
    assert!(close(&Point3::new(10.0, 0.0, 0.0), &lines[0].points[1]));
}

#[test]
fn empty_input_gives_empty_bundle() {
    let bundled = flatten(&Vec::<InputEdge>::new(), &PlaneFrame::default()).unwrap();
    assert!(bundled.is_empty());
    assert_eq!(0, bundled.point_count());
    assert!(bundled.extents().is_none());
}

#[test]
fn invalid_scale_fails_projection() {
    let frame = PlaneFrame {
        scale: 0.0,
        ..PlaneFrame::default()
    };
    assert!(matches!(
        project_edges(&Vec::<InputEdge>::new(), &frame),
        Err(FlattenError::InvalidScale(_))
    ));
}
