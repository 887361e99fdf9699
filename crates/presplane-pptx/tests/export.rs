use nalgebra::{Point3, Vector3};
use presplane_core::document::{
    Document, ExportOutcome, PlaneProperties, PlaneView, ShapeLibrary, SkipReason,
};
use presplane_core::model::{Circle3, InputEdge, Segment, Shape};
use presplane_core::plane::PageSize;
use presplane_pptx::{connectors_for, pptx_bytes, Connector, PptxExporter};
use std::io::{Cursor, Read};
use std::path::PathBuf;

fn temp_pptx(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("presplane-{}-{name}.pptx", std::process::id()))
}

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut xml = String::new();
    file.read_to_string(&mut xml).unwrap();
    xml
}

/// `(off x, off y, ext cx, ext cy, flipH, flipV)` of every connector on the slide.
fn connector_frames(slide_xml: &str) -> Vec<(i64, i64, i64, i64, bool, bool)> {
    let doc = roxmltree::Document::parse(slide_xml).unwrap();
    doc.descendants()
        .filter(|n| n.has_tag_name("cxnSp"))
        .map(|cxn| {
            let xfrm = cxn.descendants().find(|n| n.has_tag_name("xfrm")).unwrap();
            let off = xfrm.children().find(|n| n.has_tag_name("off")).unwrap();
            let ext = xfrm.children().find(|n| n.has_tag_name("ext")).unwrap();
            let num = |n: roxmltree::Node, a: &str| n.attribute(a).unwrap().parse::<i64>().unwrap();
            (
                num(off, "x"),
                num(off, "y"),
                num(ext, "cx"),
                num(ext, "cy"),
                xfrm.attribute("flipH") == Some("1"),
                xfrm.attribute("flipV") == Some("1"),
            )
        })
        .collect()
}

fn scenario_shapes() -> ShapeLibrary {
    ShapeLibrary::new(vec![Shape::new(
        "part",
        vec![
            InputEdge::full_circle(Circle3::new(Point3::origin(), Vector3::z(), 10.0)),
            InputEdge::line(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0)),
        ],
    )])
}

#[test]
fn single_line_becomes_one_centred_connector() {
    let path = temp_pptx("scenario-a");
    let props = PlaneProperties {
        objects: vec!["part".to_string()],
        file: path.clone(),
        ..PlaneProperties::default()
    };
    let mut doc = Document::new(scenario_shapes(), props, PlaneView::default()).unwrap();
    let outcome = doc.activate(&PptxExporter).unwrap();
    assert_eq!(
        ExportOutcome::Written {
            path: path.clone(),
            connectors: 1
        },
        outcome
    );

    let bytes = std::fs::read(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    // (0,0)-(10,0) lands at (148.5,105)-(158.5,105) mm on an A4 slide.
    let frames = connector_frames(&read_part(&bytes, "ppt/slides/slide1.xml"));
    assert_eq!(vec![(5_346_000, 3_780_000, 360_000, 0, false, false)], frames);

    let pres = read_part(&bytes, "ppt/presentation.xml");
    let pres = roxmltree::Document::parse(&pres).unwrap();
    let size = pres
        .descendants()
        .find(|n| n.has_tag_name("sldSz"))
        .unwrap();
    assert_eq!(Some("10692000"), size.attribute("cx"));
    assert_eq!(Some("7560000"), size.attribute("cy"));
}

#[test]
fn reversed_lines_carry_flips() {
    let page = PageSize::A3.dimensions();
    let lines = vec![Segment::from_line(
        Point3::new(10.0, -10.0, 0.0),
        Point3::new(-10.0, 10.0, 0.0),
    )];
    let connectors = connectors_for(&lines, page);
    assert_eq!(
        vec![Connector {
            begin: (220.0, 158.5),
            end: (200.0, 138.5),
        }],
        connectors
    );

    let bytes = pptx_bytes(page, &connectors).unwrap();
    let frames = connector_frames(&read_part(&bytes, "ppt/slides/slide1.xml"));
    assert_eq!(
        vec![(7_200_000, 4_986_000, 720_000, 720_000, true, true)],
        frames
    );
}

#[test]
fn package_has_every_part_and_a_title_slide() {
    let bytes = pptx_bytes(PageSize::A4.dimensions(), &[]).unwrap();
    let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    for part in [
        "[Content_Types].xml",
        "_rels/.rels",
        "docProps/core.xml",
        "docProps/app.xml",
        "ppt/presentation.xml",
        "ppt/_rels/presentation.xml.rels",
        "ppt/slideMasters/slideMaster1.xml",
        "ppt/slideLayouts/slideLayout1.xml",
        "ppt/theme/theme1.xml",
        "ppt/slides/slide1.xml",
        "ppt/slides/_rels/slide1.xml.rels",
    ] {
        assert!(names.contains(&part), "missing {part}");
    }

    let slide = read_part(&bytes, "ppt/slides/slide1.xml");
    let slide = roxmltree::Document::parse(&slide).unwrap();
    let placeholders: Vec<&str> = slide
        .descendants()
        .filter(|n| n.has_tag_name("ph"))
        .filter_map(|n| n.attribute("type"))
        .collect();
    assert_eq!(vec!["ctrTitle", "subTitle"], placeholders);
    assert_eq!(
        0,
        slide.descendants().filter(|n| n.has_tag_name("cxnSp")).count()
    );

    for part in [
        "[Content_Types].xml",
        "_rels/.rels",
        "docProps/core.xml",
        "ppt/slideMasters/slideMaster1.xml",
        "ppt/slideLayouts/slideLayout1.xml",
        "ppt/theme/theme1.xml",
    ] {
        let xml = read_part(&bytes, part);
        assert!(roxmltree::Document::parse(&xml).is_ok(), "{part} is not XML");
    }
}

#[test]
fn skipped_export_writes_nothing() {
    let path = temp_pptx("skipped");
    let _ = std::fs::remove_file(&path);
    let props = PlaneProperties {
        objects: vec!["part".to_string()],
        file: path.clone(),
        gateway: None,
        ..PlaneProperties::default()
    };
    let mut doc = Document::new(scenario_shapes(), props, PlaneView::default()).unwrap();
    assert_eq!(
        ExportOutcome::Skipped(SkipReason::NoGateway),
        doc.activate(&PptxExporter).unwrap()
    );
    assert!(!path.exists());
}
