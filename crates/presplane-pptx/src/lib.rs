//! Slide-deck export of a flattened plane: one title slide holding a straight
//! connector per line segment, on a slide sized to the plane's page.

mod package;
mod slide;

use anyhow::{Context, Result};
use presplane_core::document::SlideExporter;
use presplane_core::model::Segment;
use presplane_core::FlattenError;
use std::io::Write;
use std::path::Path;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub use slide::ConnectorXfrm;

pub const EMU_PER_MM: f64 = 36_000.0;

pub fn mm_to_emu(mm: f64) -> i64 {
    (mm * EMU_PER_MM).round() as i64
}

/// A straight connector in slide millimetres, origin top-left, Y down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connector {
    pub begin: (f64, f64),
    pub end: (f64, f64),
}

impl Connector {
    /// Places a plane-local segment on a `page` sized slide: the plane centre
    /// maps to the slide centre and Y is flipped.
    pub fn from_segment(segment: &Segment, page: (f64, f64)) -> Option<Self> {
        let (first, last) = segment.endpoints()?;
        let (hw, hh) = (page.0 / 2.0, page.1 / 2.0);
        Some(Self {
            begin: (first.x + hw, -first.y + hh),
            end: (last.x + hw, -last.y + hh),
        })
    }

    pub fn xfrm(&self) -> ConnectorXfrm {
        ConnectorXfrm::new(
            (mm_to_emu(self.begin.0), mm_to_emu(self.begin.1)),
            (mm_to_emu(self.end.0), mm_to_emu(self.end.1)),
        )
    }
}

pub fn connectors_for(lines: &[Segment], page: (f64, f64)) -> Vec<Connector> {
    lines
        .iter()
        .filter_map(|s| Connector::from_segment(s, page))
        .collect()
}

/// Builds the whole package in memory.
pub fn pptx_bytes(page: (f64, f64), connectors: &[Connector]) -> Result<Vec<u8>> {
    let slide_size = (mm_to_emu(page.0), mm_to_emu(page.1));
    let created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let parts = [
        ("[Content_Types].xml", package::content_types_xml()),
        ("_rels/.rels", package::root_rels_xml()),
        ("docProps/core.xml", package::core_xml(&created)),
        ("docProps/app.xml", package::app_xml()),
        ("ppt/presentation.xml", package::presentation_xml(slide_size)),
        (
            "ppt/_rels/presentation.xml.rels",
            package::presentation_rels_xml(),
        ),
        (
            "ppt/slideMasters/slideMaster1.xml",
            package::slide_master_xml(),
        ),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            package::slide_master_rels_xml(),
        ),
        (
            "ppt/slideLayouts/slideLayout1.xml",
            package::title_layout_xml(slide_size),
        ),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            package::slide_layout_rels_xml(),
        ),
        ("ppt/theme/theme1.xml", package::theme_xml()),
        (
            "ppt/slides/slide1.xml",
            slide::slide_xml(connectors).context("render slide")?,
        ),
        ("ppt/slides/_rels/slide1.xml.rels", package::slide_rels_xml()),
    ];

    let mut buffer = std::io::Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, xml) in &parts {
        zip.start_file(*name, options)
            .with_context(|| format!("start part {name}"))?;
        zip.write_all(xml.as_bytes())
            .with_context(|| format!("write part {name}"))?;
    }
    zip.finish().context("finish pptx archive")?;

    Ok(buffer.into_inner())
}

pub fn write_pptx(path: &Path, page: (f64, f64), connectors: &[Connector]) -> Result<()> {
    let bytes = pptx_bytes(page, connectors)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir: {parent:?}"))?;
        }
    }
    std::fs::write(path, &bytes).with_context(|| format!("write pptx: {path:?}"))?;
    Ok(())
}

/// [`SlideExporter`] backed by [`write_pptx`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxExporter;

impl SlideExporter for PptxExporter {
    fn write_lines(
        &self,
        page: (f64, f64),
        lines: &[Segment],
        path: &Path,
    ) -> presplane_core::Result<usize> {
        let connectors = connectors_for(lines, page);
        write_pptx(path, page, &connectors).map_err(|e| FlattenError::Export(format!("{e:#}")))?;
        info!(path = %path.display(), connectors = connectors.len(), "wrote pptx");
        Ok(connectors.len())
    }
}
