use crate::Connector;
use itertools::Itertools;
use std::fmt::Write;

// Ids 1..=3 are the shape tree, title and subtitle.
const FIRST_CONNECTOR_ID: usize = 4;

/// `a:xfrm` of a straight connector in EMU: offset at the min corner,
/// extents as absolute deltas, flips recording the drawing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorXfrm {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
    pub flip_h: bool,
    pub flip_v: bool,
}

impl ConnectorXfrm {
    pub fn new(begin: (i64, i64), end: (i64, i64)) -> Self {
        Self {
            x: begin.0.min(end.0),
            y: begin.1.min(end.1),
            cx: (end.0 - begin.0).abs(),
            cy: (end.1 - begin.1).abs(),
            flip_h: begin.0 > end.0,
            flip_v: begin.1 > end.1,
        }
    }

    fn flip_attrs(&self) -> String {
        let mut attrs = String::new();
        if self.flip_h {
            attrs.push_str(r#" flipH="1""#);
        }
        if self.flip_v {
            attrs.push_str(r#" flipV="1""#);
        }
        attrs
    }
}

fn connector_xml(id: usize, xfrm: &ConnectorXfrm) -> String {
    format!(
        r#"      <p:cxnSp>
        <p:nvCxnSpPr>
          <p:cNvPr id="{id}" name="Connector {n}"/>
          <p:cNvCxnSpPr/>
          <p:nvPr/>
        </p:nvCxnSpPr>
        <p:spPr>
          <a:xfrm{flips}>
            <a:off x="{x}" y="{y}"/>
            <a:ext cx="{cx}" cy="{cy}"/>
          </a:xfrm>
          <a:prstGeom prst="line"><a:avLst/></a:prstGeom>
          <a:ln w="9525"><a:solidFill><a:srgbClr val="000000"/></a:solidFill></a:ln>
        </p:spPr>
        <p:style>
          <a:lnRef idx="1"><a:schemeClr val="accent1"/></a:lnRef>
          <a:fillRef idx="0"><a:schemeClr val="accent1"/></a:fillRef>
          <a:effectRef idx="0"><a:schemeClr val="accent1"/></a:effectRef>
          <a:fontRef idx="minor"><a:schemeClr val="tx1"/></a:fontRef>
        </p:style>
      </p:cxnSp>"#,
        n = id - 1,
        flips = xfrm.flip_attrs(),
        x = xfrm.x,
        y = xfrm.y,
        cx = xfrm.cx,
        cy = xfrm.cy,
    )
}

fn placeholder_xml(id: usize, name: &str, ph: &str) -> String {
    format!(
        r#"      <p:sp>
        <p:nvSpPr>
          <p:cNvPr id="{id}" name="{name}"/>
          <p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr>
          <p:nvPr>{ph}</p:nvPr>
        </p:nvSpPr>
        <p:spPr/>
      </p:sp>"#
    )
}

pub(crate) fn slide_xml(connectors: &[Connector]) -> Result<String, std::fmt::Error> {
    let shapes = connectors
        .iter()
        .enumerate()
        .map(|(i, c)| connector_xml(FIRST_CONNECTOR_ID + i, &c.xfrm()))
        .join("\n");

    let mut out = String::new();
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#)?;
    writeln!(
        out,
        r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#
    )?;
    writeln!(out, "  <p:cSld>")?;
    writeln!(out, "    <p:spTree>")?;
    writeln!(
        out,
        r#"      <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#
    )?;
    writeln!(
        out,
        r#"      <p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
    )?;
    writeln!(
        out,
        "{}",
        placeholder_xml(2, "Title 1", r#"<p:ph type="ctrTitle"/>"#)
    )?;
    writeln!(
        out,
        "{}",
        placeholder_xml(3, "Subtitle 2", r#"<p:ph type="subTitle" idx="1"/>"#)
    )?;
    if !shapes.is_empty() {
        writeln!(out, "{shapes}")?;
    }
    writeln!(out, "    </p:spTree>")?;
    writeln!(out, "  </p:cSld>")?;
    writeln!(out, "  <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>")?;
    write!(out, "</p:sld>")?;
    Ok(out)
}
