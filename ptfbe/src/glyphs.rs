//! Outlines to TrueType glyphs.

use kurbo::{BezPath, CubicBez, PathEl, Point};
use log::trace;
use write_fonts::tables::glyf::{Bbox, Glyph, SimpleGlyph};

use crate::{error::Error, export::ExportGlyph};

/// Max distance between a cubic and its quadratic approximation, in font units
const QUAD_ACCURACY: f64 = 0.5;

/// A glyph as it will be written plus what the other tables need from it.
#[derive(Debug, Clone)]
pub struct CompiledGlyph {
    pub glyph: Glyph,
    pub bbox: Option<Bbox>,
    pub points: u16,
    pub contours: u16,
}

/// TrueType only speaks quadratic.
pub fn cubics_to_quadratics(path: &BezPath) -> BezPath {
    let mut quadratic = BezPath::new();
    let mut current = Point::ZERO;
    let mut start = Point::ZERO;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                quadratic.move_to(p);
                start = p;
                current = p;
            }
            PathEl::LineTo(p) => {
                quadratic.line_to(p);
                current = p;
            }
            PathEl::QuadTo(c, p) => {
                quadratic.quad_to(c, p);
                current = p;
            }
            PathEl::CurveTo(c0, c1, p) => {
                CubicBez::new(current, c0, c1, p)
                    .to_quads(QUAD_ACCURACY)
                    .for_each(|(_, _, quad)| quadratic.quad_to(quad.p1, quad.p2));
                current = p;
            }
            PathEl::ClosePath => {
                quadratic.close_path();
                current = start;
            }
        }
    }
    quadratic
}

fn count(path: &BezPath) -> (usize, usize) {
    path.elements()
        .iter()
        .fold((0, 0), |(points, contours), el| match el {
            PathEl::MoveTo(_) => (points + 1, contours + 1),
            PathEl::LineTo(_) => (points + 1, contours),
            PathEl::QuadTo(..) => (points + 2, contours),
            PathEl::CurveTo(..) => (points + 3, contours),
            PathEl::ClosePath => (points, contours),
        })
}

pub fn compile_glyph(glyph: &ExportGlyph) -> Result<CompiledGlyph, Error> {
    if glyph.outline.elements().is_empty() {
        trace!("'{}' is empty", glyph.name);
        return Ok(CompiledGlyph {
            glyph: Glyph::Empty,
            bbox: None,
            points: 0,
            contours: 0,
        });
    }
    let path = cubics_to_quadratics(&glyph.outline);
    let simple = SimpleGlyph::from_bezpath(&path).map_err(|e| Error::OutlineError {
        glyph_name: glyph.name.clone(),
        problem: format!("{e:?}"),
        context: path.to_svg(),
    })?;
    let (points, contours) = count(&path);
    let out_of_bounds = |what: &str, value: usize| Error::OutOfBounds {
        what: format!("'{}' {what}", glyph.name),
        value: value.to_string(),
    };
    Ok(CompiledGlyph {
        bbox: Some(simple.bbox),
        points: points
            .try_into()
            .map_err(|_| out_of_bounds("points", points))?,
        contours: contours
            .try_into()
            .map_err(|_| out_of_bounds("contours", contours))?,
        glyph: Glyph::Simple(simple),
    })
}
