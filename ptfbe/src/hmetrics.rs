//! Generates [hhea](https://learn.microsoft.com/en-us/typography/opentype/spec/hhea)
//! and [hmtx](https://learn.microsoft.com/en-us/typography/opentype/spec/hmtx) tables.

use write_fonts::{
    tables::{hhea::Hhea, hmtx::Hmtx, vmtx::LongMetric},
    types::{FWord, UfWord},
    OtRound,
};

use crate::{error::Error, export::ExportFont, glyphs::CompiledGlyph};

/// Rounded advances, glyph order.
pub(crate) fn advances(font: &ExportFont) -> Vec<u16> {
    font.glyphs
        .iter()
        .map(|g| g.advance_width.max(0.0).ot_round())
        .collect()
}

pub(crate) fn build_hmetrics(
    font: &ExportFont,
    advances: &[u16],
    glyphs: &[CompiledGlyph],
) -> Result<(Hhea, Hmtx), Error> {
    let long_metrics: Vec<LongMetric> = advances
        .iter()
        .zip(glyphs)
        .map(|(advance, glyph)| LongMetric {
            advance: *advance,
            side_bearing: glyph.bbox.map(|b| b.x_min).unwrap_or_default(),
        })
        .collect();

    // Empty glyphs have no bearings to speak of
    let bounded = || {
        long_metrics
            .iter()
            .zip(glyphs)
            .filter_map(|(metric, glyph)| glyph.bbox.map(|bbox| (metric, bbox)))
    };
    let min_left_side_bearing = bounded()
        .map(|(metric, _)| metric.side_bearing)
        .min()
        .unwrap_or_default();
    let min_right_side_bearing = bounded()
        .map(|(metric, bbox)| metric.advance as i32 - bbox.x_max as i32)
        .min()
        .unwrap_or_default();
    let x_max_extent = bounded()
        .map(|(metric, bbox)| metric.side_bearing as i32 + (bbox.x_max - bbox.x_min) as i32)
        .max()
        .unwrap_or_default();
    let clamp = |value: i32| value.clamp(i16::MIN as i32, i16::MAX as i32) as i16;

    let hhea = Hhea {
        ascender: FWord::new(font.metrics.ascender.ot_round()),
        descender: FWord::new(font.metrics.descender.ot_round()),
        line_gap: FWord::new(0),
        advance_width_max: UfWord::new(advances.iter().copied().max().unwrap_or_default()),
        min_left_side_bearing: FWord::new(min_left_side_bearing),
        min_right_side_bearing: FWord::new(clamp(min_right_side_bearing)),
        x_max_extent: FWord::new(clamp(x_max_extent)),
        caret_slope_rise: 1,
        number_of_h_metrics: long_metrics.len().try_into().map_err(|_| {
            Error::OutOfBounds {
                what: "number_of_long_metrics".into(),
                value: format!("{}", long_metrics.len()),
            }
        })?,
        ..Default::default()
    };
    let hmtx = Hmtx::new(long_metrics, Vec::new());
    Ok((hhea, hmtx))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        export::ExportFont,
        glyphs::compile_glyph,
        name::ExportNames,
        os2::StyleClass,
        test_util::{updated_font, values},
    };

    use super::*;

    #[test]
    fn metrics_of_the_test_font() {
        let font = updated_font();
        let export = ExportFont::new(
            &font,
            &font.glyph_names(),
            &values(&font),
            ExportNames::default(),
            StyleClass::default(),
        );
        let glyphs = export
            .glyphs
            .iter()
            .map(compile_glyph)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let advances = advances(&export);
        // .notdef l o o.alt space
        assert_eq!(vec![500, 140, 560, 560, 250], advances);

        let (hhea, hmtx) = build_hmetrics(&export, &advances, &glyphs).unwrap();
        assert_eq!(750, hhea.ascender.to_i16());
        assert_eq!(-250, hhea.descender.to_i16());
        assert_eq!(560, hhea.advance_width_max.to_u16());
        assert_eq!(30, hhea.min_left_side_bearing.to_i16());
        assert_eq!(30, hhea.min_right_side_bearing.to_i16());
        assert_eq!(5, hhea.number_of_h_metrics);
        assert_eq!(
            vec![0, 30, 30, 30, 0],
            hmtx.h_metrics.iter().map(|m| m.side_bearing).collect::<Vec<_>>()
        );
    }
}
