//! Serializes an [ExportFont] to a binary font.

use log::debug;
use write_fonts::{
    dump_table,
    tables::{
        cmap::Cmap,
        glyf::{Bbox, GlyfLocaBuilder},
        head::Head,
        loca::LocaFormat,
        maxp::Maxp,
        post::Post,
    },
    read::TopLevelTable,
    types::{Fixed, GlyphId, LongDateTime},
    validate::Validate,
    FontBuilder, FontWrite,
};

use crate::{
    error::Error,
    export::ExportFont,
    glyphs::{compile_glyph, CompiledGlyph},
    hmetrics::{advances, build_hmetrics},
    name::build_name,
    os2::build_os2,
};

/// Anything that can turn evaluated outlines into font bytes.
pub trait FontEngine: Send + Sync {
    fn compile(&self, font: &ExportFont) -> Result<Vec<u8>, Error>;
}

/// Writes a static TrueType-flavoured OpenType font.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenTypeEngine;

fn build_head(font: &ExportFont, glyphs: &[CompiledGlyph], loca_format: LocaFormat) -> Head {
    let bbox = glyphs
        .iter()
        .filter_map(|g| g.bbox)
        .reduce(|a, b| Bbox {
            x_min: a.x_min.min(b.x_min),
            y_min: a.y_min.min(b.y_min),
            x_max: a.x_max.max(b.x_max),
            y_max: a.y_max.max(b.y_max),
        })
        .unwrap_or_default();
    // Fixed dates, identical inputs must give identical bytes
    let epoch = LongDateTime::new(0);
    Head {
        font_revision: Fixed::from_f64(1.0),
        units_per_em: font.units_per_em,
        created: epoch,
        modified: epoch,
        x_min: bbox.x_min,
        y_min: bbox.y_min,
        x_max: bbox.x_max,
        y_max: bbox.y_max,
        lowest_rec_ppem: 8,
        index_to_loc_format: match loca_format {
            LocaFormat::Short => 0,
            LocaFormat::Long => 1,
        },
        ..Default::default()
    }
}

fn build_maxp(glyphs: &[CompiledGlyph]) -> Result<Maxp, Error> {
    let num_glyphs = glyphs.len().try_into().map_err(|_| Error::OutOfBounds {
        what: "num_glyphs".into(),
        value: glyphs.len().to_string(),
    })?;
    Ok(Maxp {
        num_glyphs,
        // maxp computes it's version based on whether fields are set
        max_points: Some(glyphs.iter().map(|g| g.points).max().unwrap_or_default()),
        max_contours: Some(glyphs.iter().map(|g| g.contours).max().unwrap_or_default()),
        max_composite_points: Some(0),
        max_composite_contours: Some(0),
        max_zones: Some(1),
        max_twilight_points: Some(0),
        max_storage: Some(0),
        max_function_defs: Some(0),
        max_instruction_defs: Some(0),
        max_stack_elements: Some(0),
        max_size_of_instructions: Some(0),
        max_component_elements: Some(0),
        max_component_depth: Some(0),
    })
}

fn build_cmap(font: &ExportFont) -> Result<Cmap, Error> {
    // cmap only accomodates valid chars; surrogates and the like are dropped
    let mappings = font.glyphs.iter().enumerate().flat_map(|(gid, glyph)| {
        glyph.codepoints.iter().filter_map(move |codepoint| {
            char::from_u32(*codepoint).map(|c| (c, GlyphId::new(gid as u32)))
        })
    });
    Ok(Cmap::from_mappings(mappings)?)
}

fn build_post(font: &ExportFont) -> Post {
    Post::new_v2(font.glyph_names().map(|name| name.as_str()))
}

fn add_table<T>(builder: &mut FontBuilder, table: &T) -> Result<(), Error>
where
    T: FontWrite + Validate + TopLevelTable,
{
    let bytes = dump_table(table).map_err(|e| Error::DumpTableError {
        context: T::TAG.to_string(),
        reason: format!("{e:?}"),
    })?;
    debug!("{} is {} bytes", T::TAG, bytes.len());
    builder.add_raw(T::TAG, bytes);
    Ok(())
}

impl FontEngine for OpenTypeEngine {
    fn compile(&self, font: &ExportFont) -> Result<Vec<u8>, Error> {
        let glyphs = font
            .glyphs
            .iter()
            .map(compile_glyph)
            .collect::<Result<Vec<_>, _>>()?;

        let mut glyf_loca = GlyfLocaBuilder::new();
        for glyph in glyphs.iter() {
            glyf_loca
                .add_glyph(&glyph.glyph)
                .map_err(|e| Error::DumpTableError {
                    context: "glyf".into(),
                    reason: format!("{e:?}"),
                })?;
        }
        let (glyf, loca, loca_format) = glyf_loca.build();

        let advances = advances(font);
        let (hhea, hmtx) = build_hmetrics(font, &advances, &glyphs)?;

        let mut builder = FontBuilder::default();
        add_table(&mut builder, &build_head(font, &glyphs, loca_format))?;
        add_table(&mut builder, &hhea)?;
        add_table(&mut builder, &build_maxp(&glyphs)?)?;
        add_table(&mut builder, &build_os2(font, &advances))?;
        add_table(&mut builder, &hmtx)?;
        add_table(&mut builder, &build_cmap(font)?)?;
        add_table(&mut builder, &loca)?;
        add_table(&mut builder, &glyf)?;
        add_table(&mut builder, &build_name(&font.names))?;
        add_table(&mut builder, &build_post(font))?;

        let bytes = builder.build();
        debug!("Assembled {} byte font of {} glyphs", bytes.len(), glyphs.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use skrifa::{
        raw::{tables::os2::SelectionFlags, FontRef, TableProvider},
        string::StringId,
        MetadataProvider,
    };

    use ptfir::{font::ParametricFont, types::GlyphName};

    use crate::{
        name::ExportNames,
        os2::StyleClass,
        test_util::{updated_font, values},
    };

    use super::*;

    fn export(font: &ParametricFont, names: ExportNames, style: StyleClass) -> ExportFont {
        ExportFont::new(font, &font.glyph_names(), &values(font), names, style)
    }

    fn compile(font: &ParametricFont) -> Vec<u8> {
        OpenTypeEngine
            .compile(&export(font, ExportNames::default(), StyleClass::default()))
            .unwrap()
    }

    #[test]
    fn compiles_the_test_font() {
        let font = updated_font();
        let bytes = compile(&font);
        let font_ref = FontRef::new(&bytes).unwrap();

        assert_eq!(5, font_ref.maxp().unwrap().num_glyphs());
        assert_eq!(1000, font_ref.head().unwrap().units_per_em());

        let charmap = font_ref.charmap();
        assert_eq!(Some(1), charmap.map('l').map(|gid| gid.to_u32()));
        assert_eq!(Some(2), charmap.map('o').map(|gid| gid.to_u32()));
        assert_eq!(Some(4), charmap.map(' ').map(|gid| gid.to_u32()));
        assert_eq!(None, charmap.map('x'));

        let hmtx = font_ref.hmtx().unwrap();
        assert_eq!(140, hmtx.h_metrics()[1].advance());
    }

    #[test]
    fn compilation_is_deterministic() {
        assert_eq!(compile(&updated_font()), compile(&updated_font()));
    }

    #[test]
    fn names_and_classes_are_written() {
        let font = updated_font();
        let style = StyleClass {
            weight_class: 700,
            width_class: 5,
            italic: true,
        };
        let bytes = OpenTypeEngine
            .compile(&export(&font, ExportNames::new(Some("Elzevir"), Some("bold")), style))
            .unwrap();
        let font_ref = FontRef::new(&bytes).unwrap();

        let os2 = font_ref.os2().unwrap();
        assert_eq!(700, os2.us_weight_class());
        assert_eq!(
            SelectionFlags::ITALIC | SelectionFlags::BOLD,
            os2.fs_selection()
        );

        let string = |id: StringId| {
            font_ref
                .localized_strings(id)
                .english_or_first()
                .map(|s| s.chars().collect::<String>())
        };
        assert_eq!(Some("Elzevir".to_string()), string(StringId::FAMILY_NAME));
        assert_eq!(
            Some("Elzevir-Bold".to_string()),
            string(StringId::POSTSCRIPT_NAME)
        );
        assert_eq!(
            Some("Prototypo: Elzevir Bold:2016".to_string()),
            string(StringId::UNIQUE_ID)
        );
    }

    #[test]
    fn alternates_move_the_codepoint() {
        let mut font = updated_font();
        font.set_alternates_for(111, &GlyphName::from("o.alt")).unwrap();
        let bytes = compile(&font);
        let font_ref = FontRef::new(&bytes).unwrap();
        assert_eq!(Some(3), font_ref.charmap().map('o').map(|gid| gid.to_u32()));
    }
}
