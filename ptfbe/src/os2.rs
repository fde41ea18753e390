//! Generates a [OS/2](https://learn.microsoft.com/en-us/typography/opentype/spec/os2) table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use write_fonts::{
    tables::os2::{Os2, SelectionFlags},
    types::Tag,
    OtRound,
};

use crate::export::ExportFont;

pub const NORMAL_WEIGHT: u16 = 400;
pub const MEDIUM_WIDTH: u16 = 5;

const THICKNESS: &str = "thickness";
const WIDTH: &str = "width";
const SLANT: &str = "slant";

/// usWeightClass by thickness; the last threshold exceeded wins.
const WEIGHT_CLASSES: &[(f64, u16)] = &[
    (20.0, 100),
    (40.0, 200),
    (60.0, 300),
    (90.0, 400),
    (110.0, 500),
    (130.0, 600),
    (150.0, 700),
    (170.0, 800),
    (190.0, 900),
];

/// usWidthClass by width; the last threshold exceeded wins.
///
/// Beyond 2 the class drops back to ultra-condensed. Fonts exported by
/// earlier versions carry that value so it is kept.
const WIDTH_CLASSES: &[(f64, u16)] = &[
    (0.5, 1),
    (0.625, 2),
    (0.75, 3),
    (0.875, 4),
    (1.0, 5),
    (1.125, 6),
    (1.25, 7),
    (1.5, 8),
    (2.0, 1),
];

fn last_exceeded(value: Option<f64>, thresholds: &[(f64, u16)], default: u16) -> u16 {
    let Some(value) = value else {
        return default;
    };
    thresholds
        .iter()
        .filter(|(threshold, _)| value > *threshold)
        .last()
        .map(|(_, class)| *class)
        .unwrap_or(default)
}

/// The weight, width and style a font declares about itself.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StyleClass {
    pub weight_class: u16,
    pub width_class: u16,
    pub italic: bool,
}

impl Default for StyleClass {
    fn default() -> Self {
        StyleClass {
            weight_class: NORMAL_WEIGHT,
            width_class: MEDIUM_WIDTH,
            italic: false,
        }
    }
}

impl StyleClass {
    /// Derive the classes from the `thickness`, `width` and `slant` parameters.
    pub fn from_parameters(values: &IndexMap<String, f64>) -> StyleClass {
        StyleClass {
            weight_class: last_exceeded(values.get(THICKNESS).copied(), WEIGHT_CLASSES, NORMAL_WEIGHT),
            width_class: last_exceeded(values.get(WIDTH).copied(), WIDTH_CLASSES, MEDIUM_WIDTH),
            italic: values.get(SLANT).is_some_and(|slant| *slant > 0.0),
        }
    }

    pub fn is_bold(&self) -> bool {
        self.weight_class > NORMAL_WEIGHT
    }

    pub fn fs_selection(&self) -> SelectionFlags {
        let mut selection = SelectionFlags::empty();
        if self.italic {
            selection |= SelectionFlags::ITALIC;
        }
        if self.is_bold() {
            selection |= SelectionFlags::BOLD;
        }
        if selection.is_empty() {
            selection = SelectionFlags::REGULAR;
        }
        selection
    }
}

/// <https://github.com/fonttools/fonttools/blob/115275cbf429d91b75ac5536f5f0b2d6fe9d823a/Lib/fontTools/ttLib/tables/O_S_2f_2.py#L336-L348>
fn x_avg_char_width(advances: &[u16]) -> i16 {
    // count width > 0 only
    let (count, total) = advances
        .iter()
        .filter(|advance| **advance > 0)
        .fold((0_u64, 0_u64), |(count, total), value| {
            (count + 1, total + *value as u64)
        });
    if count == 0 {
        return 0;
    }
    (total as f64 / count as f64).ot_round()
}

pub(crate) fn build_os2(font: &ExportFont, advances: &[u16]) -> Os2 {
    let codepoints = font
        .glyphs
        .iter()
        .flat_map(|glyph| glyph.codepoints.iter().copied());
    let (first, last) = codepoints.fold((u32::MAX, 0), |(first, last), cp| {
        (first.min(cp), last.max(cp))
    });
    let first = if first > last { 0 } else { first };

    Os2 {
        ach_vend_id: Tag::new(b"PTYP"),
        us_weight_class: font.style.weight_class,
        us_width_class: font.style.width_class,
        fs_selection: font.style.fs_selection(),
        x_avg_char_width: x_avg_char_width(advances),
        us_first_char_index: first.min(u16::MAX as u32) as u16,
        us_last_char_index: last.min(u16::MAX as u32) as u16,

        s_typo_ascender: font.metrics.ascender.ot_round(),
        s_typo_descender: font.metrics.descender.ot_round(),
        us_win_ascent: font.metrics.ascender.max(0.0).ot_round(),
        us_win_descent: (-font.metrics.descender).max(0.0).ot_round(),
        sx_height: Some(font.x_height.ot_round()),
        s_cap_height: Some(font.cap_height.ot_round()),

        // Avoid "field must be present for version 2" caused by default to None
        ul_code_page_range_1: Some(0),
        ul_code_page_range_2: Some(0),
        us_default_char: Some(0),
        us_break_char: Some(0),
        us_max_context: Some(0),

        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use rstest::rstest;
    use write_fonts::tables::os2::SelectionFlags;

    use super::{x_avg_char_width, StyleClass};

    fn values(pairs: &[(&str, f64)]) -> IndexMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[rstest]
    #[case::below_every_threshold(10.0, 400)]
    #[case::threshold_itself_is_not_passed(20.0, 400)]
    #[case::thin(21.0, 100)]
    #[case::normal(95.0, 400)]
    #[case::medium(110.5, 500)]
    #[case::bold(151.0, 700)]
    #[case::black(400.0, 900)]
    fn weight_class(#[case] thickness: f64, #[case] expected: u16) {
        let style = StyleClass::from_parameters(&values(&[("thickness", thickness)]));
        assert_eq!(expected, style.weight_class);
    }

    #[rstest]
    #[case::narrowest(0.4, 5)]
    #[case::ultra_condensed(0.55, 1)]
    #[case::one_is_semi_condensed(1.0, 4)]
    #[case::medium(1.1, 5)]
    #[case::extra_expanded_at_two(2.0, 8)]
    #[case::wraps_past_two(2.5, 1)]
    fn width_class(#[case] width: f64, #[case] expected: u16) {
        let style = StyleClass::from_parameters(&values(&[("width", width)]));
        assert_eq!(expected, style.width_class);
    }

    #[test]
    fn missing_parameters_are_regular() {
        let style = StyleClass::from_parameters(&IndexMap::new());
        assert_eq!(StyleClass::default(), style);
        assert_eq!(SelectionFlags::REGULAR, style.fs_selection());
    }

    #[test]
    fn bold_italic() {
        let style = StyleClass::from_parameters(&values(&[("thickness", 160.0), ("slant", 8.0)]));
        assert_eq!(
            SelectionFlags::ITALIC | SelectionFlags::BOLD,
            style.fs_selection()
        );
    }

    #[test]
    fn normal_weight_is_not_bold() {
        let style = StyleClass::from_parameters(&values(&[("thickness", 100.0), ("slant", 0.0)]));
        assert!(!style.is_bold());
        assert_eq!(SelectionFlags::REGULAR, style.fs_selection());
    }

    #[test]
    fn average_skips_empty_advances() {
        assert_eq!(0, x_avg_char_width(&[]));
        assert_eq!(150, x_avg_char_width(&[0, 100, 200, 0]));
    }
}
