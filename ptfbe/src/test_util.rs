use indexmap::IndexMap;
use ptfir::{font::ParametricFont, params::ParameterVector, template::Template};

pub(crate) const FONT: &str = r#"{
    "fontinfo": {"familyName": "Test Sans", "styleName": "Regular", "unitsPerEm": 1000},
    "controls": [{"parameters": [
        {"name": "xHeight", "init": 500}, {"name": "capDelta", "init": 200},
        {"name": "ascender", "init": 250}, {"name": "descender", "init": -250},
        {"name": "thickness", "init": 80}, {"name": "width", "init": 1},
        {"name": "spacingLeft", "init": 30}, {"name": "spacingRight", "init": 30}
    ]}],
    "glyphs": {
        "l": {"name": "l", "unicode": 108,
            "contours": [{"skeleton": true, "closed": false, "nodes": [
                {"x": "spacingLeft + thickness / 2", "y": 0,
                 "expand": {"width": "thickness", "angle": 0}},
                {"x": "contours.0.nodes.0.x", "y": "xHeight + capDelta",
                 "expand": {"width": "thickness", "angle": 0}}
            ]}]},
        "o": {"name": "o", "unicode": 111,
            "contours": [{"nodes": [
                {"x": "spacingLeft + 250", "y": 0, "dirIn": 0, "dirOut": 0, "tensionIn": 1, "tensionOut": 1},
                {"x": "spacingLeft + 500", "y": 250, "dirIn": 90, "dirOut": 90, "tensionIn": 1, "tensionOut": 1},
                {"x": "spacingLeft + 250", "y": "xHeight", "dirIn": 180, "dirOut": 180, "tensionIn": 1, "tensionOut": 1},
                {"x": "spacingLeft", "y": 250, "dirIn": 270, "dirOut": 270, "tensionIn": 1, "tensionOut": 1}
            ]}]},
        "o.alt": {"name": "o.alt", "unicode": 111,
            "contours": [{"nodes": [
                {"x": "spacingLeft", "y": 0}, {"x": "spacingLeft", "y": "xHeight"},
                {"x": "spacingLeft + 500", "y": "xHeight"}, {"x": "spacingLeft + 500", "y": 0}
            ]}]},
        "space": {"name": "space", "unicode": 32, "properties": {"advanceWidth": 250}}
    }
}"#;

pub(crate) fn vector(font: &ParametricFont) -> ParameterVector {
    ParameterVector::from_values(font.template().init_values())
}

pub(crate) fn updated_font() -> ParametricFont {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut font = ParametricFont::new(Template::from_json(FONT).unwrap()).unwrap();
    let vector = vector(&font);
    font.update(&vector, None);
    font
}

pub(crate) fn values(font: &ParametricFont) -> IndexMap<String, f64> {
    font.scope(&vector(font))
}
