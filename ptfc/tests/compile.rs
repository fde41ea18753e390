use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use ptfc::{
    loader::{DirectoryFetcher, FetchRequest, FetchResponse, TemplateFetcher, TemplateLoader},
    protocol::{Properties, Request, Response},
    Compiler, Error, FontHandle, MemoryRegistry,
};
use ptfir::{params::ParameterVector, types::GlyphName};
use skrifa::{
    raw::{tables::os2::SelectionFlags, FontRef, TableProvider},
    string::StringId,
    MetadataProvider,
};

const ELZEVIR: &str = "elzevir.ptf";

fn testdata() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

struct CountingFetcher {
    inner: DirectoryFetcher,
    fetches: Arc<AtomicUsize>,
}

impl TemplateFetcher for CountingFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(request)
    }
}

fn counting_compiler() -> (Compiler, Arc<AtomicUsize>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let fetches = Arc::new(AtomicUsize::new(0));
    let loader = TemplateLoader::new(CountingFetcher {
        inner: DirectoryFetcher::new(testdata()),
        fetches: fetches.clone(),
    });
    (Compiler::new(loader).unwrap(), fetches)
}

fn compiler() -> Compiler {
    counting_compiler().0
}

fn create(compiler: &Compiler, name: &str) -> (FontHandle, Arc<MemoryRegistry>) {
    let registry = Arc::new(MemoryRegistry::default());
    let font = compiler.create_font(name, ELZEVIR, registry.clone()).unwrap();
    (font, registry)
}

fn num_glyphs(face: &[u8]) -> u16 {
    FontRef::new(face).unwrap().maxp().unwrap().num_glyphs()
}

fn advance_of(face: &[u8], c: char) -> u16 {
    let font = FontRef::new(face).unwrap();
    let gid = font.charmap().map(c).unwrap().to_u32() as usize;
    font.hmtx().unwrap().h_metrics()[gid].advance()
}

#[test]
fn first_binary_arrives_with_the_first_values() {
    let compiler = compiler();
    let (mut font, registry) = create(&compiler, "Elzevir Test");
    assert_eq!(None, registry.face("Elzevir Test"));

    font.reset().unwrap();
    let face = registry.face("Elzevir Test").unwrap();
    // .notdef plus one active glyph per codepoint
    assert_eq!(7, num_glyphs(&face));
    let font_ref = FontRef::new(&face).unwrap();
    assert_eq!(1024, font_ref.head().unwrap().units_per_em());
    let charmap = font_ref.charmap();
    for c in "aáeno ".chars() {
        assert!(charmap.map(c).is_some(), "'{c}' is not mapped");
    }
    assert_eq!(vec!["Elzevir Test".to_string()], registry.families());
}

#[test]
fn same_values_same_binary() {
    let compiler = compiler();
    let (mut font, registry) = create(&compiler, "Elzevir");
    font.reset().unwrap();
    let first = registry.face("Elzevir").unwrap();

    font.change_param("thickness", 140.0).unwrap();
    let thick = registry.face("Elzevir").unwrap();
    assert_ne!(first, thick);

    font.change_param("thickness", 85.0).unwrap();
    assert_eq!(first, registry.face("Elzevir").unwrap());
    font.reset().unwrap();
    assert_eq!(first, registry.face("Elzevir").unwrap());
}

#[test]
fn subsets_grow_and_shrink() {
    let compiler = compiler();
    let (mut font, registry) = create(&compiler, "Elzevir");
    font.reset().unwrap();

    font.subset("a", false, None).unwrap();
    assert_eq!(2, num_glyphs(&registry.face("Elzevir").unwrap()));

    font.subset("e", true, None).unwrap();
    let face = registry.face("Elzevir").unwrap();
    assert_eq!(3, num_glyphs(&face));
    let charmap = FontRef::new(&face).unwrap().charmap();
    assert!(charmap.map('a').is_some());
    assert!(charmap.map('e').is_some());
    assert!(charmap.map('o').is_none());

    // origins add up
    font.subset("oo", false, Some("preview")).unwrap();
    assert_eq!(4, num_glyphs(&registry.face("Elzevir").unwrap()));
    font.subset("", false, Some("preview")).unwrap();
    assert_eq!(3, num_glyphs(&registry.face("Elzevir").unwrap()));
}

#[test]
fn subset_glyphs_follow_the_latest_values() {
    let compiler = compiler();
    let (mut font, registry) = create(&compiler, "Elzevir");
    font.subset("a", false, None).unwrap();
    font.change_param("width", 1.2).unwrap();
    // n joins after the width change and must be computed with it
    font.subset("n", true, None).unwrap();
    let incremental = registry.face("Elzevir").unwrap();

    font.subset("an", false, None).unwrap();
    font.change_param("width", 1.2).unwrap();
    assert_eq!(incremental, registry.face("Elzevir").unwrap());
}

#[test]
fn alternates_swap_the_active_glyph() {
    let compiler = compiler();
    let (mut font, registry) = create(&compiler, "Elzevir");
    font.reset().unwrap();
    let before = registry.face("Elzevir").unwrap();
    let widths = |font: &FontHandle| {
        font.glyphs_properties(Properties::One("advanceWidth".to_string()))
            .unwrap()[&97]["advanceWidth"]
    };
    let regular = widths(&font);

    font.set_alternate(97, "a.alt").unwrap();
    let after = registry.face("Elzevir").unwrap();
    assert_eq!(num_glyphs(&before), num_glyphs(&after));
    assert_ne!(advance_of(&before, 'a'), advance_of(&after, 'a'));
    assert_ne!(regular, widths(&font));

    font.set_alternate(97, "a").unwrap();
    assert_eq!(before, registry.face("Elzevir").unwrap());
    assert_eq!(regular, widths(&font));
}

#[test]
fn alternate_lists_are_keyed_by_decimal_codepoints() {
    let compiler = compiler();
    let (mut font, registry) = create(&compiler, "Elzevir");
    font.reset().unwrap();
    let before = registry.face("Elzevir").unwrap();

    let alt_list = IndexMap::from([("97".to_string(), GlyphName::new("a.alt"))]);
    let response = compiler
        .client()
        .send(Request::Alternate {
            alt_list: Some(alt_list),
            unicode: None,
            glyph_name: None,
        })
        .unwrap();
    let Response::Binary(after) = response else {
        panic!("Expected a binary, got {response}");
    };
    assert_ne!(advance_of(&before, 'a'), advance_of(&after, 'a'));

    let bad = IndexMap::from([("a".to_string(), GlyphName::new("a.alt"))]);
    let result = compiler.client().send(Request::Alternate {
        alt_list: Some(bad),
        unicode: None,
        glyph_name: None,
    });
    assert!(matches!(result, Err(Error::BadCodepoint(..))), "{result:?}");
}

#[test]
fn unknown_alternates_are_errors() {
    let compiler = compiler();
    let (font, _) = create(&compiler, "Elzevir");
    let result = font.set_alternate(97, "nope");
    assert!(matches!(result, Err(Error::FontIrError(..))), "{result:?}");
}

#[test]
fn concurrent_fonts_share_one_fetch() {
    let (compiler, fetches) = counting_compiler();
    let faces: Vec<Arc<[u8]>> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let compiler = &compiler;
                s.spawn(move || {
                    let name = format!("Elzevir {i}");
                    let (mut font, registry) = create(compiler, &name);
                    font.reset().unwrap();
                    registry.face(&name).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(1, fetches.load(Ordering::SeqCst));
    assert!(faces.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn unknown_templates_are_never_fetched() {
    let (compiler, fetches) = counting_compiler();
    let result = compiler.create_font("Nope", "nope.ptf", Arc::new(MemoryRegistry::default()));
    assert!(matches!(result, Err(Error::Validation(..))), "{:?}", result.err());
    assert_eq!(0, fetches.load(Ordering::SeqCst));
}

#[test]
fn export_is_named_and_classed() {
    let compiler = compiler();
    let (mut font, _) = create(&compiler, "Elzevir");
    font.change_param("thickness", 95.0).unwrap();

    let face = font.export(Some("Elzevir Pro"), Some("regular")).unwrap();
    let font_ref = FontRef::new(&face).unwrap();
    // every glyph, the unmapped accent included
    assert_eq!(10, font_ref.maxp().unwrap().num_glyphs());
    assert_eq!(400, font_ref.os2().unwrap().us_weight_class());
    // a width of exactly 1 exceeds the condensed thresholds only
    assert_eq!(4, font_ref.os2().unwrap().us_width_class());
    let family = font_ref
        .localized_strings(StringId::FAMILY_NAME)
        .english_or_first()
        .map(|s| s.chars().collect::<String>());
    assert_eq!(Some("Elzevir Pro".to_string()), family);

    font.change_param("thickness", 155.0).unwrap();
    let face = font.export(Some("Elzevir Pro"), Some("bold")).unwrap();
    let os2 = FontRef::new(&face).unwrap().os2().unwrap();
    assert_eq!(700, os2.us_weight_class());
    assert!(os2.fs_selection().contains(SelectionFlags::BOLD));
}

#[test]
fn export_leaves_the_live_font_alone() {
    let compiler = compiler();
    let (mut font, registry) = create(&compiler, "Elzevir");
    font.reset().unwrap();
    let live = registry.face("Elzevir").unwrap();

    let mut values = font.values().clone();
    values.insert("thickness".to_string(), 160.0);
    let response = compiler
        .client()
        .send(Request::OtfFont {
            family: None,
            style: None,
            values: Some(ParameterVector::from_values(values)),
        })
        .unwrap();
    assert!(matches!(response, Response::Binary(..)), "{response}");

    // the live subset in its own order, recompiled under the session values
    font.subset("aáeno ", false, None).unwrap();
    assert_eq!(live, registry.face("Elzevir").unwrap());
}

#[test]
fn properties_are_keyed_by_unicode() {
    let compiler = compiler();
    let (mut font, _) = create(&compiler, "Elzevir");
    font.reset().unwrap();
    font.subset("ao", false, None).unwrap();

    let props = font
        .glyphs_properties(Properties::Many(vec![
            "spacingLeft".to_string(),
            "nope".to_string(),
        ]))
        .unwrap();
    assert_eq!(vec![97, 111], props.keys().copied().collect::<Vec<_>>());
    assert_eq!(Some(40.0), props[&97]["spacingLeft"]);
    assert_eq!(None, props[&111]["nope"]);
}

#[test]
fn manual_cursors_need_a_mapped_codepoint() {
    let compiler = compiler();
    let (font, _) = create(&compiler, "Elzevir");
    let cursors = IndexMap::from([("contours.0.nodes.0.x".to_string(), 12.0)]);
    font.change_cursors_to_manual(111, cursors.clone()).unwrap();
    let result = font.change_cursors_to_manual(0x4E00, cursors);
    assert!(matches!(result, Err(Error::FontIrError(..))), "{result:?}");
}

#[test]
fn requests_before_a_font_fail() {
    let compiler = compiler();
    let result = compiler.client().send(Request::Update {
        data: ParameterVector::default(),
    });
    assert!(matches!(result, Err(Error::NoFont)), "{result:?}");
}

#[test]
fn raw_messages() {
    let compiler = compiler();
    let client = compiler.client();
    assert_eq!(None, client.post(r#"{"type": "hello", "data": 1}"#).unwrap());

    let response = client
        .post(r#"{"type": "font", "name": "elzevir.ptf", "db": "Raw"}"#)
        .unwrap()
        .unwrap();
    let Response::FontLoaded { solving_orders } = &response else {
        panic!("Expected fontLoaded, got {response}");
    };
    assert!(solving_orders[&GlyphName::new("a")].is_some());
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!("font", json["handler"]);

    let ack = client
        .post(r#"{"type": "subset", "data": "a"}"#)
        .unwrap()
        .unwrap();
    assert_eq!(Response::Acknowledged, ack);
    assert_eq!(serde_json::Value::Bool(true), serde_json::to_value(&ack).unwrap());
}

#[test]
fn replies_reach_their_callers() {
    let compiler = compiler();
    let (_font, _) = create(&compiler, "Elzevir");
    thread::scope(|s| {
        for i in 0..8 {
            let client = compiler.client();
            s.spawn(move || {
                for _ in 0..10 {
                    let name = format!("p{i}");
                    let response = client
                        .send(Request::GetGlyphsProperties {
                            properties: Properties::One(name.clone()),
                        })
                        .unwrap();
                    let Response::Props { result } = response else {
                        panic!("Expected props, got {response}");
                    };
                    assert!(result
                        .values()
                        .all(|props| props.keys().eq(std::iter::once(&name))));
                }
            });
        }
    });
}
