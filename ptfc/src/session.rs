//! The state of a compilation context and how each request changes it.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use indexmap::IndexMap;
use log::{debug, trace};
use ptfbe::{
    engine::{FontEngine, OpenTypeEngine},
    export::ExportFont,
    name::ExportNames,
    os2::StyleClass,
};
use ptfir::{
    font::ParametricFont,
    params::{ManualCursors, ParameterVector},
    subset::{added, SubsetTracker},
    types::{Codepoint, GlyphName},
};

use crate::{
    loader::TemplateLoader,
    protocol::{GlyphProperties, Properties, Request, Response},
    Error,
};

/// Everything a compilation context holds between requests.
///
/// Fonts are built once per template identifier and kept; the subset
/// survives switching between them.
pub struct Session {
    loader: Arc<TemplateLoader>,
    engine: Box<dyn FontEngine>,
    fonts: HashMap<String, ParametricFont>,
    current: Option<String>,
    font_name: Option<String>,
    values: Option<ParameterVector>,
    subset: SubsetTracker,
    /// The resolved subset, as of the last request
    live: Vec<GlyphName>,
}

fn current_font<'a>(
    fonts: &'a mut HashMap<String, ParametricFont>,
    current: &Option<String>,
) -> Result<&'a mut ParametricFont, Error> {
    let id = current.as_ref().ok_or(Error::NoFont)?;
    fonts.get_mut(id).ok_or(Error::NoFont)
}

impl Session {
    pub fn new(loader: Arc<TemplateLoader>) -> Session {
        Session::with_engine(loader, Box::new(OpenTypeEngine))
    }

    pub fn with_engine(loader: Arc<TemplateLoader>, engine: Box<dyn FontEngine>) -> Session {
        Session {
            loader,
            engine,
            fonts: HashMap::new(),
            current: None,
            font_name: None,
            values: None,
            subset: SubsetTracker::default(),
            live: Vec::new(),
        }
    }

    /// The caller's name for the current font.
    pub fn font_name(&self) -> Option<&str> {
        self.font_name.as_deref()
    }

    pub fn font(&self) -> Option<&ParametricFont> {
        self.current.as_ref().and_then(|id| self.fonts.get(id))
    }

    pub fn values(&self) -> Option<&ParameterVector> {
        self.values.as_ref()
    }

    pub fn live_subset(&self) -> &[GlyphName] {
        &self.live
    }

    pub fn handle(&mut self, request: Request) -> Result<Response, Error> {
        debug!("Handle {}", request.kind());
        match request {
            Request::Font { name, db } => self.load_font(&name, db),
            Request::Update { data } => self.update(data),
            Request::Subset { data, add, origin } => self.apply_subset(&data, add, origin.as_deref()),
            Request::Alternate {
                alt_list,
                unicode,
                glyph_name,
            } => self.alternates(alt_list, unicode.zip(glyph_name)),
            Request::SoloAlternate {
                unicode,
                glyph_name,
            } => self.solo_alternate(unicode, &glyph_name),
            Request::GetGlyphsProperties { properties } => self.properties(&properties),
            Request::OtfFont {
                family,
                style,
                values,
            } => self.otf_font(family.as_deref(), style.as_deref(), values),
            Request::ChangeCursorsToManual {
                glyph_unicode,
                cursors,
            } => self.change_cursors_to_manual(glyph_unicode, cursors),
        }
    }

    fn font_mut(&mut self) -> Result<&mut ParametricFont, Error> {
        current_font(&mut self.fonts, &self.current)
    }

    fn load_font(&mut self, id: &str, font_name: Option<String>) -> Result<Response, Error> {
        let template = self.loader.load(id)?;
        let font = match self.fonts.entry(id.to_string()) {
            Entry::Occupied(entry) => {
                debug!("'{id}' is already built, resetting its components");
                let font = entry.into_mut();
                font.reset_components()?;
                font
            }
            Entry::Vacant(entry) => entry.insert(ParametricFont::new(template.as_ref().clone())?),
        };
        let solving_orders = font.solving_orders();
        self.live = self.subset.resolve(font);
        self.current = Some(id.to_string());
        self.font_name = font_name;
        self.values = None;
        Ok(Response::FontLoaded { solving_orders })
    }

    fn update(&mut self, values: ParameterVector) -> Result<Response, Error> {
        let font = current_font(&mut self.fonts, &self.current)?;
        font.update(&values, Some(&self.live));
        // the alternate list may have swapped glyphs in
        let live = self.subset.resolve(font);
        let swapped_in = added(&self.live, &live);
        if !swapped_in.is_empty() {
            font.update(&values, Some(&swapped_in));
        }
        self.live = live;
        self.values = Some(values);
        self.compile()
    }

    fn apply_subset(&mut self, text: &str, add: bool, origin: Option<&str>) -> Result<Response, Error> {
        let font = current_font(&mut self.fonts, &self.current)?;
        let previous = std::mem::take(&mut self.live);
        self.subset.apply(origin, text, add);
        let live = self.subset.resolve(font);
        let Some(values) = self.values.as_ref() else {
            self.live = live;
            return Ok(Response::Acknowledged);
        };
        let new_glyphs = added(&previous, &live);
        trace!("{} glyphs joined the subset", new_glyphs.len());
        if !new_glyphs.is_empty() {
            font.update(values, Some(&new_glyphs));
        }
        self.live = live;
        self.compile()
    }

    fn alternates(
        &mut self,
        alt_list: Option<IndexMap<String, GlyphName>>,
        single: Option<(Codepoint, GlyphName)>,
    ) -> Result<Response, Error> {
        let remaps = match alt_list {
            Some(alt_list) => alt_list
                .into_iter()
                .map(|(key, name)| {
                    key.parse::<Codepoint>()
                        .map(|codepoint| (codepoint, name))
                        .map_err(|_| Error::BadCodepoint(key))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => single.into_iter().collect(),
        };
        let mut response = Response::Acknowledged;
        for (codepoint, name) in remaps {
            response = self.solo_alternate(codepoint, &name)?;
        }
        Ok(response)
    }

    /// Remap `codepoint` and recompute the live glyphs the switch touched:
    /// every remapped glyph now live, plus whatever else joined the subset.
    fn solo_alternate(&mut self, codepoint: Codepoint, name: &GlyphName) -> Result<Response, Error> {
        let font = current_font(&mut self.fonts, &self.current)?;
        let changes = font.set_alternates_for(codepoint, name)?;
        let live = self.subset.resolve(font);
        let Some(values) = self.values.as_ref() else {
            self.live = live;
            return Ok(Response::Acknowledged);
        };

        let mut touched = added(&self.live, &live);
        for change in changes {
            if live.contains(&change.new_name) && !touched.contains(&change.new_name) {
                touched.push(change.new_name);
            }
        }
        trace!("Alternate '{name}' recomputes {touched:?}");
        font.update(values, Some(&touched));
        self.live = live;
        self.compile()
    }

    fn properties(&self, properties: &Properties) -> Result<Response, Error> {
        let font = self.font().ok_or(Error::NoFont)?;
        let mut result = GlyphProperties::new();
        for glyph in self.live.iter().filter_map(|name| font.glyph(name.as_str())) {
            let Some(unicode) = glyph.unicode() else {
                continue;
            };
            let entry = result.entry(unicode).or_default();
            for property in properties.names() {
                entry.insert(property.clone(), glyph.property(property));
            }
        }
        Ok(Response::Props { result })
    }

    /// Compile every glyph under distribution names; the session is left as
    /// it was, codepoint map included.
    fn otf_font(
        &mut self,
        family: Option<&str>,
        style: Option<&str>,
        values: Option<ParameterVector>,
    ) -> Result<Response, Error> {
        let session_values = self.values.clone();
        let live = self.live.clone();
        let font = current_font(&mut self.fonts, &self.current)?;
        let export_values = values
            .or_else(|| session_values.clone())
            .unwrap_or_else(|| ParameterVector::from_values(font.template().init_values()));
        let char_map = font.char_map().clone();

        let all = font.glyph_names();
        font.update(&export_values, Some(&all));
        let scope = font.scope(&export_values);
        let export = ExportFont::new(
            font,
            &all,
            &scope,
            ExportNames::new(family, style),
            StyleClass::from_parameters(&scope),
        );
        let compiled = self.engine.compile(&export);

        if font.char_map() != &char_map {
            debug!("Restoring the session codepoint map");
            font.restore_char_map(char_map);
        }
        if let Some(session_values) = session_values {
            if session_values != export_values {
                debug!("Restoring the session values on the live subset");
                font.update(&session_values, Some(&live));
            }
        }
        Ok(Response::Binary(compiled?.into()))
    }

    fn change_cursors_to_manual(
        &mut self,
        codepoint: Codepoint,
        cursors: ManualCursors,
    ) -> Result<Response, Error> {
        let name = self.font_mut()?.change_cursors_to_manual(codepoint, cursors)?;
        debug!("'{name}' has new manual cursors");
        Ok(Response::Acknowledged)
    }

    /// The live subset under the session's own names.
    fn compile(&self) -> Result<Response, Error> {
        let font = self.font().ok_or(Error::NoFont)?;
        let scope = self
            .values
            .as_ref()
            .map(|values| font.scope(values))
            .unwrap_or_default();
        let export = ExportFont::new(
            font,
            &self.live,
            &scope,
            ExportNames::from_font_info(font.info()),
            StyleClass::default(),
        );
        let bytes = self.engine.compile(&export)?;
        Ok(Response::Binary(bytes.into()))
    }
}
