//! A caller's view of one font: its parameter values, kept in sync with the
//! worker, and where its binaries go.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use log::debug;
use parking_lot::Mutex;
use ptfir::{
    params::{ManualCursors, ParameterVector},
    template::Template,
    types::{Codepoint, GlyphName},
};

use crate::{
    protocol::{GlyphProperties, Properties, Request, Response},
    worker::Client,
    Error,
};

/// The host's font registration facility.
pub trait FontRegistry: Send + Sync {
    /// Register `data` under `family`, replacing the face registered before.
    fn register(&self, family: &str, data: Arc<[u8]>);
}

/// Keeps the latest face of each family.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    faces: Mutex<IndexMap<String, Arc<[u8]>>>,
}

impl MemoryRegistry {
    pub fn face(&self, family: &str) -> Option<Arc<[u8]>> {
        self.faces.lock().get(family).cloned()
    }

    pub fn families(&self) -> Vec<String> {
        self.faces.lock().keys().cloned().collect()
    }
}

impl FontRegistry for MemoryRegistry {
    fn register(&self, family: &str, data: Arc<[u8]>) {
        debug!("Registering {} bytes as '{family}'", data.len());
        self.faces.lock().insert(family.to_string(), data);
    }
}

pub(crate) fn mismatch(expected: &'static str, actual: &Response) -> Error {
    Error::ProtocolMismatch {
        expected,
        actual: actual.to_string(),
    }
}

pub struct FontHandle {
    client: Client,
    font_name: String,
    registry: Arc<dyn FontRegistry>,
    init: IndexMap<String, f64>,
    values: IndexMap<String, f64>,
}

impl FontHandle {
    /// Wrap a font the worker has just loaded, and make every glyph of
    /// `template` part of the subset.
    pub(crate) fn new(
        client: Client,
        template: &Template,
        font_name: &str,
        registry: Arc<dyn FontRegistry>,
    ) -> Result<FontHandle, Error> {
        let init = template.init_values();
        let handle = FontHandle {
            client,
            font_name: font_name.to_string(),
            registry,
            values: init.clone(),
            init,
        };
        let glyph_set: IndexSet<char> = template
            .glyphs
            .values()
            .filter_map(|glyph| glyph.unicode.and_then(char::from_u32))
            .collect();
        handle.subset(&glyph_set.into_iter().collect::<String>(), false, None)?;
        Ok(handle)
    }

    pub fn font_name(&self) -> &str {
        &self.font_name
    }

    pub fn init(&self) -> &IndexMap<String, f64> {
        &self.init
    }

    pub fn values(&self) -> &IndexMap<String, f64> {
        &self.values
    }

    /// Hand a binary to the registry; anything but a binary or an
    /// acknowledgement is a protocol error.
    fn deliver(&self, response: Response) -> Result<(), Error> {
        match response {
            Response::Binary(data) => {
                self.registry.register(&self.font_name, data);
                Ok(())
            }
            Response::Acknowledged => Ok(()),
            other => Err(mismatch("binary", &other)),
        }
    }

    fn push_values(&self) -> Result<(), Error> {
        let data = ParameterVector::from_values(self.values.clone());
        let response = self.client.send(Request::Update { data })?;
        self.deliver(response)
    }

    pub fn change_param(&mut self, name: &str, value: f64) -> Result<(), Error> {
        self.values.insert(name.to_string(), value);
        self.push_values()
    }

    /// Merge the global values of `vector` into the handle's and send the
    /// result along with the directives of `vector`.
    pub fn change_params(&mut self, mut vector: ParameterVector) -> Result<(), Error> {
        self.values.extend(vector.values);
        vector.values = self.values.clone();
        let response = self.client.send(Request::Update { data: vector })?;
        self.deliver(response)
    }

    /// Back to the template's init values.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.values = self.init.clone();
        self.push_values()
    }

    pub fn subset(&self, text: &str, add: bool, origin: Option<&str>) -> Result<(), Error> {
        let response = self.client.send(Request::Subset {
            data: text.to_string(),
            add,
            origin: origin.map(str::to_string),
        })?;
        self.deliver(response)
    }

    pub fn set_alternate(&self, unicode: Codepoint, glyph_name: &str) -> Result<(), Error> {
        let response = self.client.send(Request::SoloAlternate {
            unicode,
            glyph_name: GlyphName::new(glyph_name),
        })?;
        self.deliver(response)
    }

    pub fn glyphs_properties(&self, properties: Properties) -> Result<GlyphProperties, Error> {
        match self.client.send(Request::GetGlyphsProperties { properties })? {
            Response::Props { result } => Ok(result),
            other => Err(mismatch("props", &other)),
        }
    }

    pub fn change_cursors_to_manual(
        &self,
        glyph_unicode: Codepoint,
        cursors: ManualCursors,
    ) -> Result<(), Error> {
        let response = self.client.send(Request::ChangeCursorsToManual {
            glyph_unicode,
            cursors,
        })?;
        self.deliver(response)
    }

    /// Every glyph, named for distribution. Not registered.
    pub fn export(&self, family: Option<&str>, style: Option<&str>) -> Result<Arc<[u8]>, Error> {
        let response = self.client.send(Request::OtfFont {
            family: family.map(str::to_string),
            style: style.map(str::to_string),
            values: Some(ParameterVector::from_values(self.values.clone())),
        })?;
        match response {
            Response::Binary(data) => Ok(data),
            other => Err(mismatch("binary", &other)),
        }
    }
}
