//! The process-wide state: one template cache and one compilation worker
//! shared by every font a host creates.

use std::sync::Arc;

use log::info;
use ptfbe::engine::FontEngine;

use crate::{
    handle::{mismatch, FontHandle, FontRegistry},
    loader::TemplateLoader,
    protocol::{Request, Response},
    session::Session,
    worker::{Client, CompilationWorker},
    Error,
};

pub struct Compiler {
    loader: Arc<TemplateLoader>,
    worker: CompilationWorker,
}

impl Compiler {
    pub fn new(loader: TemplateLoader) -> Result<Compiler, Error> {
        let loader = Arc::new(loader);
        let worker = CompilationWorker::spawn(Session::new(loader.clone()))?;
        Ok(Compiler { loader, worker })
    }

    pub fn with_engine(loader: TemplateLoader, engine: Box<dyn FontEngine>) -> Result<Compiler, Error> {
        let loader = Arc::new(loader);
        let worker = CompilationWorker::spawn(Session::with_engine(loader.clone(), engine))?;
        Ok(Compiler { loader, worker })
    }

    pub fn loader(&self) -> &TemplateLoader {
        &self.loader
    }

    pub fn client(&self) -> Client {
        self.worker.client()
    }

    /// Load `template_id` and build its font as `font_name`.
    ///
    /// Identifiers are validated and templates fetched before the worker is
    /// involved; concurrent calls for one identifier share a single fetch.
    pub fn create_font(
        &self,
        font_name: &str,
        template_id: &str,
        registry: Arc<dyn FontRegistry>,
    ) -> Result<FontHandle, Error> {
        let template = self.loader.load(template_id)?;
        let client = self.client();
        let response = client.send(Request::Font {
            name: template_id.to_string(),
            db: Some(font_name.to_string()),
        })?;
        if !matches!(response, Response::FontLoaded { .. }) {
            return Err(mismatch("fontLoaded", &response));
        }
        info!("Font '{font_name}' created from '{template_id}'");
        FontHandle::new(client, &template, font_name, registry)
    }
}
