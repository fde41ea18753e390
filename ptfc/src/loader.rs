//! Fetching and memoizing templates.

use std::{collections::HashMap, fs, io, path::PathBuf, sync::Arc};

use log::{debug, info};
use parking_lot::Mutex;
use ptfir::template::Template;

use crate::Error;

/// Template identifiers a loader accepts unless told otherwise.
pub const KNOWN_TEMPLATES: &[&str] = &["elzevir.ptf", "venus.ptf", "john-fell.ptf", "spectral.ptf"];

const STATUS_OK: u16 = 200;
const STATUS_FORBIDDEN: u16 = 403;
const STATUS_NOT_FOUND: u16 = 404;

/// `GET {path}` with an optional bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub path: String,
    pub bearer: Option<String>,
}

impl FetchRequest {
    fn for_template(id: &str, bearer: Option<&str>) -> FetchRequest {
        FetchRequest {
            path: format!("/fonts/{id}"),
            bearer: bearer.map(str::to_string),
        }
    }

    /// The last path segment.
    pub fn template_id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> FetchResponse {
        FetchResponse {
            status: STATUS_OK,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> FetchResponse {
        FetchResponse {
            status,
            body: String::new(),
        }
    }
}

/// Where template sources come from.
///
/// Transport failures are errors; anything the server answered, including
/// refusals, is a response.
pub trait TemplateFetcher: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// Serves `{root}/{template id}`.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> DirectoryFetcher {
        DirectoryFetcher { root: root.into() }
    }
}

impl TemplateFetcher for DirectoryFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let path = self.root.join(request.template_id());
        match fs::read_to_string(&path) {
            Ok(body) => Ok(FetchResponse::ok(body)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FetchResponse::status(STATUS_NOT_FOUND)),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Ok(FetchResponse::status(STATUS_FORBIDDEN))
            }
            Err(source) => Err(Error::FileIo { path, source }),
        }
    }
}

type Slot = Arc<Mutex<Option<Arc<Template>>>>;

/// Loads each template at most once, however many callers ask concurrently.
///
/// Callers asking for an identifier that is being loaded wait for that load
/// and share its result. Failures are not remembered; the next call tries
/// again.
pub struct TemplateLoader {
    fetcher: Box<dyn TemplateFetcher>,
    token: Option<String>,
    known: Option<Vec<String>>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl TemplateLoader {
    pub fn new(fetcher: impl TemplateFetcher + 'static) -> TemplateLoader {
        TemplateLoader {
            fetcher: Box::new(fetcher),
            token: None,
            known: Some(KNOWN_TEMPLATES.iter().map(|s| s.to_string()).collect()),
            slots: Default::default(),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> TemplateLoader {
        self.token = token;
        self
    }

    /// Restrict identifiers to `known`, or accept any if `None`.
    pub fn with_known(mut self, known: Option<Vec<String>>) -> TemplateLoader {
        self.known = known;
        self
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.known
            .as_ref()
            .map_or(true, |known| known.iter().any(|k| k == id))
    }

    pub fn load(&self, id: &str) -> Result<Arc<Template>, Error> {
        if !self.is_known(id) {
            return Err(Error::Validation(id.to_string()));
        }
        let entry = self.slots.lock().entry(id.to_string()).or_default().clone();

        // held across the fetch so concurrent loads of `id` queue up here
        let mut slot = entry.lock();
        if let Some(template) = slot.as_ref() {
            debug!("Template '{id}' already loaded");
            return Ok(template.clone());
        }

        let response = self
            .fetcher
            .fetch(&FetchRequest::for_template(id, self.token.as_deref()))?;
        match response.status {
            STATUS_FORBIDDEN => return Err(Error::Authorization(id.to_string())),
            status if !(200..300).contains(&status) => {
                return Err(Error::Fetch {
                    id: id.to_string(),
                    reason: format!("status {status}"),
                })
            }
            _ => (),
        }
        let template = Arc::new(Template::from_json(&response.body)?);
        info!(
            "Loaded template '{id}', {} glyphs",
            template.glyphs.len()
        );
        *slot = Some(template.clone());
        Ok(template)
    }
}
