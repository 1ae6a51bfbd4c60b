//! Resource capture and network substitution for render passes.
//!
//! [`ResourceCapture`] buffers every completed exchange a page depended on.
//! [`InterceptPlan`] decides, per outgoing request, whether to answer with
//! replayed markup, re-type a font response, or let the request through.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::browser::{InterceptedRequest, ObservedResponse, RenderSession, RouteAction};
use crate::Result;

/// Resource class as reported by the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Document,
    Stylesheet,
    Script,
    Image,
    Font,
    Other,
}

impl ResourceType {
    pub fn from_engine(kind: &str) -> Self {
        match kind {
            "document" => ResourceType::Document,
            "stylesheet" => ResourceType::Stylesheet,
            "script" => ResourceType::Script,
            "image" => ResourceType::Image,
            "font" => ResourceType::Font,
            _ => ResourceType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Document => "document",
            ResourceType::Stylesheet => "stylesheet",
            ResourceType::Script => "script",
            ResourceType::Image => "image",
            ResourceType::Font => "font",
            ResourceType::Other => "other",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed network exchange. The body stays in the session until
/// [`CapturedResource::body`] asks for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedResource {
    /// URL of the originating request, before any redirect.
    pub request_url: String,
    pub final_url: String,
    pub resource_type: ResourceType,
    /// Header names are lower-case.
    pub headers: HashMap<String, String>,
    response_id: u64,
}

impl CapturedResource {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    /// Declared `Content-Length`, if present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("content-length")
            .and_then(|v| v.trim().parse().ok())
    }

    pub async fn body<S: RenderSession + ?Sized>(&self, session: &S) -> Result<Vec<u8>> {
        session.response_body(self.response_id).await
    }
}

/// Ordered buffer of the resources seen during one render pass.
#[derive(Debug, Default)]
pub struct ResourceCapture {
    excluded: Option<Url>,
    resources: Mutex<Vec<CapturedResource>>,
}

impl ResourceCapture {
    /// Captures every qualifying response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures every qualifying response except the page's own document.
    pub fn excluding(page_url: &Url) -> Self {
        Self {
            excluded: Some(page_url.clone()),
            resources: Mutex::new(Vec::new()),
        }
    }

    /// Records `response` unless it is a redirect, did not originate from an
    /// http(s) request, answers the excluded page URL, or repeats a request
    /// URL already captured.
    pub fn record(&self, response: ObservedResponse) {
        if response.headers.contains_key("location") {
            log::trace!("Skipping redirect response for {}", response.request_url);
            return;
        }

        let Ok(origin) = Url::parse(&response.request_url) else {
            return;
        };
        if !matches!(origin.scheme(), "http" | "https") {
            return;
        }
        if self.excluded.as_ref() == Some(&origin) {
            return;
        }

        let mut resources = self
            .resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if resources
            .iter()
            .any(|r| r.request_url == response.request_url)
        {
            log::trace!("Already captured {}", response.request_url);
            return;
        }

        resources.push(CapturedResource {
            request_url: response.request_url,
            final_url: response.final_url,
            resource_type: ResourceType::from_engine(&response.resource_type),
            headers: response.headers,
            response_id: response.response_id,
        });
    }

    /// Captured resources in the order their responses completed.
    pub fn snapshot(&self) -> Vec<CapturedResource> {
        self.resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Routing policy for one render pass.
#[derive(Debug, Clone)]
pub struct InterceptPlan {
    page_url: Url,
    document: Option<String>,
    retype_fonts: bool,
}

impl InterceptPlan {
    pub fn new(page_url: Url, document: Option<String>, retype_fonts: bool) -> Self {
        Self {
            page_url,
            document,
            retype_fonts,
        }
    }

    pub fn decide(&self, request: &InterceptedRequest) -> RouteAction {
        if let Some(document) = &self.document {
            if Url::parse(&request.url).is_ok_and(|url| url == self.page_url) {
                return RouteAction::Fulfill {
                    status: 200,
                    content_type: "text/html; charset=utf-8".to_string(),
                    body: document.clone(),
                };
            }
        }

        if self.retype_fonts {
            if let Some(content_type) = font_content_type(&request.url) {
                return RouteAction::Retype {
                    content_type: content_type.to_string(),
                };
            }
        }

        RouteAction::Continue
    }
}

/// Content type for font files whose server-declared type is unreliable.
pub fn font_content_type(url: &str) -> Option<&'static str> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase(),
    };

    [
        (".woff2", "font/woff2"),
        (".woff", "font/woff"),
        (".ttf", "font/ttf"),
        (".otf", "font/otf"),
    ]
    .into_iter()
    .find(|(suffix, _)| path.ends_with(suffix))
    .map(|(_, content_type)| content_type)
}
