//! The rendering-engine contract every pipeline stage is written against.
//!
//! A session is an opaque remote page. Stages never walk its document
//! directly; they navigate, observe the network, and run functions inside
//! the page whose arguments and results cross the boundary as JSON.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DeviceProfile, Result};

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    /// The `load` event fired.
    Load,
    /// No network activity for a quiet period.
    #[default]
    NetworkIdle,
}

impl Readiness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Readiness::Load => "load",
            Readiness::NetworkIdle => "networkidle",
        }
    }
}

/// An outgoing request paused until the session's intercept handler decides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedRequest {
    pub url: String,
    #[serde(default)]
    pub resource_type: String,
}

/// What to do with an intercepted request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RouteAction {
    /// Let the request through untouched.
    Continue,
    /// Answer with a fixed body.
    #[serde(rename_all = "camelCase")]
    Fulfill {
        status: u16,
        content_type: String,
        body: String,
    },
    /// Fetch out-of-band and answer with a corrected `Content-Type`.
    #[serde(rename_all = "camelCase")]
    Retype { content_type: String },
}

/// A completed network exchange as reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedResponse {
    /// Handle for fetching the body later.
    pub response_id: u64,
    /// URL of the first request in the redirect chain.
    pub request_url: String,
    /// URL this particular response answered.
    pub final_url: String,
    #[serde(default)]
    pub resource_type: String,
    pub status: u16,
    /// Header names are lower-case.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

pub type InterceptHandler = Arc<dyn Fn(&InterceptedRequest) -> RouteAction + Send + Sync>;
pub type ResponseHandler = Arc<dyn Fn(ObservedResponse) + Send + Sync>;

#[async_trait]
pub trait RenderSession: Send + Sync {
    async fn navigate(&self, url: &str, readiness: Readiness) -> Result<()>;

    /// Installs the handler consulted for every outgoing request.
    async fn intercept_requests(&self, handler: InterceptHandler) -> Result<()>;

    /// Installs the handler told about every completed response.
    async fn on_response(&self, handler: ResponseHandler) -> Result<()>;

    /// Runs `function` (JavaScript function source) inside the page with
    /// `args` spread as its parameters and returns its JSON result.
    async fn evaluate(&self, function: &str, args: Vec<Value>) -> Result<Value>;

    async fn serialize_document(&self) -> Result<String>;

    async fn response_body(&self, response_id: u64) -> Result<Vec<u8>>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: RenderSession;

    async fn new_session(&self, device: DeviceProfile) -> Result<Self::Session>;
}

/// Evaluates `function` and deserializes its result.
pub async fn evaluate_as<T, S>(session: &S, function: &str, args: Vec<Value>) -> Result<T>
where
    T: DeserializeOwned,
    S: RenderSession + ?Sized,
{
    let value = session.evaluate(function, args).await?;
    Ok(serde_json::from_value(value)?)
}
