//! The mutating snapshot stages and the render-pass plumbing they share.
//!
//! Every stage opens its own session, navigates, works on the live page and
//! hands serialized markup to the next stage.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::browser::{InterceptedRequest, Readiness, RenderSession, SessionFactory};
use crate::capture::{InterceptPlan, ResourceCapture};
use crate::{DeviceProfile, Result};

pub mod localize;
pub mod normalize;
pub(crate) mod scripts;
pub mod visibility;

pub use localize::{localize, localize_page, LocalizeError, Localized, RewriteEntry};
pub use normalize::{normalize, normalize_page, Normalized};
pub use visibility::{prune_invisible, prune_page, ElementVisualState, VisibilityPruned};

/// Per-run settings threaded through every render pass.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub url: Url,
    pub device: DeviceProfile,
    pub readiness: Readiness,
    pub retype_fonts: bool,
}

impl RunContext {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            device: DeviceProfile::default(),
            readiness: Readiness::default(),
            retype_fonts: true,
        }
    }
}

/// Opens a session, installs routing (replaying `document` for the page URL
/// when given) and optional capture, then navigates to the page.
pub async fn open_pass<F: SessionFactory>(
    factory: &F,
    ctx: &RunContext,
    document: Option<String>,
    capture: Option<Arc<ResourceCapture>>,
) -> Result<F::Session> {
    let session = factory.new_session(ctx.device).await?;
    match prepare(&session, ctx, document, capture).await {
        Ok(()) => Ok(session),
        Err(err) => {
            close_pass(&session).await;
            Err(err)
        }
    }
}

async fn prepare<S: RenderSession>(
    session: &S,
    ctx: &RunContext,
    document: Option<String>,
    capture: Option<Arc<ResourceCapture>>,
) -> Result<()> {
    let plan = InterceptPlan::new(ctx.url.clone(), document, ctx.retype_fonts);
    session
        .intercept_requests(Arc::new(move |request: &InterceptedRequest| {
            plan.decide(request)
        }))
        .await?;

    if let Some(capture) = capture {
        session
            .on_response(Arc::new(move |response| capture.record(response)))
            .await?;
    }

    session.navigate(ctx.url.as_str(), ctx.readiness).await
}

/// Runs a mutating page function and reads its numeric result, treating
/// anything else as zero.
pub(crate) async fn run_count<S: RenderSession + ?Sized>(
    session: &S,
    function: &str,
    args: Vec<Value>,
) -> Result<usize> {
    let value = session.evaluate(function, args).await?;
    Ok(value.as_u64().unwrap_or_default() as usize)
}

/// Closes a session; a failure here does not affect the pass result.
pub async fn close_pass<S: RenderSession>(session: &S) {
    if let Err(err) = session.close().await {
        log::warn!("Failed to close render session: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::scripted::{ScriptedFactory, ScriptedSession};
    use crate::browser::RouteAction;

    #[tokio::test]
    async fn open_pass_replays_document_and_captures() {
        let session = ScriptedSession::new()
            .request("https://example.com/", "document")
            .request("https://example.com/a.css", "stylesheet")
            .response("https://example.com/", "document", &[], Some(b"<p>"))
            .response("https://example.com/a.css", "stylesheet", &[], Some(b"p{}"));
        let factory = ScriptedFactory::new([session.clone()]);
        let ctx = RunContext::new(Url::parse("https://example.com/").unwrap());
        let capture = Arc::new(ResourceCapture::excluding(&ctx.url));

        let opened = open_pass(&factory, &ctx, Some("<p>kept</p>".into()), Some(capture.clone()))
            .await
            .unwrap();
        close_pass(&opened).await;

        let routed = session.routed();
        assert!(matches!(&routed[0].1, RouteAction::Fulfill { body, .. } if body == "<p>kept</p>"));
        assert_eq!(routed[1].1, RouteAction::Continue);
        assert_eq!(capture.len(), 1);
        assert_eq!(
            session.navigations(),
            vec![("https://example.com/".to_string(), Readiness::NetworkIdle)]
        );
        assert!(session.was_closed());
        assert_eq!(factory.devices(), vec![DeviceProfile::default()]);
    }
}
