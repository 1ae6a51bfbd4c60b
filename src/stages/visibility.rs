//! Second render pass: drop elements that leave no visual footprint.

use std::time::Instant;

use serde::Deserialize;
use serde_json::json;

use super::scripts::{REMOVE_BODY_ELEMENTS, SAMPLE_VISUAL_STATE};
use super::{close_pass, open_pass, RunContext};
use crate::browser::{evaluate_as, RenderSession, SessionFactory};
use crate::Result;

/// Elements kept regardless of their box: styles and embedded-resource
/// containers have no footprint of their own.
pub const EXEMPT_TAGS: &[&str] = &[
    "style", "link", "source", "track", "picture", "object", "embed", "param",
];

/// Layout and computed style of one element, sampled before any removal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElementVisualState {
    #[serde(default)]
    pub tag: String,
    pub width: f64,
    pub height: f64,
    pub opacity: String,
    pub visibility: String,
    pub overflow: String,
    pub display: String,
}

impl ElementVisualState {
    pub fn is_exempt(&self) -> bool {
        EXEMPT_TAGS.contains(&self.tag.to_ascii_lowercase().as_str())
    }

    /// True when the element has no visual footprint.
    pub fn is_invisible(&self) -> bool {
        self.opacity == "0"
            || self.display == "none"
            || self.visibility == "hidden"
            || (self.overflow == "hidden" && (self.width == 0.0 || self.height == 0.0))
    }

    pub fn should_remove(&self) -> bool {
        !self.is_exempt() && self.is_invisible()
    }
}

/// Indices of every element to remove. Each decision only looks at that
/// element's own state.
pub fn removal_indices(states: &[ElementVisualState]) -> Vec<usize> {
    states
        .iter()
        .enumerate()
        .filter(|(_, state)| state.should_remove())
        .map(|(index, _)| index)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityPruned {
    pub html: String,
    pub removed_elements: usize,
}

/// Replays `html` for the page URL and prunes it in its own session.
pub async fn prune_invisible<F: SessionFactory>(
    factory: &F,
    ctx: &RunContext,
    html: String,
) -> Result<VisibilityPruned> {
    let started = Instant::now();
    let session = open_pass(factory, ctx, Some(html), None).await?;
    let result = prune_page(&session).await;
    close_pass(&session).await;

    let pruned = result?;
    log::info!(
        "Visibility pass on {} in {:.2?}: removed {} elements",
        ctx.url,
        started.elapsed(),
        pruned.removed_elements
    );
    Ok(pruned)
}

pub async fn prune_page<S: RenderSession + ?Sized>(session: &S) -> Result<VisibilityPruned> {
    let states: Vec<ElementVisualState> =
        evaluate_as(session, SAMPLE_VISUAL_STATE, Vec::new()).await?;
    let doomed = removal_indices(&states);
    log::debug!(
        "{} of {} body elements are invisible",
        doomed.len(),
        states.len()
    );

    if !doomed.is_empty() {
        session
            .evaluate(REMOVE_BODY_ELEMENTS, vec![json!(doomed)])
            .await?;
    }

    Ok(VisibilityPruned {
        html: session.serialize_document().await?,
        removed_elements: doomed.len(),
    })
}
