//! First render pass: strip non-visual nodes and pin image sizing.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::scripts::{
    APPLY_IMAGE_HINTS, REMOVE_MATCHING, SAMPLE_IMAGES, UNREGISTER_SERVICE_WORKERS,
};
use super::{close_pass, open_pass, run_count, RunContext};
use crate::browser::{evaluate_as, RenderSession, SessionFactory};
use crate::capture::ResourceCapture;
use crate::Result;

/// Elements that never belong in a static snapshot.
pub const REMOVED_SELECTORS: &[&str] = &[
    "iframe",
    "script",
    r#"link[rel~="preload"]"#,
    r#"img[src=""]"#,
];

/// Markup after the first pass plus what was changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub html: String,
    pub removed_elements: usize,
    pub sized_images: usize,
    pub lazy_images: usize,
    pub service_workers: usize,
    pub captured_resources: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageSample {
    pub has_width: bool,
    pub style_height: String,
    pub natural_width: f64,
    pub natural_height: f64,
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ImageSurvey {
    pub viewport: ViewportSize,
    #[serde(default)]
    pub images: Vec<ImageSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct PixelSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ImageHint {
    pub index: usize,
    pub size: Option<PixelSize>,
    pub lazy: bool,
}

/// Images without a `width` attribute and an `auto` height get their
/// intrinsic size as attributes; images starting outside the viewport are
/// deferred.
pub(crate) fn plan_image_hints(survey: &ImageSurvey) -> Vec<ImageHint> {
    survey
        .images
        .iter()
        .enumerate()
        .filter_map(|(index, image)| {
            let size = (!image.has_width
                && image.style_height.trim().eq_ignore_ascii_case("auto")
                && image.natural_width > 0.0
                && image.natural_height > 0.0)
                .then(|| PixelSize {
                    width: image.natural_width.round() as u32,
                    height: image.natural_height.round() as u32,
                });
            let lazy =
                image.left >= survey.viewport.width || image.top >= survey.viewport.height;

            (size.is_some() || lazy).then_some(ImageHint { index, size, lazy })
        })
        .collect()
}

/// Runs the pass in its own session.
pub async fn normalize<F: SessionFactory>(factory: &F, ctx: &RunContext) -> Result<Normalized> {
    let started = Instant::now();
    let capture = Arc::new(ResourceCapture::excluding(&ctx.url));

    let session = open_pass(factory, ctx, None, Some(capture.clone())).await?;
    let result = normalize_page(&session).await;
    close_pass(&session).await;

    let mut normalized = result?;
    normalized.captured_resources = capture.len();
    log::info!(
        "Normalized {} in {:.2?}: removed {} elements, sized {} images, deferred {}, {} resources seen",
        ctx.url,
        started.elapsed(),
        normalized.removed_elements,
        normalized.sized_images,
        normalized.lazy_images,
        normalized.captured_resources
    );
    Ok(normalized)
}

/// Applies the normalization to an already loaded page.
pub async fn normalize_page<S: RenderSession + ?Sized>(session: &S) -> Result<Normalized> {
    let removed_elements =
        run_count(session, REMOVE_MATCHING, vec![json!(REMOVED_SELECTORS)]).await?;

    let survey: ImageSurvey = evaluate_as(session, SAMPLE_IMAGES, Vec::new()).await?;
    let hints = plan_image_hints(&survey);
    if !hints.is_empty() {
        session
            .evaluate(APPLY_IMAGE_HINTS, vec![serde_json::to_value(&hints)?])
            .await?;
    }

    let service_workers = match run_count(session, UNREGISTER_SERVICE_WORKERS, Vec::new()).await {
        Ok(count) => count,
        Err(err) => {
            log::warn!("Could not unregister service workers: {}", err);
            0
        }
    };

    Ok(Normalized {
        html: session.serialize_document().await?,
        removed_elements,
        sized_images: hints.iter().filter(|h| h.size.is_some()).count(),
        lazy_images: hints.iter().filter(|h| h.lazy).count(),
        service_workers,
        captured_resources: 0,
    })
}
