//! Size report: transfer size against brotli and gzip, per resource and per
//! resource class when the class is concatenated into one payload.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::browser::{RenderSession, SessionFactory};
use crate::capture::{CapturedResource, ResourceCapture, ResourceType};
use crate::compress;
use crate::stages::{close_pass, open_pass, RunContext};
use crate::Result;

/// Resource classes measured individually.
pub const MEASURED_TYPES: &[ResourceType] = &[
    ResourceType::Document,
    ResourceType::Stylesheet,
    ResourceType::Script,
];

/// Resource classes that also get a concatenated entry.
pub const COMBINED_TYPES: &[ResourceType] = &[ResourceType::Stylesheet, ResourceType::Script];

/// A byte count that may not have been declared. Unknown is never treated
/// as zero: adding anything to it stays unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ByteSizeRepr", try_from = "ByteSizeRepr")]
pub enum ByteSize {
    Known(u64),
    Unknown,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ByteSizeRepr {
    Known(u64),
    Text(String),
}

impl From<ByteSize> for ByteSizeRepr {
    fn from(size: ByteSize) -> Self {
        match size {
            ByteSize::Known(n) => ByteSizeRepr::Known(n),
            ByteSize::Unknown => ByteSizeRepr::Text("unknown".to_string()),
        }
    }
}

impl TryFrom<ByteSizeRepr> for ByteSize {
    type Error = String;

    fn try_from(repr: ByteSizeRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            ByteSizeRepr::Known(n) => Ok(ByteSize::Known(n)),
            ByteSizeRepr::Text(text) if text == "unknown" => Ok(ByteSize::Unknown),
            ByteSizeRepr::Text(text) => Err(format!("invalid byte size: {text}")),
        }
    }
}

impl From<Option<u64>> for ByteSize {
    fn from(value: Option<u64>) -> Self {
        value.map_or(ByteSize::Unknown, ByteSize::Known)
    }
}

impl Add for ByteSize {
    type Output = ByteSize;

    fn add(self, other: ByteSize) -> ByteSize {
        match (self, other) {
            (ByteSize::Known(a), ByteSize::Known(b)) => ByteSize::Known(a.saturating_add(b)),
            _ => ByteSize::Unknown,
        }
    }
}

impl Sum for ByteSize {
    fn sum<I: Iterator<Item = ByteSize>>(iter: I) -> Self {
        iter.fold(ByteSize::Known(0), Add::add)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteSize::Known(n) => f.write_str(&human_size(*n)),
            ByteSize::Unknown => f.write_str("unknown"),
        }
    }
}

/// Renders a byte count with binary units, e.g. `512 B` or `1.5 KiB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeReportEntry {
    pub resource_type: ResourceType,
    /// Absent for a concatenated class entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Number of resources that went into the entry.
    pub resources: usize,
    /// Declared `Content-Length`.
    pub original_size: ByteSize,
    pub brotli_size: u64,
    pub gzip_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeReport {
    pub page_url: String,
    pub resources: Vec<SizeReportEntry>,
    pub combined: Vec<SizeReportEntry>,
}

struct Measured {
    resource_type: ResourceType,
    body: Arc<[u8]>,
    entry: SizeReportEntry,
}

/// Loads the page in its own read-only session and measures it.
pub async fn analyze<F: SessionFactory>(factory: &F, ctx: &RunContext) -> Result<SizeReport> {
    let started = Instant::now();
    let capture = Arc::new(ResourceCapture::new());

    let session = open_pass(factory, ctx, None, Some(capture.clone())).await?;
    let result = analyze_page(&session, &ctx.url, &capture.snapshot()).await;
    close_pass(&session).await;

    let report = result?;
    log::info!(
        "Size report for {} in {:.2?}: {} resources measured",
        ctx.url,
        started.elapsed(),
        report.resources.len()
    );
    Ok(report)
}

/// Measures the captured resources of an already loaded page.
pub async fn analyze_page<S: RenderSession + ?Sized>(
    session: &S,
    page_url: &Url,
    resources: &[CapturedResource],
) -> Result<SizeReport> {
    let measured: Vec<Measured> = join_all(
        resources
            .iter()
            .filter(|r| MEASURED_TYPES.contains(&r.resource_type))
            .map(|r| measure_resource(session, r)),
    )
    .await
    .into_iter()
    .flatten()
    .collect();

    let mut combined = Vec::with_capacity(COMBINED_TYPES.len());
    for kind in COMBINED_TYPES {
        combined.push(combine(*kind, &measured).await?);
    }

    Ok(SizeReport {
        page_url: page_url.to_string(),
        resources: measured.into_iter().map(|m| m.entry).collect(),
        combined,
    })
}

/// `None` when the body or its compression failed; the resource is then
/// left out of the report.
async fn measure_resource<S: RenderSession + ?Sized>(
    session: &S,
    resource: &CapturedResource,
) -> Option<Measured> {
    let body: Arc<[u8]> = match resource.body(session).await {
        Ok(body) => body.into(),
        Err(err) => {
            log::warn!("Skipping {} in size report: {}", resource.request_url, err);
            return None;
        }
    };

    let sizes = match compress::measure(body.clone()).await {
        Ok(sizes) => sizes,
        Err(err) => {
            log::warn!("Could not compress {}: {}", resource.request_url, err);
            return None;
        }
    };

    let original_size = ByteSize::from(resource.content_length());
    if original_size == ByteSize::Unknown {
        log::debug!("{} declared no content length", resource.request_url);
    }

    Some(Measured {
        resource_type: resource.resource_type,
        body,
        entry: SizeReportEntry {
            resource_type: resource.resource_type,
            url: Some(resource.request_url.clone()),
            resources: 1,
            original_size,
            brotli_size: sizes.brotli,
            gzip_size: sizes.gzip,
        },
    })
}

/// Concatenates every body of `kind` in capture order and measures it once.
async fn combine(kind: ResourceType, measured: &[Measured]) -> Result<SizeReportEntry> {
    let members: Vec<&Measured> = measured.iter().filter(|m| m.resource_type == kind).collect();

    let concatenated: Vec<u8> = members.iter().flat_map(|m| m.body.iter().copied()).collect();
    let sizes = compress::measure(concatenated.into()).await?;

    Ok(SizeReportEntry {
        resource_type: kind,
        url: None,
        resources: members.len(),
        original_size: members.iter().map(|m| m.entry.original_size).sum(),
        brotli_size: sizes.brotli,
        gzip_size: sizes.gzip,
    })
}
