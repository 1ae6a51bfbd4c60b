use crate::error::ErrorPayload;
use crate::report::SizeReport;
use crate::stages::RewriteEntry;
use crate::Viewport;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema version for output payloads.
pub const PAGETRIM_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum PagetrimOutput {
    Snapshot(SnapshotOutput),
    Report(ReportOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotOutput {
    pub version: String,
    pub url: String,
    pub viewport: Viewport,
    pub output_dir: PathBuf,
    /// Path of the final `index.html`.
    pub document: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rewrites: Vec<RewriteEntry>,
    /// Referenced resources left pointing at their remote URL.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    pub stages: StageCounts,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stage_files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SizeReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCounts {
    pub normalized_removed: usize,
    pub sized_images: usize,
    pub lazy_images: usize,
    pub invisible_removed: usize,
    pub inlined_stylesheets: usize,
    pub pruned_rules: usize,
    pub ambiguous_selectors: usize,
    pub stripped_attributes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutput {
    pub version: String,
    pub viewport: Viewport,
    #[serde(flatten)]
    pub report: SizeReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    pub message: String,
    pub error: ErrorPayload,
}
