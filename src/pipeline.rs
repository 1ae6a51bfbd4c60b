//! The full snapshot run: three mutating render passes, each fed the
//! previous pass's serialized document, plus the optional size report.

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use crate::browser::SessionFactory;
use crate::report::{self, SizeReport};
use crate::stages::{
    localize, normalize, prune_invisible, Localized, Normalized, RunContext, VisibilityPruned,
};
use crate::{PagetrimError, Result};

pub const INDEX_FILE: &str = "index.html";
pub const NORMALIZED_STAGE_FILE: &str = "stage-1-normalized.html";
pub const VISIBLE_STAGE_FILE: &str = "stage-2-visible.html";

#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub output_dir: PathBuf,
    /// Also write the intermediate documents next to `index.html`.
    pub keep_stages: bool,
    /// Measure the source page after the snapshot is written.
    pub report: bool,
}

impl SnapshotOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            keep_stages: false,
            report: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotResult {
    pub document: PathBuf,
    pub normalized: Normalized,
    pub visible: VisibilityPruned,
    pub localized: Localized,
    pub stage_files: Vec<PathBuf>,
    pub report: Option<SizeReport>,
}

/// Runs every stage against `ctx.url` and writes the result into a freshly
/// recreated `options.output_dir`.
pub async fn run_snapshot<F: SessionFactory>(
    factory: &F,
    ctx: &RunContext,
    options: &SnapshotOptions,
) -> Result<SnapshotResult> {
    let started = Instant::now();
    let out_dir = options.output_dir.as_path();
    recreate_output_dir(out_dir).await?;

    let mut stage_files = Vec::new();

    let normalized = normalize(factory, ctx).await?;
    if options.keep_stages {
        stage_files.push(write_stage(out_dir, NORMALIZED_STAGE_FILE, &normalized.html).await?);
    }

    let visible = prune_invisible(factory, ctx, normalized.html.clone()).await?;
    if options.keep_stages {
        stage_files.push(write_stage(out_dir, VISIBLE_STAGE_FILE, &visible.html).await?);
    }

    let localized = localize(factory, ctx, visible.html.clone(), out_dir).await?;
    let document = write_stage(out_dir, INDEX_FILE, &localized.html).await?;

    let report = if options.report {
        Some(report::analyze(factory, ctx).await?)
    } else {
        None
    };

    log::info!(
        "Snapshot of {} written to {} in {:.2?}",
        ctx.url,
        document.display(),
        started.elapsed()
    );

    Ok(SnapshotResult {
        document,
        normalized,
        visible,
        localized,
        stage_files,
        report,
    })
}

/// Clears any previous run's files. Paths without a named component
/// (`/`, `.`, `..`, empty) are refused.
pub async fn recreate_output_dir(path: &Path) -> Result<()> {
    if !path.components().any(|c| matches!(c, Component::Normal(_))) {
        return Err(PagetrimError::Config(format!(
            "Refusing to use {:?} as the output directory",
            path
        )));
    }

    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => log::debug!("Cleared previous output in {}", path.display()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

async fn write_stage(out_dir: &Path, name: &str, html: &str) -> Result<PathBuf> {
    let path = out_dir.join(name);
    tokio::fs::write(&path, html).await?;
    Ok(path)
}
