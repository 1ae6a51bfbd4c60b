use std::path::PathBuf;
use std::process::ExitCode;

use pagetrim_lib::output::PAGETRIM_OUTPUT_VERSION;
use pagetrim_lib::{
    run_snapshot, BrowserManager, PagetrimError, PagetrimOutput, SnapshotOptions, SnapshotOutput,
    SnapshotResult, StageCounts, Viewport,
};

use super::{parse_page_url, run_context};
use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::settings::{
    format_effective_config, load_config, resolve_config, validate_resolved, CliOverrides,
    FlagSources,
};

/// Run the snapshot command.
#[allow(clippy::too_many_arguments)]
pub async fn run_snapshot_command(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    url: String,
    output_dir: PathBuf,
    viewport: Viewport,
    no_headless: bool,
    keep_stages: bool,
    report: bool,
    format: OutputFormat,
    output: Option<PathBuf>,
    nav_timeout: u64,
    network_idle_timeout: u64,
    process_timeout: u64,
) -> ExitCode {
    let config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output.clone()),
    };
    let config = resolve_config(
        config,
        &CliOverrides {
            viewport,
            output_dir: Some(output_dir),
            no_headless,
            nav_timeout,
            network_idle_timeout,
            process_timeout,
        },
        &FlagSources::from_args(raw_args),
    );
    if let Err(err) = validate_resolved(&config) {
        return render_error(err, format, output.clone());
    }
    if verbose {
        log::info!("{}", format_effective_config(&config, config_path.as_deref()));
    }

    let page_url = match parse_page_url(&url) {
        Ok(url) => url,
        Err(err) => return render_error(err, format, output.clone()),
    };

    let ctx = run_context(page_url, &config);
    let manager = BrowserManager::new(config.browser_options());
    let options = SnapshotOptions {
        output_dir: config.output_dir.clone(),
        keep_stages,
        report,
    };

    let result = match run_snapshot(&manager, &ctx, &options).await {
        Ok(result) => result,
        Err(err) => return render_error(err, format, output.clone()),
    };

    let body = PagetrimOutput::Snapshot(snapshot_output(
        ctx.url.as_str(),
        config.viewport,
        options.output_dir,
        result,
    ));
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(PagetrimError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}

fn snapshot_output(
    url: &str,
    viewport: Viewport,
    output_dir: PathBuf,
    result: SnapshotResult,
) -> SnapshotOutput {
    SnapshotOutput {
        version: PAGETRIM_OUTPUT_VERSION.to_string(),
        url: url.to_string(),
        viewport,
        output_dir,
        document: result.document,
        stages: StageCounts {
            normalized_removed: result.normalized.removed_elements,
            sized_images: result.normalized.sized_images,
            lazy_images: result.normalized.lazy_images,
            invisible_removed: result.visible.removed_elements,
            inlined_stylesheets: result.localized.inlined_stylesheets,
            pruned_rules: result.localized.pruned_rules,
            ambiguous_selectors: result.localized.ambiguous_selectors,
            stripped_attributes: result.localized.stripped_attributes,
        },
        rewrites: result.localized.rewrites,
        skipped: result.localized.skipped,
        stage_files: result.stage_files,
        report: result.report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagetrim_lib::stages::{Localized, Normalized, VisibilityPruned};
    use pagetrim_lib::RewriteEntry;

    #[test]
    fn snapshot_output_collects_stage_counts() {
        let result = SnapshotResult {
            document: PathBuf::from("out/index.html"),
            normalized: Normalized {
                removed_elements: 4,
                sized_images: 2,
                lazy_images: 1,
                ..Normalized::default()
            },
            visible: VisibilityPruned {
                html: String::new(),
                removed_elements: 3,
            },
            localized: Localized {
                rewrites: vec![RewriteEntry {
                    url: "https://cdn.test/a.png".to_string(),
                    file: "0.png".to_string(),
                }],
                pruned_rules: 9,
                ..Localized::default()
            },
            stage_files: Vec::new(),
            report: None,
        };

        let out = snapshot_output(
            "https://example.com/",
            Viewport::default(),
            PathBuf::from("out"),
            result,
        );
        assert_eq!(out.stages.normalized_removed, 4);
        assert_eq!(out.stages.sized_images, 2);
        assert_eq!(out.stages.lazy_images, 1);
        assert_eq!(out.stages.invisible_removed, 3);
        assert_eq!(out.stages.pruned_rules, 9);
        assert_eq!(out.rewrites[0].file, "0.png");
        assert_eq!(out.document, PathBuf::from("out/index.html"));
    }
}
