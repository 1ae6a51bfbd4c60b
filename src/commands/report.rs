use std::path::PathBuf;
use std::process::ExitCode;

use pagetrim_lib::output::PAGETRIM_OUTPUT_VERSION;
use pagetrim_lib::{analyze, BrowserManager, PagetrimError, PagetrimOutput, ReportOutput, Viewport};

use super::{parse_page_url, run_context};
use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};
use crate::settings::{
    format_effective_config, load_config, resolve_config, validate_resolved, CliOverrides,
    FlagSources,
};

/// Run the report command.
#[allow(clippy::too_many_arguments)]
pub async fn run_report(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    url: String,
    viewport: Viewport,
    no_headless: bool,
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
            output_dir: None,
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
    let report = match analyze(&manager, &ctx).await {
        Ok(report) => report,
        Err(err) => return render_error(err, format, output.clone()),
    };

    let body = PagetrimOutput::Report(ReportOutput {
        version: PAGETRIM_OUTPUT_VERSION.to_string(),
        viewport: config.viewport,
        report,
    });
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(PagetrimError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}
