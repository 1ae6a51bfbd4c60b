use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pagetrim_lib::output::PAGETRIM_OUTPUT_VERSION;
use pagetrim_lib::{human_size, ErrorOutput, PagetrimError, PagetrimOutput, SizeReport};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &PagetrimOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: PagetrimError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let payload = PagetrimOutput::Error(ErrorOutput {
        version: PAGETRIM_OUTPUT_VERSION.to_string(),
        message: error_payload.message.clone(),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(
    body: &PagetrimOutput,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &PagetrimOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &PagetrimOutput, colorize: bool) -> String {
    match body {
        PagetrimOutput::Snapshot(out) => {
            let mut buf = String::new();
            let header = color("[SNAPSHOT]", "32", colorize);
            writeln!(buf, "{} {} ({})", header, out.url, out.viewport).ok();
            writeln!(buf, "Document: {}", out.document.display()).ok();

            let stages = &out.stages;
            writeln!(buf, "Stages:").ok();
            writeln!(
                buf,
                "- {:12} removed {} elements, sized {} images, deferred {}",
                "normalize", stages.normalized_removed, stages.sized_images, stages.lazy_images
            )
            .ok();
            writeln!(
                buf,
                "- {:12} removed {} elements",
                "visibility", stages.invisible_removed
            )
            .ok();
            writeln!(
                buf,
                "- {:12} inlined {} stylesheets, pruned {} rules ({} kept as ambiguous), stripped {} attributes",
                "localize",
                stages.inlined_stylesheets,
                stages.pruned_rules,
                stages.ambiguous_selectors,
                stages.stripped_attributes
            )
            .ok();

            if !out.rewrites.is_empty() {
                writeln!(buf, "Localized resources:").ok();
                for entry in &out.rewrites {
                    writeln!(buf, "- {:10} {}", entry.file, entry.url).ok();
                }
            }
            if !out.skipped.is_empty() {
                let label = color("Left remote:", "33", colorize);
                writeln!(buf, "{label}").ok();
                for url in &out.skipped {
                    writeln!(buf, "- {url}").ok();
                }
            }
            if !out.stage_files.is_empty() {
                writeln!(buf, "Stage files:").ok();
                for path in &out.stage_files {
                    writeln!(buf, "- {}", path.display()).ok();
                }
            }
            if let Some(report) = &out.report {
                format_report(&mut buf, report, colorize);
            }
            buf
        }
        PagetrimOutput::Report(out) => {
            let mut buf = String::new();
            let header = color("[REPORT]", "34", colorize);
            writeln!(buf, "{} {} ({})", header, out.report.page_url, out.viewport).ok();
            format_report(&mut buf, &out.report, colorize);
            buf
        }
        PagetrimOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            writeln!(buf, "{} {}", header, out.message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

fn format_report(buf: &mut String, report: &SizeReport, colorize: bool) {
    writeln!(
        buf,
        "{:10} {:>12} {:>12} {:>12}  url",
        "type", "original", "brotli", "gzip"
    )
    .ok();
    for entry in &report.resources {
        writeln!(
            buf,
            "{:10} {:>12} {:>12} {:>12}  {}",
            entry.resource_type.as_str(),
            entry.original_size.to_string(),
            human_size(entry.brotli_size),
            human_size(entry.gzip_size),
            entry.url.as_deref().unwrap_or("-")
        )
        .ok();
    }
    if !report.combined.is_empty() {
        writeln!(buf, "{}", color("Combined:", "36", colorize)).ok();
        for entry in &report.combined {
            writeln!(
                buf,
                "{:10} {:>12} {:>12} {:>12}  ({} resources)",
                entry.resource_type.as_str(),
                entry.original_size.to_string(),
                human_size(entry.brotli_size),
                human_size(entry.gzip_size),
                entry.resources
            )
            .ok();
        }
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}
