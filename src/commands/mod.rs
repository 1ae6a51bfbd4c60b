mod report;
mod snapshot;

pub use report::run_report;
pub use snapshot::run_snapshot_command;

use pagetrim_lib::{Config, PagetrimError, RunContext};
use url::Url;

/// Parses the `--url` value; only http(s) pages can be rendered and replayed.
pub fn parse_page_url(raw: &str) -> Result<Url, PagetrimError> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PagetrimError::Config(format!(
            "Unsupported URL scheme '{other}' in {raw}; expected http or https"
        ))),
    }
}

/// Per-run settings handed to every render pass.
pub fn run_context(url: Url, config: &Config) -> RunContext {
    RunContext {
        url,
        device: config.device(),
        readiness: config.wait_until,
        retype_fonts: config.retype_fonts,
    }
}
