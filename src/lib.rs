//! Pagetrim Library
//!
//! Snapshots a rendered web page into a pruned, self-contained, minified copy
//! and measures what the original page costs on the wire. Pages are rendered
//! in Chromium driven through a Playwright bridge; every pass talks to the
//! browser through the [`RenderSession`] seam.
//!
//! # Module Overview
//!
//! - [`browser`] - Render session traits and the Playwright-backed implementation
//! - [`stages`] - The three mutating passes (normalize, visibility, localize)
//! - [`pipeline`] - Runs the passes in order and writes the output directory
//! - [`report`] - Per-resource and per-type compressed size report
//! - [`srcset`] - Responsive image source list parsing and serialization
//! - [`css`] - Stylesheet rule trees, dead-rule pruning and `url()` rewriting
//! - [`capture`] - Response recording and request routing
//! - [`config`] - Configuration file support
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use pagetrim_lib::{run_snapshot, BrowserManager, Config, RunContext, SnapshotOptions};
//!
//! # async fn example() -> pagetrim_lib::Result<()> {
//! let config = Config::default();
//! let manager = BrowserManager::new(config.browser_options());
//!
//! let mut ctx = RunContext::new("https://example.com".parse()?);
//! ctx.device = config.device();
//!
//! let result = run_snapshot(&manager, &ctx, &SnapshotOptions::new("output")).await?;
//! println!("wrote {}", result.document.display());
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod capture;
pub mod compress;
pub mod config;
pub mod css;
pub mod error;
pub mod extension;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod srcset;
pub mod stages;
pub mod viewport;

pub use browser::{
    BrowserManager, BrowserOptions, Readiness, RenderSession, SessionFactory,
    DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_NETWORK_IDLE_TIMEOUT, DEFAULT_PROCESS_TIMEOUT,
};
pub use capture::{CapturedResource, ResourceCapture, ResourceType};
pub use config::{Config, ConfigError};
pub use error::{ErrorCategory, ErrorPayload, PagetrimError, Result};
pub use output::{
    ErrorOutput, PagetrimOutput, ReportOutput, SnapshotOutput, StageCounts,
    PAGETRIM_OUTPUT_VERSION,
};
pub use pipeline::{run_snapshot, SnapshotOptions, SnapshotResult};
pub use report::{analyze, human_size, ByteSize, SizeReport, SizeReportEntry};
pub use srcset::{SrcsetCandidate, SrcsetError};
pub use stages::{RewriteEntry, RunContext};
pub use viewport::{DeviceProfile, Viewport};
