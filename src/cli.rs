use clap::{Parser, Subcommand, ValueEnum};
use pagetrim_lib::Viewport;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pagetrim")]
#[command(
    version,
    about = "Pagetrim - Snapshot a rendered page into a pruned, self-contained, minified copy",
    long_about = "Pagetrim\n\nModes:\n- snapshot: render a URL, strip scripts and invisible elements, inline and prune stylesheets, localize referenced resources and write a minified index.html.\n- report: measure the original and compressed (brotli/gzip) sizes of a page's documents, stylesheets and scripts.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) to set defaults for viewport/timeouts/output dir; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a page and write a self-contained snapshot
    Snapshot {
        #[arg(long, help = "Page to snapshot (http or https URL)")]
        url: String,

        #[arg(
            long,
            default_value = "output",
            value_name = "PATH",
            help = "Output directory; removed and recreated on every run"
        )]
        output_dir: PathBuf,

        #[arg(
            long,
            default_value = "375x812",
            help = "Viewport dimensions (WIDTHxHEIGHT)"
        )]
        viewport: Viewport,

        #[arg(long, help = "Show the browser window while rendering")]
        no_headless: bool,

        #[arg(
            long,
            help = "Also write stage-1-normalized.html and stage-2-visible.html"
        )]
        keep_stages: bool,

        #[arg(long, help = "Include a size report of the source page")]
        report: bool,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,

        #[arg(
            long,
            default_value = "30",
            help = "Navigation timeout (seconds) for each render pass"
        )]
        nav_timeout: u64,

        #[arg(
            long,
            default_value = "10",
            help = "Network idle timeout (seconds) for each render pass"
        )]
        network_idle_timeout: u64,

        #[arg(
            long,
            default_value = "45",
            help = "Timeout (seconds) for every other browser command"
        )]
        process_timeout: u64,
    },

    /// Measure the transfer size of a page's resources
    Report {
        #[arg(long, help = "Page to measure (http or https URL)")]
        url: String,

        #[arg(
            long,
            default_value = "375x812",
            help = "Viewport dimensions (WIDTHxHEIGHT)"
        )]
        viewport: Viewport,

        #[arg(long, help = "Show the browser window while rendering")]
        no_headless: bool,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,

        #[arg(
            long,
            default_value = "30",
            help = "Navigation timeout (seconds) for the render pass"
        )]
        nav_timeout: u64,

        #[arg(
            long,
            default_value = "10",
            help = "Network idle timeout (seconds) for the render pass"
        )]
        network_idle_timeout: u64,

        #[arg(
            long,
            default_value = "45",
            help = "Timeout (seconds) for every other browser command"
        )]
        process_timeout: u64,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, OutputFormat};
    use clap::Parser;
    use std::path::Path;

    #[test]
    fn snapshot_command_uses_defaults() {
        let cli = Cli::parse_from(["pagetrim", "snapshot", "--url", "https://example.com"]);

        assert!(!cli.verbose);
        assert!(cli.config.is_none());

        match cli.command {
            Commands::Snapshot {
                url,
                output_dir,
                viewport,
                no_headless,
                keep_stages,
                report,
                format,
                output,
                nav_timeout,
                network_idle_timeout,
                process_timeout,
            } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(output_dir, Path::new("output"));
                assert_eq!(viewport.width, 375);
                assert_eq!(viewport.height, 812);
                assert!(!no_headless);
                assert!(!keep_stages);
                assert!(!report);
                assert!(matches!(format, OutputFormat::Json));
                assert!(output.is_none());
                assert_eq!(nav_timeout, 30);
                assert_eq!(network_idle_timeout, 10);
                assert_eq!(process_timeout, 45);
            }
            _ => panic!("expected snapshot command"),
        }
    }

    #[test]
    fn snapshot_command_respects_overrides() {
        let cli = Cli::parse_from([
            "pagetrim",
            "snapshot",
            "--url",
            "https://example.com/shop",
            "--output-dir",
            "snap",
            "--viewport",
            "414x896",
            "--no-headless",
            "--keep-stages",
            "--report",
            "--format",
            "pretty",
            "-o",
            "summary.json",
            "--nav-timeout",
            "20",
            "--network-idle-timeout",
            "6",
            "--process-timeout",
            "50",
            "--config",
            "pagetrim.toml",
        ]);

        assert_eq!(cli.config.as_deref(), Some(Path::new("pagetrim.toml")));
        match cli.command {
            Commands::Snapshot {
                output_dir,
                viewport,
                no_headless,
                keep_stages,
                report,
                format,
                output,
                nav_timeout,
                network_idle_timeout,
                process_timeout,
                ..
            } => {
                assert_eq!(output_dir, Path::new("snap"));
                assert_eq!(viewport.width, 414);
                assert_eq!(viewport.height, 896);
                assert!(no_headless);
                assert!(keep_stages);
                assert!(report);
                assert!(matches!(format, OutputFormat::Pretty));
                assert_eq!(output.as_deref(), Some(Path::new("summary.json")));
                assert_eq!(nav_timeout, 20);
                assert_eq!(network_idle_timeout, 6);
                assert_eq!(process_timeout, 50);
            }
            _ => panic!("expected snapshot command with overrides"),
        }
    }

    #[test]
    fn report_command_sets_verbose() {
        let cli = Cli::parse_from([
            "pagetrim",
            "--verbose",
            "report",
            "--url",
            "https://example.com/page",
        ]);

        assert!(cli.verbose);

        match cli.command {
            Commands::Report {
                url,
                viewport,
                format,
                output,
                ..
            } => {
                assert_eq!(url, "https://example.com/page");
                assert_eq!(viewport.width, 375);
                assert!(matches!(format, OutputFormat::Json));
                assert!(output.is_none());
            }
            _ => panic!("expected report command"),
        }
    }

    #[test]
    fn invalid_viewport_is_rejected() {
        let parsed = Cli::try_parse_from([
            "pagetrim",
            "snapshot",
            "--url",
            "https://example.com",
            "--viewport",
            "wide",
        ]);
        assert!(parsed.is_err());
    }
}
