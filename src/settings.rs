use std::path::{Path, PathBuf};
use std::time::Duration;

use pagetrim_lib::{Config, PagetrimError, Viewport};

/// Tracks which CLI flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct FlagSources {
    pub viewport: bool,
    pub output_dir: bool,
    pub no_headless: bool,
    pub nav_timeout: bool,
    pub network_idle_timeout: bool,
    pub process_timeout: bool,
}

impl FlagSources {
    pub fn from_args(args: &[String]) -> Self {
        Self {
            viewport: flag_present(args, "--viewport"),
            output_dir: flag_present(args, "--output-dir"),
            no_headless: flag_present(args, "--no-headless"),
            nav_timeout: flag_present(args, "--nav-timeout"),
            network_idle_timeout: flag_present(args, "--network-idle-timeout"),
            process_timeout: flag_present(args, "--process-timeout"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Values a subcommand received from clap, defaults included.
#[derive(Debug, Clone)]
pub struct CliOverrides {
    pub viewport: Viewport,
    pub output_dir: Option<PathBuf>,
    pub no_headless: bool,
    pub nav_timeout: u64,
    pub network_idle_timeout: u64,
    pub process_timeout: u64,
}

/// Merge CLI arguments into the loaded config, preferring CLI when flags are present.
pub fn resolve_config(mut config: Config, cli: &CliOverrides, flags: &FlagSources) -> Config {
    if flags.viewport {
        config.viewport = cli.viewport;
    }
    if flags.output_dir {
        if let Some(dir) = &cli.output_dir {
            config.output_dir = dir.clone();
        }
    }
    if flags.no_headless && cli.no_headless {
        config.headless = false;
    }
    if flags.nav_timeout {
        config.timeouts.navigation = Duration::from_secs(cli.nav_timeout);
    }
    if flags.network_idle_timeout {
        config.timeouts.network_idle = Duration::from_secs(cli.network_idle_timeout);
    }
    if flags.process_timeout {
        config.timeouts.process = Duration::from_secs(cli.process_timeout);
    }
    config
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/pagetrim/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, PagetrimError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        PagetrimError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        PagetrimError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Merged settings are validated again: CLI values such as `--nav-timeout 0`
/// bypass the file validation.
pub fn validate_resolved(config: &Config) -> Result<(), PagetrimError> {
    config
        .validate()
        .map_err(|e| PagetrimError::Config(format!("Invalid settings: {}", e)))
}

/// Format effective config as a single-line string.
pub fn format_effective_config(config: &Config, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    format!(
        "Effective config [{source}]: viewport={}, scale={:.1}, headless={}, wait_until={}, retype_fonts={}, timeouts: nav={}s, network-idle={}s, process={}s, node={}, output_dir={}",
        config.viewport,
        config.device_scale_factor,
        config.headless,
        config.wait_until.as_str(),
        config.retype_fonts,
        config.timeouts.navigation.as_secs(),
        config.timeouts.network_idle.as_secs(),
        config.timeouts.process.as_secs(),
        config.node_command,
        config.output_dir.display()
    )
}
