mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_report, run_snapshot_command};

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

/// `warn` by default, `info` for our crates with `--verbose`. A `RUST_LOG`
/// setting replaces both.
fn init_logger(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(log::LevelFilter::Warn);
        if verbose {
            builder.filter_module("pagetrim", log::LevelFilter::Info);
            builder.filter_module("pagetrim_lib", log::LevelFilter::Info);
        }
    }
    builder.format_timestamp_millis();
    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();
    init_logger(args.verbose);

    match args.command {
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
            run_snapshot_command(
                &raw_args,
                args.config,
                args.verbose,
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
            )
            .await
        }
        Commands::Report {
            url,
            viewport,
            no_headless,
            format,
            output,
            nav_timeout,
            network_idle_timeout,
            process_timeout,
        } => {
            run_report(
                &raw_args,
                args.config,
                args.verbose,
                url,
                viewport,
                no_headless,
                format,
                output,
                nav_timeout,
                network_idle_timeout,
                process_timeout,
            )
            .await
        }
    }
}
