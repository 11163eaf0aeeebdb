//! apicov CLI: contract coverage from recorded traffic
//!
//! ## Usage
//!
//! ```bash
//! apicov compute --config apicov.yaml                 # Multi-source run
//! apicov compute --contract openapi.yaml --har-dir hars \
//!     --host https://api.example.com                  # Single REST source
//! apicov merge rest.json events.json -o all.json      # Merge saved reports
//! apicov hosts --host https://a --host https://a/v2   # Check host table
//! ```

use apicov::HostRewriteTable;
use apicov_cli::{
    check_fail_under, compute, merge_saved, run_config_from_args, Cli, CliConfig, CliResult,
    ColorChoice, Commands, ComputeArgs, HostsArgs, MergeArgs, OutputFormat, ProgressReporter,
    Verbosity,
};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    init_tracing(&config);

    match cli.command {
        Commands::Compute(args) => run_compute(&config, &args),
        Commands::Merge(args) => run_merge(&config, &args),
        Commands::Hosts(args) => run_hosts(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };

    let color: ColorChoice = cli.color.clone().into();

    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

/// Logs go to stderr; `RUST_LOG` overrides the verbosity flags
fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.filter_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.color.should_color())
        .with_target(false)
        .try_init();
}

fn reporter(config: &CliConfig) -> ProgressReporter {
    ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
}

fn run_compute(config: &CliConfig, args: &ComputeArgs) -> CliResult<()> {
    let run = run_config_from_args(args)?;
    let mut reporter = reporter(config);

    let outcome = compute(&run, &mut reporter)?;

    match OutputFormat::from(args.format) {
        OutputFormat::Json => reporter.print(&serde_json::to_string_pretty(&outcome.report)?),
        OutputFormat::Text => {
            reporter.coverage_summary(&outcome.report, &run.thresholds);
            if config.verbosity.is_verbose() {
                for skip in &outcome.report.skipped {
                    reporter.info(&skip.to_string());
                }
            }
            reporter.success(&format!(
                "Wrote {} and {}",
                outcome.json_path.display(),
                outcome.markdown_path.display()
            ));
        }
    }

    check_fail_under(&outcome.report, run.fail_under)
}

fn run_merge(config: &CliConfig, args: &MergeArgs) -> CliResult<()> {
    let reporter = reporter(config);
    let report = merge_saved(args)?;
    reporter.coverage_summary(&report, &args.thresholds());
    reporter.success(&format!("Wrote {}", args.output.display()));
    check_fail_under(&report, args.fail_under)
}

fn run_hosts(config: &CliConfig, args: &HostsArgs) -> CliResult<()> {
    let reporter = reporter(config);
    let table: HostRewriteTable = args.host.iter().cloned().collect();

    for (index, rule) in table.rules().iter().enumerate() {
        let replacement = rule.replacement.as_deref().unwrap_or("");
        reporter.print(&format!("#{} {} => {replacement:?}", index + 1, rule.host));
    }
    for url in &args.url {
        match table.rewrite(url) {
            Some(path) => reporter.print(&format!("{url} -> {path}")),
            None => reporter.print(&format!("{url} -> (dropped)")),
        }
    }

    let overlaps = table.overlaps();
    for overlap in &overlaps {
        reporter.warning(&overlap.to_string());
    }
    if args.strict && !overlaps.is_empty() {
        return Err(apicov_cli::CliError::config(format!(
            "{} shadowed host rule(s)",
            overlaps.len()
        )));
    }
    Ok(())
}
