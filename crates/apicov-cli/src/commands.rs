//! CLI command definitions using clap

use crate::config::{ColorChoice, ContractKind};
use crate::output::OutputFormat;
use apicov::{HostRule, Thresholds};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// apicov: measure how much of an API contract a test run exercised
#[derive(Parser, Debug)]
#[command(name = "apicov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute coverage of contracts from recorded traffic
    Compute(ComputeArgs),

    /// Merge saved coverage reports into one aggregate
    Merge(MergeArgs),

    /// Check a host rewrite table for shadowed rules
    Hosts(HostsArgs),
}

/// Arguments for the compute command
#[derive(Args, Debug, Default)]
pub struct ComputeArgs {
    /// Run configuration file (YAML)
    #[arg(short, long, conflicts_with_all = ["contract", "har_dir", "events_log", "host"])]
    pub config: Option<PathBuf>,

    /// Contract document (JSON or YAML) for a single-source run
    #[arg(long)]
    pub contract: Option<PathBuf>,

    /// Contract document format
    #[arg(long, default_value = "openapi")]
    pub contract_kind: ContractKindArg,

    /// Directory of HAR files
    #[arg(long, conflicts_with = "events_log")]
    pub har_dir: Option<PathBuf>,

    /// JSON-lines event log
    #[arg(long)]
    pub events_log: Option<PathBuf>,

    /// Host rewrite rule PREFIX[=REPLACEMENT]; first match wins
    #[arg(long = "host", value_name = "PREFIX[=REPLACEMENT]")]
    pub host: Vec<HostRule>,

    /// Use HTTP response codes as discriminators
    #[arg(long)]
    pub status_discriminator: bool,

    /// Prefix prepended to event log channels
    #[arg(long)]
    pub channel_prefix: Option<String>,

    /// Source label for a single-source run
    #[arg(long, default_value = "api")]
    pub label: String,

    /// Markdown report title
    #[arg(long)]
    pub suite_name: Option<String>,

    /// Output directory for reports
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Report base name
    #[arg(long)]
    pub output_name: Option<String>,

    /// Exit non-zero when coverage is below this percentage
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub fail_under: Option<u32>,

    /// Summary format on stdout
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the merge command
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Saved reports; single-source reports are labelled by file stem
    #[arg(required = true)]
    pub reports: Vec<PathBuf>,

    /// Merged JSON report path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also write a markdown report here
    #[arg(long)]
    pub markdown: Option<PathBuf>,

    /// Markdown report title
    #[arg(long, default_value = "API Coverage")]
    pub suite_name: String,

    /// Exit non-zero when coverage is below this percentage
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub fail_under: Option<u32>,

    /// Lowest percentage shown as ok
    #[arg(long, default_value_t = 70, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub ok: u32,

    /// Lowest percentage shown as a warning
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub warning: u32,
}

impl MergeArgs {
    /// Bands for the merged report
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.ok, self.warning)
    }
}

/// Arguments for the hosts command
#[derive(Args, Debug)]
pub struct HostsArgs {
    /// Host rewrite rule PREFIX[=REPLACEMENT], in match order
    #[arg(long = "host", value_name = "PREFIX[=REPLACEMENT]", required = true)]
    pub host: Vec<HostRule>,

    /// Sample URL to rewrite with the table
    #[arg(long = "url")]
    pub url: Vec<String>,

    /// Fail when a rule is shadowed
    #[arg(long)]
    pub strict: bool,
}

/// Contract kind argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ContractKindArg {
    /// OpenAPI / Swagger
    #[default]
    Openapi,
    /// AsyncAPI 2.x
    Asyncapi,
    /// Pre-normalized contract tree
    Tree,
}

impl From<ContractKindArg> for ContractKind {
    fn from(arg: ContractKindArg) -> Self {
        match arg {
            ContractKindArg::Openapi => Self::OpenApi,
            ContractKindArg::Asyncapi => Self::AsyncApi,
            ContractKindArg::Tree => Self::Tree,
        }
    }
}

/// Summary format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    /// Colored text
    #[default]
    Text,
    /// Aggregate report as JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
