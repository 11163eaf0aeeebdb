//! apicov CLI library
//!
//! Command definitions, configuration and the file-facing runner behind the
//! `apicov` binary.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{
    Cli, ColorArg, Commands, ComputeArgs, ContractKindArg, FormatArg, HostsArgs, MergeArgs,
};
pub use config::{
    CliConfig, ColorChoice, ContractConfig, ContractKind, RunConfig, SourceConfig, TrafficConfig,
    Verbosity, DEFAULT_OUTPUT_NAME,
};
pub use error::{CliError, CliResult};
pub use output::{summary_lines, OutputFormat, ProgressReporter};
pub use runner::{
    build_source, check_fail_under, compute, har_files, load_contract, merge_saved,
    read_document, read_har_files, run_config_from_args, write_reports, ComputeOutcome,
};
