//! Coverage runs: file access, per-source collection and report writing
//!
//! The library never touches the filesystem; everything it needs is read
//! here and passed in explicitly.

use crate::commands::{ComputeArgs, MergeArgs};
use crate::config::{ContractKind, ContractConfig, RunConfig, SourceConfig, TrafficConfig};
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use apicov::{
    merge, parse_event_log, render, AggregateReport, AsyncApiDocument, ContractSource,
    ContractSpec, CoverageReport, CoverageSource, Har, Normalizer, OpenApiDocument, RawExchange,
    SkipRecord, SourceOutcome, Thresholds,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Assemble the run from `compute` flags, or load it from `--config` and
/// apply flag overrides
pub fn run_config_from_args(args: &ComputeArgs) -> CliResult<RunConfig> {
    let mut run = match (&args.config, &args.contract) {
        (Some(path), _) => RunConfig::load(path)?,
        (None, Some(contract)) => {
            let mut source = SourceConfig::new(&args.label, args.contract_kind.into(), contract);
            source.traffic = match (&args.har_dir, &args.events_log) {
                (Some(dir), _) => Some(TrafficConfig::HarDir(dir.clone())),
                (None, Some(log)) => Some(TrafficConfig::EventsLog(log.clone())),
                (None, None) => None,
            };
            source.include_hosts = args.host.iter().cloned().collect();
            source.status_discriminator = args.status_discriminator;
            source.channel_prefix.clone_from(&args.channel_prefix);
            RunConfig {
                sources: vec![source],
                ..RunConfig::default()
            }
        }
        (None, None) => {
            return Err(CliError::invalid_argument(
                "either --config or --contract is required",
            ))
        }
    };

    if let Some(name) = &args.suite_name {
        run.suite_name.clone_from(name);
    }
    if let Some(dir) = &args.output_dir {
        run.output_dir.clone_from(dir);
    }
    if let Some(name) = &args.output_name {
        run.output_name.clone_from(name);
    }
    if args.fail_under.is_some() {
        run.fail_under = args.fail_under;
    }
    run.validate()?;
    Ok(run)
}

/// Read a JSON or YAML document, chosen by extension
pub fn read_document<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::file(path, e))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        Ok(serde_yaml_ng::from_str(&text)?)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}

/// Load and adapt a source's contract
pub fn load_contract(contract: &ContractConfig, status_discriminator: bool) -> CliResult<ContractSpec> {
    let spec = match contract.kind {
        ContractKind::OpenApi => {
            let doc: OpenApiDocument = read_document(&contract.path)?;
            if status_discriminator {
                doc.to_contract()?
            } else {
                doc.to_operation_contract()?
            }
        }
        ContractKind::AsyncApi => read_document::<AsyncApiDocument>(&contract.path)?.to_contract()?,
        ContractKind::Tree => read_document(&contract.path)?,
    };
    tracing::debug!(
        path = %contract.path.display(),
        paths = spec.path_count(),
        operations = spec.operation_count(),
        "loaded contract"
    );
    Ok(spec)
}

/// `*.har` files directly under `dir`, sorted by name; a missing directory
/// has none
pub fn har_files(dir: &Path) -> CliResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "HAR directory not found, no observations");
        return Ok(Vec::new());
    }
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = Path::new(&escaped).join("*.har");
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern)
        .map_err(|e| CliError::invalid_argument(format!("bad HAR directory {pattern}: {e}")))?;
    let mut files: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
    files.sort();
    Ok(files)
}

/// Raw exchanges of every HAR file, in file order; empty files are skipped
pub fn read_har_files(files: &[PathBuf], reporter: &ProgressReporter) -> CliResult<Vec<RawExchange>> {
    let mut raw = Vec::new();
    for file in files {
        let text = std::fs::read_to_string(file).map_err(|e| CliError::file(file, e))?;
        reporter.increment(1);
        if text.trim().is_empty() {
            tracing::debug!(file = %file.display(), "skipping empty HAR file");
            continue;
        }
        let har = Har::from_json(&text)?;
        raw.extend(RawExchange::from_har(&har));
    }
    Ok(raw)
}

/// Traffic files to ingest for one source
fn traffic_files(source: &SourceConfig) -> CliResult<Vec<PathBuf>> {
    match &source.traffic {
        Some(TrafficConfig::HarDir(dir)) => har_files(dir),
        Some(TrafficConfig::EventsLog(_)) | None => Ok(Vec::new()),
    }
}

/// Load one source's contract and observations
pub fn build_source(
    source: &SourceConfig,
    har_files: &[PathBuf],
    reporter: &ProgressReporter,
) -> CliResult<ContractSource> {
    let contract = load_contract(&source.contract, source.status_discriminator)?;

    let exchanges = match &source.traffic {
        Some(TrafficConfig::HarDir(_)) => {
            let raw = read_har_files(har_files, reporter)?;
            let read = raw.len();
            let normalizer = Normalizer::new(source.include_hosts.clone())
                .with_status_discriminator(source.status_discriminator);
            let exchanges = normalizer.normalize(raw);
            tracing::info!(
                source = %source.label,
                entries = read,
                exchanges = exchanges.len(),
                "normalized HAR traffic"
            );
            exchanges
        }
        Some(TrafficConfig::EventsLog(path)) => match std::fs::read_to_string(path) {
            Ok(text) => parse_event_log(&text, source.channel_prefix()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "event log not found, no observations");
                Vec::new()
            }
            Err(e) => return Err(CliError::file(path, e)),
        },
        None => Vec::new(),
    };

    Ok(ContractSource::new(&source.label, contract).with_exchanges(exchanges))
}

/// Result of a compute run
#[derive(Debug)]
pub struct ComputeOutcome {
    /// Merged report
    pub report: AggregateReport,
    /// Written JSON report
    pub json_path: PathBuf,
    /// Written markdown report
    pub markdown_path: PathBuf,
}

/// Collect every source on its own thread, merge, and write the reports
pub fn compute(run: &RunConfig, reporter: &mut ProgressReporter) -> CliResult<ComputeOutcome> {
    for source in &run.sources {
        for overlap in source.include_hosts.overlaps() {
            reporter.warning(&format!("{}: {overlap}", source.label));
        }
    }

    let files = run
        .sources
        .iter()
        .map(traffic_files)
        .collect::<CliResult<Vec<_>>>()?;
    let total_files: usize = files.iter().map(Vec::len).sum();
    reporter.start_progress(total_files as u64, "Reading HAR files");

    let reporter_ref: &ProgressReporter = reporter;
    let outcomes = std::thread::scope(|scope| {
        let handles: Vec<_> = run
            .sources
            .iter()
            .zip(&files)
            .map(|(source, files)| {
                scope.spawn(move || -> CliResult<SourceOutcome> {
                    Ok(build_source(source, files, reporter_ref)?.collect())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| CliError::config("source worker panicked"))?
            })
            .collect::<CliResult<Vec<_>>>()
    })?;
    reporter.finish();

    for outcome in &outcomes {
        for invalid in outcome.report.invalid_templates() {
            reporter.warning(&format!("{}: {invalid}", outcome.label));
        }
    }

    let report = apicov::aggregate_outcomes(&outcomes);
    let json_path = run.json_path();
    let markdown_path = run.markdown_path();
    write_reports(
        &report,
        &json_path,
        Some(&markdown_path),
        &run.suite_name,
        &run.thresholds,
    )?;

    Ok(ComputeOutcome {
        report,
        json_path,
        markdown_path,
    })
}

/// A saved report: an aggregate, or a single source's report
#[derive(Deserialize)]
#[serde(untagged)]
enum SavedReport {
    Aggregate(AggregateReport),
    Single(CoverageReport),
}

/// Merge saved reports into one aggregate and write it
pub fn merge_saved(args: &MergeArgs) -> CliResult<AggregateReport> {
    let mut labelled: Vec<(String, CoverageReport)> = Vec::new();
    let mut skipped: Vec<SkipRecord> = Vec::new();

    for path in &args.reports {
        match read_document::<SavedReport>(path)? {
            SavedReport::Aggregate(aggregate) => {
                labelled.extend(aggregate.sources.into_iter().map(|s| (s.label, s.report)));
                skipped.extend(aggregate.skipped);
            }
            SavedReport::Single(report) => {
                let label = path
                    .file_stem()
                    .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
                labelled.push((label, report));
            }
        }
    }

    let sources: Vec<(&str, &CoverageReport)> =
        labelled.iter().map(|(l, r)| (l.as_str(), r)).collect();
    let report = merge(&sources, skipped);
    write_reports(
        &report,
        &args.output,
        args.markdown.as_deref(),
        &args.suite_name,
        &args.thresholds(),
    )?;
    Ok(report)
}

/// Write the JSON report and, optionally, the markdown report
pub fn write_reports(
    report: &AggregateReport,
    json_path: &Path,
    markdown_path: Option<&Path>,
    suite_name: &str,
    thresholds: &Thresholds,
) -> CliResult<()> {
    write_file(json_path, &serde_json::to_string_pretty(report)?)?;
    if let Some(path) = markdown_path {
        write_file(path, &render::markdown(report, suite_name, thresholds))?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> CliResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CliError::file(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| CliError::file(path, e))
}

/// Fail when the report is under `fail_under`; no percentage counts as 0
pub fn check_fail_under(report: &AggregateReport, fail_under: Option<u32>) -> CliResult<()> {
    let Some(required) = fail_under else {
        return Ok(());
    };
    let actual = report.percentage().unwrap_or(0);
    if actual < required {
        return Err(CliError::below_threshold(actual, required));
    }
    Ok(())
}
