//! CLI configuration
//!
//! [`CliConfig`] carries the global flags. [`RunConfig`] describes one
//! coverage run and is either loaded from a YAML file or assembled from the
//! `compute` flags:
//!
//! ```yaml
//! suite_name: Pet Store
//! output_dir: target/apicov
//! fail_under: 60
//! thresholds: { ok: 80, warning: 60 }
//! sources:
//!   - label: rest
//!     contract: { kind: openapi, path: openapi.yaml }
//!     traffic: { har_dir: hars }
//!     status_discriminator: true
//!     include_hosts:
//!       - host: https://api.example.com
//!       - host: https://api.example.com/v2
//!         replacement: /v2alpha1
//!   - label: events
//!     contract: { kind: asyncapi, path: asyncapi.json }
//!     traffic: { events_log: events.jsonl }
//! ```

use crate::error::{CliError, CliResult};
use apicov::contract::EVENT_CHANNEL_PREFIX;
use apicov::{HostRewriteTable, Thresholds};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default base name of the written reports
pub const DEFAULT_OUTPUT_NAME: &str = "api-coverage";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Log filter used when `RUST_LOG` is not set
    #[must_use]
    pub const fn filter_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }
}

/// Contract document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    /// OpenAPI / Swagger document
    #[default]
    OpenApi,
    /// AsyncAPI 2.x document
    AsyncApi,
    /// Pre-normalized `path -> verb -> [discriminator]` tree
    Tree,
}

/// Where a source's contract comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Document format
    #[serde(default)]
    pub kind: ContractKind,
    /// JSON or YAML file
    pub path: PathBuf,
}

/// Where a source's observations come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficConfig {
    /// Directory of `*.har` files
    HarDir(PathBuf),
    /// JSON-lines event log
    EventsLog(PathBuf),
}

/// One coverage source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Label in the aggregate report
    pub label: String,
    /// Contract document
    pub contract: ContractConfig,
    /// Recorded traffic; no traffic means zero observations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<TrafficConfig>,
    /// Ordered host rewrite rules for HAR traffic
    #[serde(default)]
    pub include_hosts: HostRewriteTable,
    /// Use response codes as discriminators
    #[serde(default)]
    pub status_discriminator: bool,
    /// Prefix prepended to event log channels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_prefix: Option<String>,
}

impl SourceConfig {
    /// Source reading `contract` with no traffic yet
    #[must_use]
    pub fn new(label: impl Into<String>, kind: ContractKind, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            contract: ContractConfig {
                kind,
                path: path.into(),
            },
            traffic: None,
            include_hosts: HostRewriteTable::new(),
            status_discriminator: false,
            channel_prefix: None,
        }
    }

    /// Channel prefix for event logs, `EVENT|` unless configured
    #[must_use]
    pub fn channel_prefix(&self) -> &str {
        self.channel_prefix.as_deref().unwrap_or(EVENT_CHANNEL_PREFIX)
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.contract.path = base.join(&self.contract.path);
        self.traffic = self.traffic.take().map(|traffic| match traffic {
            TrafficConfig::HarDir(dir) => TrafficConfig::HarDir(base.join(dir)),
            TrafficConfig::EventsLog(file) => TrafficConfig::EventsLog(base.join(file)),
        });
    }
}

/// One coverage run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Title of the markdown report
    #[serde(default = "default_suite_name")]
    pub suite_name: String,
    /// Directory receiving the reports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Base name of the reports (`<name>.json`, `<name>.md`)
    #[serde(default = "default_output_name")]
    pub output_name: String,
    /// Band boundaries
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Fail the run below this percentage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_under: Option<u32>,
    /// Sources, merged in this order
    pub sources: Vec<SourceConfig>,
}

fn default_suite_name() -> String {
    "API Coverage".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_name() -> String {
    DEFAULT_OUTPUT_NAME.to_string()
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            suite_name: default_suite_name(),
            output_dir: default_output_dir(),
            output_name: default_output_name(),
            thresholds: Thresholds::default(),
            fail_under: None,
            sources: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Parse YAML; relative paths are resolved against `base`
    pub fn from_yaml(yaml: &str, base: &Path) -> CliResult<Self> {
        let mut config: Self = serde_yaml_ng::from_str(yaml)?;
        config.output_dir = base.join(&config.output_dir);
        for source in &mut config.sources {
            source.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file; relative paths are resolved against its directory
    pub fn load(path: &Path) -> CliResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| CliError::file(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&yaml, base)
    }

    /// Check that the run has sources with distinct labels
    pub fn validate(&self) -> CliResult<()> {
        if self.sources.is_empty() {
            return Err(CliError::config("no sources configured"));
        }
        let mut labels = HashSet::new();
        for source in &self.sources {
            if !labels.insert(source.label.as_str()) {
                return Err(CliError::config(format!(
                    "duplicate source label {:?}",
                    source.label
                )));
            }
        }
        if self.output_name.is_empty() {
            return Err(CliError::config("output_name must not be empty"));
        }
        Ok(())
    }

    /// Path of the JSON report
    #[must_use]
    pub fn json_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.output_name))
    }

    /// Path of the markdown report
    #[must_use]
    pub fn markdown_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.md", self.output_name))
    }
}
