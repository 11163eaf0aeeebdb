//! Coverage accumulation.
//!
//! A [`CoverageReport`] is seeded once from a [`ContractSpec`] with every
//! declared discriminator uncovered, then grows as normalized exchanges are
//! applied. Observations the contract cannot account for never fail the run;
//! they are returned as [`SkipRecord`]s.
//!
//! # Invariants
//!
//! For every entry, after every call to [`CoverageReport::apply`]:
//!
//! - `covered ∩ uncovered = ∅`
//! - `totalChannel = |covered| + |uncovered|`, fixed at seeding
//! - `totalChannelCovered = |covered|`, never decreasing
//! - the report's `total`/`totalCovered` equal the sums over all entries

use crate::aggregate::Coverage;
use crate::contract::{canonical_verb, is_any_verb, ContractSpec, IMPLICIT_DISCRIMINATOR};
use crate::exchange::NormalizedExchange;
use crate::ordered_map::OrderedMap;
use crate::pattern::{compile, PathPattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Serialized form of an entry; the counters are derived from the sets
#[derive(Deserialize)]
struct EntryWire {
    #[serde(default)]
    covered: BTreeSet<String>,
    #[serde(default)]
    uncovered: BTreeSet<String>,
}

/// Coverage of one (path, verb) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "EntryWire")]
pub struct CoverageEntry {
    covered: BTreeSet<String>,
    uncovered: BTreeSet<String>,
    total_channel: usize,
    total_channel_covered: usize,
}

impl CoverageEntry {
    /// Entry with every discriminator uncovered; an empty set seeds the
    /// implicit discriminator
    #[must_use]
    pub fn seeded<I>(discriminators: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut uncovered: BTreeSet<String> = discriminators.into_iter().collect();
        if uncovered.is_empty() {
            let _ = uncovered.insert(IMPLICIT_DISCRIMINATOR.to_string());
        }
        Self {
            total_channel: uncovered.len(),
            total_channel_covered: 0,
            covered: BTreeSet::new(),
            uncovered,
        }
    }

    /// Discriminators observed so far
    #[must_use]
    pub fn covered(&self) -> &BTreeSet<String> {
        &self.covered
    }

    /// Discriminators not yet observed
    #[must_use]
    pub fn uncovered(&self) -> &BTreeSet<String> {
        &self.uncovered
    }

    /// Number of declared discriminators
    #[must_use]
    pub fn total_channel(&self) -> usize {
        self.total_channel
    }

    /// Number of covered discriminators
    #[must_use]
    pub fn total_channel_covered(&self) -> usize {
        self.total_channel_covered
    }

    /// Whether `discriminator` is declared for this entry
    #[must_use]
    pub fn declares(&self, discriminator: &str) -> bool {
        self.covered.contains(discriminator) || self.uncovered.contains(discriminator)
    }

    /// Whether `discriminator` has been observed
    #[must_use]
    pub fn is_covered(&self, discriminator: &str) -> bool {
        self.covered.contains(discriminator)
    }

    /// Counters as a [`Coverage`]
    #[must_use]
    pub fn coverage(&self) -> Coverage {
        Coverage::new(self.total_channel, self.total_channel_covered)
    }

    /// Move a declared discriminator to `covered`; false if it already was
    fn cover(&mut self, discriminator: &str) -> bool {
        if !self.uncovered.remove(discriminator) {
            return false;
        }
        let _ = self.covered.insert(discriminator.to_string());
        self.total_channel_covered = self.covered.len();
        true
    }

    fn declared(&self) -> String {
        self.covered
            .union(&self.uncovered)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Why an observation could not be reconciled with the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// No template matches the path
    PathNotFound,
    /// The path matched but declares neither the verb nor a wildcard verb
    VerbNotFound,
    /// The operation does not declare the discriminator
    DiscriminatorNotFound,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathNotFound => write!(f, "Path not found"),
            Self::VerbNotFound => write!(f, "Verb not found"),
            Self::DiscriminatorNotFound => write!(f, "Discriminator not found"),
        }
    }
}

/// An observation that could not be reconciled with the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    /// Observed path
    pub path: String,
    /// Observed verb
    pub verb: String,
    /// Observed discriminator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    /// Reason code
    pub reason: SkipReason,
    /// What the contract declares at the point of failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SkipRecord {
    /// Record `exchange` as skipped for `reason`
    #[must_use]
    pub fn new(exchange: &NormalizedExchange, reason: SkipReason) -> Self {
        Self {
            path: exchange.path.clone(),
            verb: exchange.verb.clone(),
            discriminator: exchange.discriminator.clone(),
            reason,
            details: None,
        }
    }

    /// Attach details
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for SkipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.reason, self.verb, self.path)?;
        if let Some(d) = &self.discriminator {
            write!(f, " [{d}]")?;
        }
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

/// Result of applying one exchange that the contract accounts for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A discriminator moved from uncovered to covered
    Covered,
    /// The discriminator was already covered
    AlreadyCovered,
}

impl From<EntryWire> for CoverageEntry {
    fn from(wire: EntryWire) -> Self {
        let mut uncovered = wire.uncovered;
        uncovered.retain(|d| !wire.covered.contains(d));
        Self {
            total_channel: wire.covered.len() + uncovered.len(),
            total_channel_covered: wire.covered.len(),
            covered: wire.covered,
            uncovered,
        }
    }
}

/// Verb-to-entry map of one path
pub type VerbCoverage = OrderedMap<CoverageEntry>;

/// Serialized form of a report
#[derive(Deserialize)]
struct ReportWire {
    paths: OrderedMap<VerbCoverage>,
}

/// Coverage of one contract by one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ReportWire")]
pub struct CoverageReport {
    paths: OrderedMap<VerbCoverage>,
    total: usize,
    total_covered: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    invalid_templates: Vec<String>,
    #[serde(skip)]
    patterns: Vec<PathPattern>,
}

impl CoverageReport {
    /// Seed a zero-coverage report from a contract.
    ///
    /// Templates that fail to compile are still seeded (they count towards
    /// the total) but can never match; their errors are kept in
    /// [`invalid_templates`](Self::invalid_templates).
    #[must_use]
    pub fn seed(spec: &ContractSpec) -> Self {
        let mut paths = OrderedMap::new();
        for (path, verbs) in spec.paths() {
            let entries: VerbCoverage = verbs
                .iter()
                .map(|(verb, discriminators)| {
                    (
                        canonical_verb(verb),
                        CoverageEntry::seeded(discriminators.iter().cloned()),
                    )
                })
                .collect();
            let _ = paths.insert(path, entries);
        }
        let report = Self::from_paths(paths);
        tracing::debug!(
            paths = report.paths.len(),
            total = report.total,
            "seeded coverage report"
        );
        report
    }

    fn from_paths(paths: OrderedMap<VerbCoverage>) -> Self {
        let mut patterns = Vec::with_capacity(paths.len());
        let mut invalid_templates = Vec::new();
        for template in paths.keys() {
            match compile(template) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => {
                    tracing::warn!(error = %e, "template will never match");
                    invalid_templates.push(e.to_string());
                }
            }
        }

        let entries = || paths.values().flat_map(OrderedMap::values);
        let total = entries().map(CoverageEntry::total_channel).sum();
        let total_covered = entries().map(CoverageEntry::total_channel_covered).sum();

        Self {
            paths,
            total,
            total_covered,
            invalid_templates,
            patterns,
        }
    }

    /// Apply exchanges in order, appending a [`SkipRecord`] for each one the
    /// contract cannot account for.
    ///
    /// Idempotent: applying the same exchanges again changes nothing but
    /// the skip list.
    pub fn apply<'a, I>(&mut self, exchanges: I, skipped: &mut Vec<SkipRecord>)
    where
        I: IntoIterator<Item = &'a NormalizedExchange>,
    {
        let before = self.total_covered;
        let skipped_before = skipped.len();
        for exchange in exchanges {
            if let Err(skip) = self.apply_one(exchange) {
                tracing::debug!(%skip, "skipped exchange");
                skipped.push(skip);
            }
        }
        tracing::debug!(
            newly_covered = self.total_covered - before,
            skipped = skipped.len() - skipped_before,
            "applied exchanges"
        );
    }

    /// Apply a single exchange
    pub fn apply_one(&mut self, exchange: &NormalizedExchange) -> Result<ApplyOutcome, SkipRecord> {
        let Some(pattern) = self.patterns.iter().find(|p| p.is_match(&exchange.path)) else {
            return Err(SkipRecord::new(exchange, SkipReason::PathNotFound));
        };
        let Some(verbs) = self.paths.get_mut(pattern.template()) else {
            return Err(SkipRecord::new(exchange, SkipReason::PathNotFound));
        };

        let verb = canonical_verb(&exchange.verb);
        let key = if verbs.contains_key(&verb) {
            verb
        } else if let Some(any) = verbs.keys().find(|v| is_any_verb(v)) {
            any.to_string()
        } else {
            let declared = verbs.keys().collect::<Vec<_>>().join(", ");
            return Err(SkipRecord::new(exchange, SkipReason::VerbNotFound)
                .with_details(format!("{} declares [{declared}]", pattern.template())));
        };
        let Some(entry) = verbs.get_mut(&key) else {
            return Err(SkipRecord::new(exchange, SkipReason::VerbNotFound));
        };

        let discriminator = exchange
            .discriminator
            .as_deref()
            .unwrap_or(IMPLICIT_DISCRIMINATOR);
        if !entry.declares(discriminator) {
            return Err(
                SkipRecord::new(exchange, SkipReason::DiscriminatorNotFound).with_details(format!(
                    "{key} {} declares [{}]",
                    pattern.template(),
                    entry.declared()
                )),
            );
        }

        if entry.cover(discriminator) {
            self.total_covered += 1;
            Ok(ApplyOutcome::Covered)
        } else {
            Ok(ApplyOutcome::AlreadyCovered)
        }
    }

    /// Paths and their verb entries, in contract order
    pub fn paths(&self) -> impl Iterator<Item = (&str, &VerbCoverage)> {
        self.paths.iter()
    }

    /// Path map, for merging
    #[must_use]
    pub fn path_map(&self) -> &OrderedMap<VerbCoverage> {
        &self.paths
    }

    /// Entry for a (path template, verb) pair
    #[must_use]
    pub fn entry(&self, path: &str, verb: &str) -> Option<&CoverageEntry> {
        self.paths.get(path)?.get(&canonical_verb(verb))
    }

    /// Total and covered discriminators of one path, over all its verbs
    #[must_use]
    pub fn path_coverage(&self, path: &str) -> Option<Coverage> {
        self.paths.get(path).map(verb_coverage)
    }

    /// Number of declared discriminators over all entries
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of covered discriminators over all entries
    #[must_use]
    pub fn total_covered(&self) -> usize {
        self.total_covered
    }

    /// Report-wide counters as a [`Coverage`]
    #[must_use]
    pub fn coverage(&self) -> Coverage {
        Coverage::new(self.total, self.total_covered)
    }

    /// Compile errors of templates that can never match
    #[must_use]
    pub fn invalid_templates(&self) -> &[String] {
        &self.invalid_templates
    }
}

impl From<ReportWire> for CoverageReport {
    fn from(wire: ReportWire) -> Self {
        Self::from_paths(wire.paths)
    }
}

/// Sum of the entries of one path
#[must_use]
pub fn verb_coverage(verbs: &VerbCoverage) -> Coverage {
    verbs
        .values()
        .fold(Coverage::default(), |acc, entry| acc + entry.coverage())
}
